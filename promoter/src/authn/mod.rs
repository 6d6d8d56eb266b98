//! Hosting credentials

pub mod credential;
pub mod installation;

pub use credential::{Credential, CredentialMode, CredentialOptions, GIT_USERNAME};
