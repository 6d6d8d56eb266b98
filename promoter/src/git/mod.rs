//! Configuration repository synchronization

pub mod client;

pub use client::{Author, GitClient, RepositoryHandle};
