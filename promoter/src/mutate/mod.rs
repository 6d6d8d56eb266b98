//! File mutation strategies and their dispatcher

pub mod regex;
pub mod registry;
pub mod yaml;

pub use registry::{Replacer, ReplacerRegistry};
