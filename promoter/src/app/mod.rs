//! Application entry points

pub mod cli;
pub mod options;
pub mod run;
