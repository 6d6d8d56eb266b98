//! Pull request deployment

pub mod checks;
pub mod executor;
pub mod fsm;
pub mod retry;

pub use executor::DeployExecutor;
pub use fsm::{DeploySettings, DeployState};
