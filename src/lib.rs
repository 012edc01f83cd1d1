pub mod check;
pub mod cli;
pub mod client;
mod error;
pub mod options;
pub mod output;
pub mod runner;
pub mod scenario;
pub mod summary;

pub use client::{EndpointConfig, LoadTestClient, DEFAULT_ENDPOINT};
pub use error::{SwarmError, SwarmResult};
pub use options::LoadOptions;
pub use runner::Runner;
pub use scenario::Scenario;

pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
