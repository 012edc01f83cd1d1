use std::io;

use camino::Utf8PathBuf;
use swarm_graphql::GraphQLServiceError;
use swarm_http::HttpServiceError;

/// Result type used across swarm
pub type SwarmResult<T> = std::result::Result<T, SwarmError>;

/// Everything that can go wrong while setting up or running a load test.
///
/// A non-200 response is not an error: it is a failed check.
#[derive(thiserror::Error, Debug)]
pub enum SwarmError {
    /// The HTTP client could not be created
    #[error("Could not set up the HTTP client: {}", .0)]
    HttpClient(#[from] HttpServiceError),

    /// A query did not produce a response (connection refused, timeout, ...)
    #[error("{}", .0)]
    Transport(#[from] GraphQLServiceError),

    /// The load test options make no sense
    #[error("Invalid options: {}", .0)]
    InvalidOptions(String),

    /// A scenario file could not be read
    #[error("Could not read scenario file '{path}': {source}")]
    ScenarioRead {
        /// where the scenario was expected
        path: Utf8PathBuf,
        /// the underlying failure
        source: io::Error,
    },

    /// A scenario file is not valid TOML for a scenario
    #[error("Could not parse scenario: {}", .0)]
    ScenarioParse(#[from] toml::de::Error),

    /// A scenario could not be rendered as TOML
    #[error("Could not render scenario: {}", .0)]
    ScenarioRender(#[from] toml::ser::Error),

    /// A scenario parsed, but describes something that cannot run
    #[error("Invalid scenario: {}", .0)]
    InvalidScenario(String),

    /// A virtual user task died
    #[error("A virtual user stopped unexpectedly: {}", .0)]
    VirtualUser(#[from] tokio::task::JoinError),
}

impl SwarmError {
    /// Whether this error means a request never got a response
    pub fn is_transport(&self) -> bool {
        matches!(self, SwarmError::Transport(_))
    }
}
