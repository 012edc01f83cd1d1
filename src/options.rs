//! Settings of a load test run

use std::time::Duration;

use buildstructor::buildstructor;
use derive_getters::Getters;
use swarm_http::{HttpServiceConfig, DEFAULT_TIMEOUT};
use url::Url;

use crate::{SwarmError, SwarmResult};

/// Virtual users run when none are asked for
pub const DEFAULT_VUS: u64 = 10;

/// How long a run lasts when no duration is asked for
pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);

/// How long requests still in flight at the end of a run may take to answer
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// How many virtual users run, for how long, against which endpoint
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
pub struct LoadOptions {
    endpoint: Url,
    vus: u64,
    duration: Duration,
    timeout: Option<Duration>,
    graceful_stop: Duration,
    insecure: bool,
}

#[buildstructor]
impl LoadOptions {
    /// Builds options, filling in the defaults and rejecting zero virtual users
    #[builder]
    pub fn new(
        endpoint: Url,
        vus: Option<u64>,
        duration: Option<Duration>,
        timeout: Option<Duration>,
        graceful_stop: Option<Duration>,
        insecure: Option<bool>,
    ) -> SwarmResult<LoadOptions> {
        let vus = vus.unwrap_or(DEFAULT_VUS);
        if vus == 0 {
            return Err(SwarmError::InvalidOptions(
                "at least one virtual user is needed".to_string(),
            ));
        }
        if timeout == Some(Duration::ZERO) {
            return Err(SwarmError::InvalidOptions(
                "a request timeout of zero would fail every request".to_string(),
            ));
        }
        Ok(LoadOptions {
            endpoint,
            vus,
            duration: duration.unwrap_or(DEFAULT_DURATION),
            timeout,
            graceful_stop: graceful_stop.unwrap_or(DEFAULT_GRACEFUL_STOP),
            insecure: insecure.unwrap_or_default(),
        })
    }

    /// How long a request may take before it fails
    pub fn request_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// The HTTP client settings these options call for
    pub fn http_config(&self) -> HttpServiceConfig {
        HttpServiceConfig::builder()
            .accept_invalid_certificates(self.insecure)
            .accept_invalid_hostnames(self.insecure)
            .and_timeout(self.timeout)
            .build()
    }
}
