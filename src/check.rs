//! Named boolean assertions recorded while a load test runs

use std::sync::{Arc, Mutex, PoisonError};

use derive_getters::Getters;
use http::StatusCode;
use serde::Serialize;

/// The name a status check is recorded under for a query called `name`
pub fn check_name(name: &str) -> String {
    format!("{name} status was 200")
}

/// Whether a response status passes the status check
pub fn status_passes(status: StatusCode) -> bool {
    status == StatusCode::OK
}

/// Running tally of one named check
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Getters)]
pub struct CheckSummary {
    name: String,
    passes: u64,
    fails: u64,
}

impl CheckSummary {
    fn new(name: &str) -> CheckSummary {
        CheckSummary {
            name: name.to_string(),
            passes: 0,
            fails: 0,
        }
    }

    /// Total number of times this check was evaluated
    pub const fn total(&self) -> u64 {
        self.passes + self.fails
    }

    /// Share of evaluations that passed, in `0.0..=1.0`
    pub fn pass_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passes as f64 / total as f64,
        }
    }
}

/// Registry of checks shared by every virtual user of a run.
///
/// Cloning is cheap and clones record into the same registry. Checks are
/// reported in the order they were first recorded.
#[derive(Clone, Debug, Default)]
pub struct Checks {
    inner: Arc<Mutex<Vec<CheckSummary>>>,
}

impl Checks {
    /// Records one evaluation of the check called `name`
    pub fn record(&self, name: &str, passed: bool) {
        let mut checks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let index = match checks.iter().position(|check| check.name == name) {
            Some(index) => index,
            None => {
                checks.push(CheckSummary::new(name));
                checks.len() - 1
            }
        };
        let check = &mut checks[index];
        if passed {
            check.passes += 1;
        } else {
            check.fails += 1;
        }
    }

    /// The tally of the check called `name`, if it was ever recorded
    pub fn get(&self, name: &str) -> Option<CheckSummary> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|check| check.name == name)
            .cloned()
    }

    /// A copy of every tally
    pub fn snapshot(&self) -> Vec<CheckSummary> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether no evaluation of any check has failed
    pub fn all_passed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .all(|check| check.fails == 0)
    }
}
