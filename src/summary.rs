//! Aggregated results of a run

use std::{fmt, io, time::Duration};

use calm_io::stdoutln;
use comfy_table::{presets::UTF8_FULL, Table};
use derive_getters::Getters;
use serde::Serialize;

use crate::check::CheckSummary;

/// Latency of the requests that got a response
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LatencyStats {
    count: u64,
    total: Duration,
    min: Option<Duration>,
    max: Option<Duration>,
}

impl LatencyStats {
    /// Adds one request
    pub fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.min = Some(self.min.map_or(elapsed, |min| min.min(elapsed)));
        self.max = Some(self.max.map_or(elapsed, |max| max.max(elapsed)));
    }

    /// Folds another set of measurements into this one
    pub fn merge(&mut self, other: &LatencyStats) {
        self.count += other.count;
        self.total += other.total;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Number of requests measured
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Mean latency, if anything was measured
    pub fn mean(&self) -> Option<Duration> {
        u32::try_from(self.count)
            .ok()
            .filter(|count| *count > 0)
            .map(|count| self.total / count)
    }

    fn summarize(&self) -> Option<LatencySummary> {
        Some(LatencySummary {
            min_ms: as_millis(self.min?),
            avg_ms: as_millis(self.mean()?),
            max_ms: as_millis(self.max?),
        })
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}

/// Counters kept by one virtual user and merged at the end of a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VuStats {
    /// Iterations that ran every step
    pub iterations: u64,
    /// Iterations cut short by the end of the run
    pub interrupted_iterations: u64,
    /// Requests sent, whether or not they got a response
    pub requests: u64,
    /// Requests that failed to get any response
    pub transport_errors: u64,
    /// Latency of the requests that got a response
    pub latency: LatencyStats,
}

impl VuStats {
    /// Folds another virtual user's counters into this one
    pub fn merge(&mut self, other: &VuStats) {
        self.iterations += other.iterations;
        self.interrupted_iterations += other.interrupted_iterations;
        self.requests += other.requests;
        self.transport_errors += other.transport_errors;
        self.latency.merge(&other.latency);
    }
}

/// Request latency in milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LatencySummary {
    min_ms: f64,
    avg_ms: f64,
    max_ms: f64,
}

/// How output is printed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human readable tables
    #[default]
    Plain,
    /// One JSON document
    Json,
}

/// Everything reported at the end of a run
#[derive(Clone, Debug, PartialEq, Serialize, Getters)]
pub struct RunSummary {
    vus: u64,
    #[serde(serialize_with = "serialize_duration")]
    duration: Duration,
    #[serde(serialize_with = "serialize_duration")]
    elapsed: Duration,
    iterations: u64,
    interrupted_iterations: u64,
    requests: u64,
    responses: u64,
    transport_errors: u64,
    checks: Vec<CheckSummary>,
    latency: Option<LatencySummary>,
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(&humantime::format_duration(*duration))
}

impl RunSummary {
    /// Puts together the summary of a finished run
    pub fn new(
        vus: u64,
        duration: Duration,
        elapsed: Duration,
        stats: VuStats,
        checks: Vec<CheckSummary>,
    ) -> RunSummary {
        RunSummary {
            vus,
            duration,
            elapsed,
            iterations: stats.iterations,
            interrupted_iterations: stats.interrupted_iterations,
            requests: stats.requests,
            responses: stats.latency.count(),
            transport_errors: stats.transport_errors,
            checks,
            latency: stats.latency.summarize(),
        }
    }

    /// Whether every check passed every time and every request got a response
    pub fn is_success(&self) -> bool {
        self.transport_errors == 0 && self.checks.iter().all(|check| *check.fails() == 0)
    }

    /// Prints the summary to stdout
    pub fn print(&self, format: OutputFormat) -> io::Result<()> {
        match format {
            OutputFormat::Plain => stdoutln!("{}", self),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(self)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
                stdoutln!("{}", json)
            }
        }
    }

    fn checks_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Check", "Passed", "Failed", "Rate"]);
        for check in &self.checks {
            table.add_row(vec![
                check.name().clone(),
                check.passes().to_string(),
                check.fails().to_string(),
                format!("{:.2}%", check.pass_rate() * 100.0),
            ]);
        }
        table
    }

    fn run_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Metric", "Value"]);
        table.add_row(vec!["virtual users".to_string(), self.vus.to_string()]);
        table.add_row(vec![
            "duration".to_string(),
            humantime::format_duration(self.duration).to_string(),
        ]);
        table.add_row(vec![
            "iterations".to_string(),
            format!(
                "{} complete, {} interrupted",
                self.iterations, self.interrupted_iterations
            ),
        ]);
        table.add_row(vec![
            "requests".to_string(),
            format!("{} sent, {} answered", self.requests, self.responses),
        ]);
        table.add_row(vec![
            "transport errors".to_string(),
            self.transport_errors.to_string(),
        ]);
        if let Some(latency) = &self.latency {
            table.add_row(vec![
                "latency".to_string(),
                format!(
                    "min {:.2}ms / avg {:.2}ms / max {:.2}ms",
                    latency.min_ms, latency.avg_ms, latency.max_ms
                ),
            ]);
        }
        table
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.run_table())?;
        if self.checks.is_empty() {
            write!(f, "No checks were recorded.")
        } else {
            write!(f, "{}", self.checks_table())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use speculoos::prelude::*;

    use super::{LatencyStats, RunSummary, VuStats};
    use crate::check::Checks;

    fn stats(iterations: u64, transport_errors: u64, latencies_ms: &[u64]) -> VuStats {
        let mut latency = LatencyStats::default();
        for ms in latencies_ms {
            latency.record(Duration::from_millis(*ms));
        }
        VuStats {
            iterations,
            interrupted_iterations: 0,
            requests: latency.count() + transport_errors,
            transport_errors,
            latency,
        }
    }

    #[test]
    fn latency_tracks_min_mean_and_max() {
        let stats = stats(0, 0, &[10, 30, 20]);
        assert_that!(stats.latency.count()).is_equal_to(3);
        assert_that!(stats.latency.mean()).is_equal_to(Some(Duration::from_millis(20)));
        assert_that!(LatencyStats::default().mean()).is_none();
    }

    #[test]
    fn merging_virtual_users_adds_counts_and_keeps_extremes() {
        let mut total = stats(2, 1, &[10, 40]);
        total.merge(&stats(3, 0, &[5]));
        total.merge(&VuStats::default());

        assert_that!(total.iterations).is_equal_to(5);
        assert_that!(total.transport_errors).is_equal_to(1);
        assert_that!(total.requests).is_equal_to(4);
        assert_that!(total.latency.count()).is_equal_to(3);

        let summary = RunSummary::new(
            2,
            Duration::from_secs(1),
            Duration::from_secs(1),
            total,
            vec![],
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_that!(json["latency"]["min_ms"]).is_equal_to(json!(5.0));
        assert_that!(json["latency"]["max_ms"]).is_equal_to(json!(40.0));
    }

    #[test]
    fn success_needs_no_failed_check_and_no_transport_error() {
        let checks = Checks::default();
        checks.record("themes status was 200", true);
        let passing = RunSummary::new(
            1,
            Duration::from_secs(30),
            Duration::from_secs(30),
            stats(1, 0, &[1]),
            checks.snapshot(),
        );
        assert_that!(passing.is_success()).is_true();

        let broken_transport = RunSummary::new(
            1,
            Duration::from_secs(30),
            Duration::from_secs(30),
            stats(1, 1, &[1]),
            checks.snapshot(),
        );
        assert_that!(broken_transport.is_success()).is_false();

        checks.record("addTheme status was 200", false);
        let failing = RunSummary::new(
            1,
            Duration::from_secs(30),
            Duration::from_secs(30),
            stats(1, 0, &[1]),
            checks.snapshot(),
        );
        assert_that!(failing.is_success()).is_false();
    }

    #[test]
    fn json_summary_names_every_field() {
        let checks = Checks::default();
        checks.record("themes status was 200", true);
        checks.record("themes status was 200", false);
        let summary = RunSummary::new(
            10,
            Duration::from_secs(30),
            Duration::from_millis(30_250),
            stats(7, 1, &[]),
            checks.snapshot(),
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_that!(json).is_equal_to(json!({
            "vus": 10,
            "duration": "30s",
            "elapsed": "30s 250ms",
            "iterations": 7,
            "interrupted_iterations": 0,
            "requests": 1,
            "responses": 0,
            "transport_errors": 1,
            "checks": [
                { "name": "themes status was 200", "passes": 1, "fails": 1 }
            ],
            "latency": null,
        }));
    }

    #[test]
    fn plain_summary_lists_checks() {
        let checks = Checks::default();
        checks.record("addTheme status was 200", false);
        let summary = RunSummary::new(
            1,
            Duration::from_secs(1),
            Duration::from_secs(1),
            stats(1, 0, &[3]),
            checks.snapshot(),
        );
        let rendered = summary.to_string();
        assert_that!(rendered.as_str()).contains("addTheme status was 200");
        assert_that!(rendered.as_str()).contains("0.00%");
        assert_that!(rendered.as_str()).contains("1 complete, 0 interrupted");
        assert_that!(rendered.as_str()).contains("1 sent, 1 answered");
    }
}
