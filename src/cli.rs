use std::{future::Future, io, process, str::FromStr, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use swarm_log::Level;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::DEFAULT_ENDPOINT;
use crate::options::{LoadOptions, DEFAULT_VUS};
use crate::output::SwarmOutput;
use crate::runner::Runner;
use crate::scenario::Scenario;
use crate::summary::OutputFormat;
use crate::SwarmResult;

#[derive(Debug, Parser)]
#[command(
    name = "swarm",
    version,
    about = "
swarm - GraphQL load testing

Runs virtual users that repeatedly send GraphQL queries and mutations to an
endpoint, checking that every response has a 200 status:

    $ swarm run --endpoint https://localhost/graphql --vus 10 --duration 30s

Print the built-in scenario as a starting point for your own:

    $ swarm scenario > scenario.toml
"
)]
pub struct Swarm {
    #[command(subcommand)]
    pub command: Command,

    /// Specify swarm's log level (error, warn, info, debug, trace)
    #[arg(long = "log", short = 'l', global = true, value_parser = Level::from_str)]
    pub log_level: Option<Level>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test
    Run(Run),

    /// Print a scenario as TOML
    Scenario(PrintScenario),
}

impl Swarm {
    pub async fn run(&self) -> SwarmResult<SwarmOutput> {
        match &self.command {
            Command::Run(command) => command.run(shutdown_on_ctrl_c()).await,
            Command::Scenario(command) => command.run(),
        }
    }
}

/// The first Ctrl-C stops the run gracefully, the second exits right away
fn shutdown_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            second_interrupt(tokio::signal::ctrl_c, &cancel).await;
            tracing::warn!("interrupted again, exiting without a summary");
            process::exit(130);
        }
    });
    cancel
}

/// Cancels `cancel` on the first interrupt and resolves on the second.
///
/// Never resolves if interrupts cannot be listened for.
async fn second_interrupt<F, Fut>(mut interrupted: F, cancel: &CancellationToken)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(error) = interrupted().await {
        tracing::debug!(%error, "could not listen for interrupts");
        return std::future::pending::<()>().await;
    }
    tracing::info!("interrupted, stopping virtual users");
    cancel.cancel();
    if interrupted().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[derive(Debug, Parser)]
pub struct Run {
    /// The GraphQL endpoint to send queries to
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: Url,

    /// How many virtual users run concurrently
    #[arg(long, default_value_t = DEFAULT_VUS, value_parser = clap::value_parser!(u64).range(1..))]
    vus: u64,

    /// How long the test runs, e.g. "30s" or "2m"
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    duration: Duration,

    /// Pause at the end of every iteration, overriding the scenario's
    #[arg(long, value_parser = humantime::parse_duration)]
    pause: Option<Duration>,

    /// Give up on a request after this long [default: 60s]
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// How long requests still in flight at the end of the run may take
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    graceful_stop: Duration,

    /// Accept invalid TLS certificates and hostnames
    #[arg(long)]
    insecure: bool,

    /// TOML file describing the queries each iteration sends
    #[arg(long)]
    scenario: Option<Utf8PathBuf>,

    /// How to print the summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,
}

impl Run {
    pub async fn run(&self, cancel: CancellationToken) -> SwarmResult<SwarmOutput> {
        let options = LoadOptions::builder()
            .endpoint(self.endpoint.clone())
            .vus(self.vus)
            .duration(self.duration)
            .and_timeout(self.timeout)
            .graceful_stop(self.graceful_stop)
            .insecure(self.insecure)
            .build()?;
        let scenario = load_scenario(self.scenario.as_deref(), self.pause)?;
        let runner = Runner::builder()
            .options(options)
            .scenario(scenario)
            .build();
        let summary = runner.run(cancel).await?;
        Ok(SwarmOutput::Summary {
            summary,
            format: self.format,
        })
    }
}

#[derive(Debug, Parser)]
pub struct PrintScenario {
    /// Print this scenario file (normalized) instead of the built-in one
    #[arg(long)]
    scenario: Option<Utf8PathBuf>,
}

impl PrintScenario {
    pub fn run(&self) -> SwarmResult<SwarmOutput> {
        let scenario = load_scenario(self.scenario.as_deref(), None)?;
        Ok(SwarmOutput::Scenario(scenario.to_toml()?))
    }
}

fn load_scenario(path: Option<&Utf8Path>, pause: Option<Duration>) -> SwarmResult<Scenario> {
    let scenario = match path {
        Some(path) => Scenario::from_file(path)?,
        None => Scenario::default(),
    };
    Ok(match pause {
        Some(pause) => scenario.with_pause(pause),
        None => scenario,
    })
}
