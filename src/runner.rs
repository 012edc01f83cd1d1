//! Runs virtual users against an endpoint for a fixed amount of time

use std::{sync::Arc, time::Duration};

use buildstructor::buildstructor;
use swarm_http::{HttpServiceFactory, ReqwestServiceFactory};
use tokio::{task::JoinSet, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::check::{check_name, Checks};
use crate::client::LoadTestClient;
use crate::options::LoadOptions;
use crate::scenario::Scenario;
use crate::summary::{RunSummary, VuStats};
use crate::SwarmResult;

/// How an iteration ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Every step was sent and the pause was taken
    Completed,
    /// The run ended before every step could finish
    Interrupted,
}

/// One simulated user, repeatedly running the scenario until told to stop
pub struct VirtualUser {
    id: u64,
    client: LoadTestClient,
    scenario: Arc<Scenario>,
    checks: Checks,
    cancel: CancellationToken,
    graceful_stop: Duration,
    stats: VuStats,
}

impl VirtualUser {
    /// Creates a virtual user; it stops once `cancel` is cancelled, giving
    /// up on a request still in flight `graceful_stop` later
    pub fn new(
        id: u64,
        client: LoadTestClient,
        scenario: Arc<Scenario>,
        checks: Checks,
        cancel: CancellationToken,
        graceful_stop: Duration,
    ) -> VirtualUser {
        VirtualUser {
            id,
            client,
            scenario,
            checks,
            cancel,
            graceful_stop,
            stats: VuStats::default(),
        }
    }

    /// Counters gathered so far
    pub const fn stats(&self) -> &VuStats {
        &self.stats
    }

    /// Sends every step of the scenario in order, then pauses.
    ///
    /// Neither a failed status check nor a request that got no response
    /// stops the iteration; the latter fails the step's check and counts as
    /// a transport error.
    pub async fn iterate(&mut self) -> IterationOutcome {
        for step in self.scenario.steps() {
            if self.cancel.is_cancelled() {
                return IterationOutcome::Interrupted;
            }
            self.stats.requests += 1;
            let started = Instant::now();
            let sent = tokio::select! {
                sent = self.client.test_query(step.name(), step.query(), &self.checks) => sent,
                _ = grace_expired(&self.cancel, self.graceful_stop) => {
                    tracing::debug!(vu = self.id, query = step.name(), "abandoned request after graceful stop");
                    return IterationOutcome::Interrupted;
                }
            };
            match sent {
                Ok(()) => self.stats.latency.record(started.elapsed()),
                Err(error) => {
                    self.stats.transport_errors += 1;
                    self.checks.record(&check_name(step.name()), false);
                    tracing::warn!(vu = self.id, query = step.name(), %error, "request got no response");
                }
            }
        }
        pause(&self.scenario, &self.cancel).await;
        IterationOutcome::Completed
    }

    /// Iterates until cancelled and hands back the counters
    pub async fn run(mut self) -> VuStats {
        tracing::debug!(vu = self.id, "virtual user started");
        while !self.cancel.is_cancelled() {
            match self.iterate().await {
                IterationOutcome::Completed => self.stats.iterations += 1,
                IterationOutcome::Interrupted => self.stats.interrupted_iterations += 1,
            }
        }
        tracing::debug!(vu = self.id, stats = ?self.stats, "virtual user stopped");
        self.stats
    }
}

async fn pause(scenario: &Scenario, cancel: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(*scenario.pause()) => {}
        _ = cancel.cancelled() => {}
    }
}

async fn grace_expired(cancel: &CancellationToken, grace: Duration) {
    cancel.cancelled().await;
    tokio::time::sleep(grace).await;
}

/// Drives a [`Scenario`] with the virtual users described by [`LoadOptions`]
#[derive(Debug)]
pub struct Runner {
    options: LoadOptions,
    scenario: Arc<Scenario>,
}

#[buildstructor]
impl Runner {
    /// Creates a runner; without a scenario the default one is used
    #[builder]
    pub fn new(options: LoadOptions, scenario: Option<Scenario>) -> Runner {
        Runner {
            options,
            scenario: Arc::new(scenario.unwrap_or_default()),
        }
    }

    /// Runs the load test over HTTP until the duration elapses or `cancel` is cancelled
    pub async fn run(&self, cancel: CancellationToken) -> SwarmResult<RunSummary> {
        let factory = ReqwestServiceFactory::builder()
            .config(self.options.http_config())
            .build()?;
        self.run_with(&factory, cancel).await
    }

    /// Runs the load test, creating each virtual user's HTTP service with `factory`.
    ///
    /// Returns at most the graceful stop after the duration elapses (or
    /// `cancel` fires), whatever the endpoint does.
    pub async fn run_with<F>(&self, factory: &F, cancel: CancellationToken) -> SwarmResult<RunSummary>
    where
        F: HttpServiceFactory,
    {
        let vus = *self.options.vus();
        let duration = *self.options.duration();
        let graceful_stop = *self.options.graceful_stop();
        let run = cancel.child_token();
        let checks = Checks::default();

        tracing::info!(
            vus,
            duration = %humantime::format_duration(duration),
            timeout = %humantime::format_duration(self.options.request_timeout()),
            graceful_stop = %humantime::format_duration(graceful_stop),
            endpoint = %self.options.endpoint(),
            "starting load test"
        );

        let started = Instant::now();
        let mut users = JoinSet::new();
        for id in 0..vus {
            let client = LoadTestClient::new(self.options.endpoint().clone(), factory.create()?);
            let user = VirtualUser::new(
                id,
                client,
                self.scenario.clone(),
                checks.clone(),
                run.clone(),
                graceful_stop,
            );
            users.spawn(user.run().in_current_span());
        }

        let timer = tokio::spawn({
            let run = run.clone();
            async move {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        tracing::debug!("duration elapsed, stopping virtual users");
                        run.cancel();
                    }
                    _ = run.cancelled() => {}
                }
            }
        });

        let mut stats = VuStats::default();
        while let Some(result) = users.join_next().await {
            match result {
                Ok(user) => stats.merge(&user),
                Err(error) => {
                    // dropping `users` aborts the remaining virtual users
                    timer.abort();
                    run.cancel();
                    return Err(error.into());
                }
            }
        }
        timer.abort();

        let summary = RunSummary::new(vus, duration, started.elapsed(), stats, checks.snapshot());
        tracing::info!(
            iterations = summary.iterations(),
            requests = summary.requests(),
            transport_errors = summary.transport_errors(),
            "load test finished"
        );
        Ok(summary)
    }
}
