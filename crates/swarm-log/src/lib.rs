#![deny(missing_docs)]

//! Defines the output format of traces, events, and spans produced
//! by swarm and the HTTP libraries it drives.

use std::io;
use tracing_subscriber::fmt;

pub use tracing_core::Level;

/// possible log levels
pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Initializes a global tracing subscriber that formats
/// all logs produced by an application that calls init,
/// and all logs produced by libraries consumed by that application.
///
/// Logs go to stderr so that stdout only carries the run summary.
pub fn init(level: Option<Level>) {
    // by default, no logs are printed.
    if let Some(level) = level {
        let builder = fmt().with_max_level(level).with_writer(io::stderr);
        // debug and trace runs interleave many virtual users, so thread ids help
        let result = if level >= Level::DEBUG {
            builder.with_thread_ids(true).try_init()
        } else {
            builder
                .event_format(fmt::format().without_time().with_target(false).compact())
                .try_init()
        };
        // a subscriber installed earlier (tests, embedding) wins
        result.ok();
    }
}
