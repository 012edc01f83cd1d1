use anyhow::Result;
use clap::Parser;
use swarm::{cli::Swarm, PKG_NAME, PKG_VERSION};

use std::process;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => process::exit(code),
        Err(error) => {
            tracing::debug!(?error);
            eprintln!("error: {:#}", error);
            process::exit(1)
        }
    }
}

async fn run() -> Result<i32> {
    let app = Swarm::parse();
    swarm_log::init(app.log_level);
    tracing::trace!(command_structure = ?app);
    tracing::debug!("{} {}", PKG_NAME, PKG_VERSION);

    let output = app.run().await?;
    output.print()?;
    Ok(output.exit_code())
}
