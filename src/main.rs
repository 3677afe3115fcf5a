// src/main.rs

mod aggregator;
mod cli;
mod config;
mod error;
mod gitlab;
mod importer;
mod model;
mod pipeline;
mod publisher;

use anyhow::Context;
use clap::Parser;
use cli::Args;
use config::Config;
use gitlab::GitLabClient;
use publisher::RemotePublisher;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::from_args(args).context("invalid configuration")?;
    let origin = GitLabClient::new(&config).context("could not create GitLab client")?;
    let publisher = RemotePublisher::new(&config);

    let summary = pipeline::run(&config, &origin, &publisher).context("import failed")?;
    tracing::info!(
        projects = summary.projects,
        batches = summary.batches,
        created = summary.imported.created,
        duplicates = summary.imported.duplicates,
        pushed = summary.push.is_some(),
        "run complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "activity_importer=info,git2=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let start_time = Instant::now();

    let outcome = run(args);
    tracing::info!("Operation took {:.2?} in total.", start_time.elapsed());

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
