//! `showroom-worker` -- runs one 3D asset generation from the command line.
//!
//! Generates an image for the prompt, starts one reconstruction job per
//! target model, and prints each model's outcome as it finishes.
//! Ctrl-C cancels the run; models still polling report `Cancelled`.
//!
//! Configuration comes from the environment (see
//! [`WorkerConfig::from_env`](showroom_worker::config::WorkerConfig::from_env)).

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use showroom_pipeline::{JobOrchestrator, ModelState};
use showroom_remote::RemoteJobApi;
use showroom_worker::cli::Args;
use showroom_worker::config::WorkerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "showroom_worker=info,showroom_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    let request = args.into_request(&config.target_models);

    tracing::info!(
        api_url = %config.api_url,
        interval_secs = config.poll.interval.as_secs(),
        max_attempts = config.poll.max_attempts,
        "Starting showroom-worker",
    );

    let api = RemoteJobApi::with_timeout(&config.api_url, config.request_timeout)
        .context("Failed to build HTTP client")?;
    let orchestrator = JobOrchestrator::new(Arc::new(api), config.poll);

    let mut run = orchestrator.generate_and_reconstruct(request);
    tracing::info!(
        run_id = %run.run_id(),
        models = run.models().len(),
        "Generation run submitted",
    );

    let mut updates = run.subscribe();
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            if let ModelState::AwaitingReconstruction { command_id } = &update.state {
                tracing::info!(
                    model = %update.model,
                    command_id = %command_id,
                    "Reconstruction job started",
                );
            } else {
                tracing::debug!(
                    model = %update.model,
                    state = ?update.state,
                    "Model state changed",
                );
            }
        }
    });

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    loop {
        tokio::select! {
            outcome = run.next() => {
                let Some((model, result)) = outcome else { break };
                let line = match result {
                    Ok(artifact) => {
                        succeeded += 1;
                        serde_json::json!({
                            "model": model,
                            "status": "succeeded",
                            "artifact": artifact,
                        })
                    }
                    Err(e) => {
                        failed += 1;
                        serde_json::json!({
                            "model": model,
                            "status": "failed",
                            "error": e.to_string(),
                        })
                    }
                };
                println!("{line}");
            }
            _ = tokio::signal::ctrl_c(), if !run.is_cancelled() => {
                tracing::warn!("Interrupt received, cancelling run");
                run.cancel();
            }
        }
    }

    tracing::info!(succeeded, failed, "Generation run complete");
    if succeeded == 0 {
        anyhow::bail!("No model was reconstructed");
    }
    Ok(())
}
