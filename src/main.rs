//! Application entry point: Vietnamese text corrector CLI.
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Initialise logging (`RUST_LOG` overrides the `info` default).
//! 3. Load [`AppConfig`] (defaults on first run or on a broken file).
//! 4. Probe every backend once and build the [`CorrectionService`].
//! 5. Run the subcommand; `correct --queued` also starts the job worker.

mod cli;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use cli::{Cli, Command};
use viet_corrector::config::{AppConfig, AppPaths};
use viet_corrector::jobs::{CorrectionRequest, JobStatus};
use viet_corrector::CorrectionService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Vietnamese text corrector starting up");

    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppPaths::new().settings_file);

    if let Command::InitConfig { force } = cli.command {
        return init_config(&settings_path, force);
    }

    let config = AppConfig::load_from(&settings_path).unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    let service = CorrectionService::from_config(&config).await;
    let selectors = cli.selectors();
    let pipeline = cli.pipeline.as_deref();

    match &cli.command {
        Command::Correct { text, file, queued } => {
            let text = match (text, file) {
                (Some(text), _) => text.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                (None, None) => bail!("give the text to correct or --file"),
            };

            if *queued {
                let poll_interval = Duration::from_millis(config.queue.poll_interval_ms.max(1));
                let worker = service.start_worker();
                let id = service.submit(CorrectionRequest {
                    text,
                    pipeline: cli.pipeline.clone(),
                    selectors,
                })?;

                let snapshot = loop {
                    let snapshot = service.poll(&id)?;
                    if snapshot.status.is_terminal() {
                        break snapshot;
                    }
                    log::debug!(
                        "job {id}: {} (position {:?})",
                        snapshot.status,
                        snapshot.queue_position
                    );
                    tokio::time::sleep(poll_interval).await;
                };
                worker.shutdown().await;

                if cli.json {
                    print_json(&snapshot)?;
                } else if snapshot.status == JobStatus::Completed {
                    if let Some(result) = &snapshot.result {
                        println!("{}", result.corrected);
                        eprintln!("\n{}", result.explanation);
                    }
                } else {
                    bail!(
                        "job {id} failed: {}",
                        snapshot.error.as_deref().unwrap_or("unknown error")
                    );
                }
            } else {
                let result = service.correct_sync(&text, pipeline, &selectors).await?;
                if cli.json {
                    print_json(&result)?;
                } else {
                    println!("{}", result.corrected);
                    eprintln!("\n{}", result.explanation);
                }
            }
        }

        Command::Batch { file, output } => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let batch = service.correct_text_batch(&text, pipeline, &selectors).await?;

            if let Some(path) = output {
                std::fs::write(path, &batch.full_text)
                    .with_context(|| format!("cannot write {}", path.display()))?;
                log::info!("Corrected text written to {}", path.display());
            }

            if cli.json {
                print_json(&batch)?;
            } else {
                for paragraph in &batch.paragraphs {
                    if let Some(note) = &paragraph.note {
                        println!("[{}] {note}\n", paragraph.index + 1);
                    }
                }
                if output.is_none() {
                    println!("{}", batch.full_text);
                }
            }
        }

        Command::Health => {
            let report = service.health().await;
            if cli.json {
                print_json(&report)?;
            } else {
                for backend in &report.backends {
                    let state = if backend.available { "available" } else { "unavailable" };
                    println!("{:<10} {:<8} {state}", backend.kind.as_str(), backend.name);
                    if !backend.variants.is_empty() {
                        println!("           variants: {}", backend.variants.join(", "));
                    }
                }
                println!("pipelines: {}", report.pipelines.join(", "));
                println!("default:   {}", report.default_pipeline);
            }
        }

        // Handled before backend setup.
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

fn init_config(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default().save_to(path)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
