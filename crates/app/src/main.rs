//! Deep Research - command-line entry point
//!
//! Runs one research query through the pipeline and prints the markdown
//! report to stdout (or a file). Logs and the error summary go to stderr.

use std::path::{Path, PathBuf};

use agent_host::ResearchHost;
use anyhow::{Context, Result};
use clap::Parser;
use shared::events::StageEvent;
use shared::settings::AppSettings;
use shared::state::PipelineState;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for deep-research
#[derive(Parser, Debug)]
#[command(name = "deep-research")]
#[command(about = "Research a question on the web and write a cited report")]
#[command(version)]
struct Args {
    /// Settings file (defaults to settings.json in the user config dir)
    #[arg(short, long, env = "DEEP_RESEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dump the final pipeline state as JSON
    #[arg(long)]
    state_json: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the default settings to the config path and exit
    #[arg(long)]
    init_config: bool,

    /// The research question
    #[arg(required_unless_present = "init_config", num_args = 1..)]
    query: Vec<String>,
}

fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com.local", "Deep Research", "DeepResearch")
        .map(|proj| proj.config_dir().join("settings.json"))
}

/// An explicit path must load; the default location may be absent.
fn load_settings(explicit: Option<&Path>, default_path: Option<PathBuf>) -> Result<AppSettings> {
    if let Some(path) = explicit {
        return AppSettings::load(path);
    }
    match default_path {
        Some(path) if path.exists() => AppSettings::load(&path),
        _ => Ok(AppSettings::default()),
    }
}

/// Write default settings to `target`, refusing to overwrite an existing file.
fn init_config(target: Option<PathBuf>) -> Result<PathBuf> {
    let path = target.context("no config directory available; pass --config")?;
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    AppSettings::default().save(&path)?;
    Ok(path)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_run_summary(state: &PipelineState) {
    if !state.platform_summary.is_empty() {
        eprintln!("Platforms: {}", state.platform_summary);
    }
    if state.errors().is_empty() {
        return;
    }
    eprintln!("{} issue(s) during research:", state.errors().len());
    for error in state.errors() {
        eprintln!("  - {}", error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.init_config {
        let path = init_config(args.config.clone().or_else(config_path))?;
        eprintln!("Wrote default settings to {}", path.display());
        return Ok(());
    }

    let settings = load_settings(args.config.as_deref(), config_path())?;
    let query = args.query.join(" ");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let host = ResearchHost::from_settings(&settings).with_events(tx);
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                StageEvent::Started { stage_id, .. } => debug!(stage = %stage_id, "running"),
                StageEvent::Completed {
                    stage_id,
                    duration_ms,
                    new_errors,
                    ..
                } => eprintln!(
                    "[{}] done in {:.1}s ({} new error(s))",
                    stage_id,
                    duration_ms as f64 / 1000.0,
                    new_errors
                ),
            }
        }
    });

    let state = host.research(&query).await;
    drop(host);
    let _ = progress.await;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &state.report_markdown)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", state.report_markdown),
    }

    if let Some(path) = &args.state_json {
        let json = serde_json::to_string_pretty(&state)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write state to {}", path.display()))?;
    }

    print_run_summary(&state);
    Ok(())
}
