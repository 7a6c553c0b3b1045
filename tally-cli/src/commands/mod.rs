//! Subcommands and the helpers they share.

pub mod extract;
pub mod phase;
pub mod status;

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::de::DeserializeOwned;

use tally_api::{BearerSession, HttpClient};
use tally_core::{config, Config, Environment};
use tally_sync::{RunReport, StepOutcome};

/// Explicit `--config` path, or `~/.tally/config.yaml`.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::load_at(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => config::load().context("failed to load ~/.tally/config.yaml"),
    }
}

/// Parse a request form. The environment name is validated here, before any
/// other file or network access.
pub fn read_form<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request form {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid request form {}", path.display()))
}

pub fn connect(environment: Environment) -> Result<HttpClient> {
    let session = BearerSession::open(environment)
        .with_context(|| format!("no usable credentials for {environment}"))?;
    Ok(HttpClient::new(session))
}

/// Print one line per artifact kind plus collected warnings; error out if any kind failed.
pub fn finish(report: &RunReport) -> Result<()> {
    for step in &report.steps {
        match &step.outcome {
            StepOutcome::Done(log) => {
                println!(
                    "{} {} ({} processed, {} skipped)",
                    "✓".green(),
                    step.kind,
                    log.processed.len(),
                    log.skipped.len()
                );
                for skip in &log.skipped {
                    println!("    {} {}: {}", "-".bright_black(), skip.unit, skip.reason);
                }
            }
            StepOutcome::Skipped => println!("{} {} (not selected)", "·".bright_black(), step.kind),
            StepOutcome::Failed(reason) => println!("{} {}: {}", "✗".red(), step.kind, reason),
        }
    }

    let warnings: Vec<&str> = report.warnings().collect();
    if !warnings.is_empty() {
        println!("{}", format!("{} warning(s):", warnings.len()).yellow());
        for warning in warnings {
            println!("  {warning}");
        }
    }

    if report.has_failures() {
        bail!("{} finished with failures", report.phase);
    }
    println!("{}", format!("{} completed", report.phase).green().bold());
    Ok(())
}
