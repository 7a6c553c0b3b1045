//! `tally status` — summarize the last plan output without touching the platform.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tally_sync::{PlanSummary, SummaryRow};

use super::load_config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Also print a unified diff for every changed property.
    #[arg(long)]
    pub changes: bool,
}

#[derive(Serialize)]
struct StatusJson {
    target_env: Option<String>,
    planned_at: Option<String>,
    changes: Vec<RowJson>,
}

#[derive(Serialize)]
struct RowJson {
    kind: String,
    unit: String,
    add: usize,
    update: usize,
    delete: usize,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "unit")]
    unit: String,
    #[tabled(rename = "add")]
    add: usize,
    #[tabled(rename = "update")]
    update: usize,
    #[tabled(rename = "delete")]
    delete: usize,
}

impl From<SummaryRow> for StatusTableRow {
    fn from(row: SummaryRow) -> Self {
        Self {
            kind: row.kind.to_string(),
            unit: row.unit,
            add: row.add,
            update: row.update,
            delete: row.delete,
        }
    }
}

impl StatusArgs {
    pub fn run(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = load_config(config_path.as_deref())?;
        let layout = config.layout();
        let summary = PlanSummary::load(&layout)
            .with_context(|| format!("failed to read plan output under {}", layout.temp_dir().display()))?;

        if self.json {
            return print_json(&summary);
        }
        print_table(&summary);
        if self.changes {
            for (unit, diff) in summary.property_changes() {
                println!("{}", unit.bold());
                print_diff(&diff);
            }
        }
        Ok(())
    }
}

fn print_json(summary: &PlanSummary) -> Result<()> {
    let payload = StatusJson {
        target_env: summary.manifest.as_ref().map(|m| m.target_env.to_string()),
        planned_at: summary.manifest.as_ref().map(|m| m.planned_at.to_rfc3339()),
        changes: summary
            .rows()
            .into_iter()
            .map(|row| RowJson {
                kind: row.kind.to_string(),
                unit: row.unit,
                add: row.add,
                update: row.update,
                delete: row.delete,
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(summary: &PlanSummary) {
    match &summary.manifest {
        Some(manifest) => println!(
            "Plan for {} | {}",
            manifest.target_env.to_string().bold(),
            manifest.planned_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println!("{}", "No plan manifest found.".yellow()),
    }

    if summary.is_empty() {
        println!("Nothing to deploy. Run 'tally plan' to compare against a target.");
        return;
    }

    let rows: Vec<StatusTableRow> = summary.rows().into_iter().map(Into::into).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn print_diff(diff: &str) {
    for line in diff.lines() {
        let line = if line.starts_with("+++") || line.starts_with("---") {
            line.bold()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else if line.starts_with("@@") {
            line.cyan()
        } else {
            line.normal()
        };
        println!("{line}");
    }
}
