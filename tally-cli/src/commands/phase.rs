//! `tally plan` and `tally deploy` — both take the same request form.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use tally_core::types::{PlanDeployForm, WorkflowName};
use tally_sync::Context as SyncContext;

use super::{connect, finish, load_config, read_form};

/// Which half of the plan/deploy pair to run.
#[derive(Debug, Clone, Copy)]
pub enum Stage {
    Plan,
    Deploy,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Deploy => "deploy",
        }
    }
}

#[derive(Args, Debug)]
pub struct PhaseArgs {
    /// Request form (JSON) with `target_env`, include flags and workflow names.
    #[arg(long)]
    pub form: PathBuf,

    /// Use every workflow listed in the config instead of the form's list.
    #[arg(long)]
    pub all_workflows: bool,
}

impl PhaseArgs {
    pub fn run(self, stage: Stage, config_path: Option<PathBuf>) -> Result<()> {
        let mut form: PlanDeployForm = read_form(&self.form)?;
        let config = load_config(config_path.as_deref())?;
        if self.all_workflows {
            form.workflows = config
                .workflow_names
                .iter()
                .map(|name| WorkflowName::from(name.as_str()))
                .collect();
        }
        let api = connect(form.target_env)?;

        let ctx = SyncContext::new(&api, &config);
        let report = match stage {
            Stage::Plan => tally_sync::plan(&ctx, &form),
            Stage::Deploy => tally_sync::deploy(&ctx, &form),
        }
        .with_context(|| format!("{} against {} aborted", stage.name(), form.target_env))?;
        finish(&report)
    }
}
