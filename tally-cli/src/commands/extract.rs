//! `tally extract --form <file>` — pull artifacts from a source environment.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use tally_core::types::ExtractForm;
use tally_sync::Context as SyncContext;

use super::{connect, finish, load_config, read_form};

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Request form (JSON) with `source_environment`, include flags and workflows.
    #[arg(long)]
    pub form: PathBuf,
}

impl ExtractArgs {
    pub fn run(self, config_path: Option<PathBuf>) -> Result<()> {
        let form: ExtractForm = read_form(&self.form)?;
        let config = load_config(config_path.as_deref())?;
        let api = connect(form.source_environment)?;

        let ctx = SyncContext::new(&api, &config);
        let report = tally_sync::extract(&ctx, &form)
            .with_context(|| format!("extract from {} aborted", form.source_environment))?;
        finish(&report)
    }
}
