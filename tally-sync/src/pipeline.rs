//! Phase runner: extract, plan and deploy across every artifact kind.
//!
//! Kinds run in [`ArtifactKind::all`] order, one after the other. Whether a
//! failing kind stops its phase is decided by [`is_fatal`]; every other
//! failure is recorded in the [`RunReport`] and the next kind still runs.

use tally_core::types::{ArtifactKind, ExtractForm, PlanDeployForm};

use crate::context::Context;
use crate::error::SyncError;
use crate::report::{Phase, RunReport, StepLog, StepOutcome, StepReport};
use crate::summary::PlanManifest;
use crate::writer::reset_dir;
use crate::{billing, fields, objects, records, workflows};

/// Whether a failure of `kind` aborts `phase`.
pub fn is_fatal(phase: Phase, kind: ArtifactKind) -> bool {
    match phase {
        Phase::Extract => matches!(
            kind,
            ArtifactKind::CustomFields | ArtifactKind::BillingDocuments | ArtifactKind::Workflows
        ),
        Phase::Plan => kind == ArtifactKind::CustomObjectRecords,
        Phase::Deploy => false,
    }
}

fn run_step(
    report: &mut RunReport,
    kind: ArtifactKind,
    selected: bool,
    step: impl FnOnce() -> Result<StepLog, SyncError>,
) -> Result<(), SyncError> {
    let phase = report.phase;
    let outcome = if !selected {
        tracing::info!("skipping {kind} {phase}");
        StepOutcome::Skipped
    } else {
        tracing::info!("{phase}: {kind}");
        match step() {
            Ok(log) => {
                tracing::info!(
                    "{phase}: {kind} done ({} processed, {} skipped)",
                    log.processed.len(),
                    log.skipped.len()
                );
                StepOutcome::Done(log)
            }
            Err(e) if is_fatal(phase, kind) => {
                tracing::error!("{phase}: {kind} failed: {e}");
                return Err(SyncError::StepFailed {
                    kind,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                tracing::error!("{phase}: {kind} failed: {e}");
                StepOutcome::Failed(e.to_string())
            }
        }
    };
    report.steps.push(StepReport { kind, outcome });
    Ok(())
}

fn workflows_selected<T>(workflows: &[T]) -> bool {
    !workflows.is_empty()
}

/// Pull the selected artifacts from the source environment into the repository.
pub fn extract(ctx: &Context<'_>, form: &ExtractForm) -> Result<RunReport, SyncError> {
    tracing::info!("extracting from {}", form.source_environment);
    let mut report = RunReport::new(Phase::Extract);
    let selection = &form.selection;

    run_step(&mut report, ArtifactKind::CustomFields, selection.include_custom_fields, || {
        fields::extract(ctx)
    })?;
    run_step(
        &mut report,
        ArtifactKind::CustomObjectDefinitions,
        selection.include_custom_object_definitions,
        || objects::extract(ctx),
    )?;
    run_step(
        &mut report,
        ArtifactKind::CustomObjectRecords,
        selection.include_custom_object_records,
        || records::extract(ctx),
    )?;
    run_step(&mut report, ArtifactKind::BillingDocuments, selection.include_html_templates, || {
        billing::extract(ctx)
    })?;
    run_step(
        &mut report,
        ArtifactKind::Workflows,
        workflows_selected(&form.workflows),
        || workflows::extract(ctx, &form.workflows),
    )?;
    Ok(report)
}

/// Diff the repository against the target and persist deployable output under `temp/`.
///
/// `temp/` is emptied first, so a plan never mixes with a previous one.
pub fn plan(ctx: &Context<'_>, form: &PlanDeployForm) -> Result<RunReport, SyncError> {
    tracing::info!("planning against {}", form.target_env);
    reset_dir(&ctx.layout.temp_dir())?;
    let mut report = RunReport::new(Phase::Plan);
    let selection = &form.selection;

    run_step(&mut report, ArtifactKind::CustomFields, selection.include_custom_fields, || {
        fields::plan(ctx)
    })?;
    run_step(
        &mut report,
        ArtifactKind::CustomObjectDefinitions,
        selection.include_custom_object_definitions,
        || objects::plan(ctx),
    )?;
    run_step(
        &mut report,
        ArtifactKind::CustomObjectRecords,
        selection.include_custom_object_records,
        || records::plan(ctx),
    )?;
    run_step(&mut report, ArtifactKind::BillingDocuments, selection.include_html_templates, || {
        billing::plan(ctx)
    })?;
    run_step(
        &mut report,
        ArtifactKind::Workflows,
        workflows_selected(&form.workflows),
        || workflows::plan(ctx, &form.workflows),
    )?;

    PlanManifest::new(form.target_env).save(&ctx.layout)?;
    Ok(report)
}

/// Replay the persisted plan output against the target environment.
pub fn deploy(ctx: &Context<'_>, form: &PlanDeployForm) -> Result<RunReport, SyncError> {
    tracing::info!("deploying to {}", form.target_env);
    match PlanManifest::load(&ctx.layout)? {
        Some(manifest) if manifest.target_env != form.target_env => tracing::warn!(
            "plan output was prepared for {} at {}, deploying to {}",
            manifest.target_env,
            manifest.planned_at,
            form.target_env
        ),
        Some(_) => {}
        None => tracing::warn!("no plan manifest found; run plan first"),
    }
    let mut report = RunReport::new(Phase::Deploy);
    let selection = &form.selection;

    run_step(&mut report, ArtifactKind::CustomFields, selection.include_custom_fields, || {
        fields::deploy(ctx)
    })?;
    run_step(
        &mut report,
        ArtifactKind::CustomObjectDefinitions,
        selection.include_custom_object_definitions,
        || objects::deploy(ctx),
    )?;
    run_step(
        &mut report,
        ArtifactKind::CustomObjectRecords,
        selection.include_custom_object_records,
        || records::deploy(ctx),
    )?;
    run_step(&mut report, ArtifactKind::BillingDocuments, selection.include_html_templates, || {
        billing::deploy(ctx)
    })?;
    run_step(
        &mut report,
        ArtifactKind::Workflows,
        workflows_selected(&form.workflows),
        || workflows::deploy(ctx, &form.workflows),
    )?;
    Ok(report)
}
