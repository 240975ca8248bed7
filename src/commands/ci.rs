//! `evalbox ci` — run the pipeline for a replayed pull-request event.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::ci::event::PullRequestEvent;
use crate::ci::secrets::SecretStore;
use crate::ci::workflow::Workflow;
use crate::ci::{Orchestrator, Outcome, RunReport};
use crate::command_runner::{DEFAULT_STEP_TIMEOUT, TokioCommandRunner};
use crate::output::OutputContext;

/// Arguments for the ci command.
#[derive(Args)]
pub struct CiArgs {
    /// Pull-request event payload (JSON)
    #[arg(long)]
    pub event: PathBuf,

    /// Pipeline definition (YAML); defaults to the built-in ci pipeline
    #[arg(long)]
    pub workflow: Option<PathBuf>,
}

/// Entry point for `evalbox ci`.
///
/// Exit code 0 for passed or skipped runs, 1 for failed, 2 for cancelled.
///
/// # Errors
///
/// Returns an error if the event or workflow file cannot be loaded.
pub async fn run(args: &CiArgs, ctx: &OutputContext) -> Result<ExitCode> {
    let event = PullRequestEvent::from_json_file(&args.event)?;
    let workflow = match &args.workflow {
        Some(path) => Workflow::from_yaml_file(path)?,
        None => Workflow::default_ci(),
    };

    let secrets = SecretStore::from_env(workflow.secret_names());
    let orchestrator = Orchestrator::new(
        workflow,
        secrets,
        TokioCommandRunner::new(DEFAULT_STEP_TIMEOUT),
    );

    let report = orchestrator.dispatch(&event).await;
    print_report(ctx, &report);

    Ok(match report.outcome() {
        Outcome::Passed | Outcome::Skipped => ExitCode::SUCCESS,
        Outcome::Failed => ExitCode::from(1),
        Outcome::Cancelled => ExitCode::from(2),
    })
}

fn print_report(ctx: &OutputContext, report: &RunReport) {
    if !report.triggered {
        ctx.info("event does not trigger this workflow");
        return;
    }

    for job in &report.jobs {
        match job.outcome {
            Outcome::Passed => ctx.success(&format!("{} passed", job.id)),
            Outcome::Failed => ctx.error(&format!("{} failed", job.id)),
            Outcome::Skipped => ctx.info(&format!("{} skipped", job.id)),
            Outcome::Cancelled => ctx.warn(&format!("{} cancelled", job.id)),
        }
        for cell in &job.cells {
            match &cell.failed_step {
                Some(step) => ctx.kv(&cell.label, &format!("failed at {step}")),
                None => ctx.kv(&cell.label, &format!("{:?}", cell.outcome).to_lowercase()),
            }
            for name in &cell.missing_secrets {
                ctx.warn(&format!(
                    "secret '{name}' is not set; {} resolved it to an empty value",
                    cell.label
                ));
            }
        }
    }
}
