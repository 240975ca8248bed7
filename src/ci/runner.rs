//! Run execution — admission control, fan-out, credential scoping, cleanup.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::ci::concurrency::ConcurrencyGroups;
use crate::ci::event::PullRequestEvent;
use crate::ci::secrets::SecretStore;
use crate::ci::workflow::{Cell, JobSpec, Workflow};
use crate::command_runner::CommandRunner;

/// Terminal state of a cell, job, or run.
///
/// Ordered by severity so aggregates are a `max()`: a skipped job never
/// worsens a run, cancellation dominates failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    Skipped,
    Passed,
    Failed,
    Cancelled,
}

/// Result of one matrix cell.
#[derive(Debug, Clone)]
pub struct CellReport {
    pub label: String,
    pub outcome: Outcome,
    /// First step that failed, if any.
    pub failed_step: Option<String>,
    /// Secrets referenced by this cell's steps but not set; those bindings
    /// resolved to empty values.
    pub missing_secrets: Vec<String>,
}

/// Result of one job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub id: String,
    pub outcome: Outcome,
    pub cells: Vec<CellReport>,
}

/// Result of one workflow run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// False when the event did not trigger the workflow at all.
    pub triggered: bool,
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    fn not_triggered() -> Self {
        Self {
            triggered: false,
            jobs: Vec::new(),
        }
    }

    /// Aggregate outcome: worst job outcome, `Skipped` when nothing ran.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.jobs
            .iter()
            .map(|j| j.outcome)
            .max()
            .unwrap_or(Outcome::Skipped)
    }
}

/// Executes workflow runs for pull-request events.
///
/// Jobs run concurrently and independently; matrix cells within a job run
/// concurrently and independently. The concurrency group is the only
/// cross-run constraint: dispatching an event preempts any in-flight run for
/// the same (workflow, branch) key.
pub struct Orchestrator<R> {
    workflow: Arc<Workflow>,
    secrets: Arc<SecretStore>,
    /// Every secret name the workflow references. Scrubbed from each step's
    /// inherited environment so a secret reaches only the step binding it.
    secret_names: Arc<Vec<String>>,
    groups: ConcurrencyGroups,
    runner: Arc<R>,
}

impl<R> Clone for Orchestrator<R> {
    fn clone(&self) -> Self {
        Self {
            workflow: Arc::clone(&self.workflow),
            secrets: Arc::clone(&self.secrets),
            secret_names: Arc::clone(&self.secret_names),
            groups: self.groups.clone(),
            runner: Arc::clone(&self.runner),
        }
    }
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(workflow: Workflow, secrets: SecretStore, runner: R) -> Self {
        let secret_names = workflow.secret_names().into_iter().collect();
        Self {
            workflow: Arc::new(workflow),
            secrets: Arc::new(secrets),
            secret_names: Arc::new(secret_names),
            groups: ConcurrencyGroups::new(),
            runner: Arc::new(runner),
        }
    }

    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Run the workflow for one event.
    ///
    /// Dispatching registers with the concurrency group first, cancelling
    /// any in-flight run for the same branch. Non-triggering events produce
    /// an empty report without touching the group.
    pub async fn dispatch(&self, event: &PullRequestEvent) -> RunReport {
        if !self.workflow.trigger.matches(event) {
            return RunReport::not_triggered();
        }

        let key = self.workflow.concurrency_key(&event.branch);
        let ticket = self
            .groups
            .begin(&key, self.workflow.concurrency.cancel_in_progress);

        let jobs = join_all(
            self.workflow
                .jobs
                .iter()
                .map(|job| self.run_job(job, event, &ticket.token)),
        )
        .await;

        self.groups.finish(&ticket);
        RunReport {
            triggered: true,
            jobs,
        }
    }

    /// Run one job: admission control, then concurrent matrix cells.
    ///
    /// Guards are evaluated here, per job — jobs are independently scheduled
    /// units and never share a gate.
    async fn run_job(
        &self,
        job: &JobSpec,
        event: &PullRequestEvent,
        token: &CancellationToken,
    ) -> JobReport {
        if event.draft {
            return JobReport {
                id: job.id.clone(),
                outcome: Outcome::Skipped,
                cells: Vec::new(),
            };
        }
        if let Some(label) = &job.require_label
            && !event.has_label(label)
        {
            return JobReport {
                id: job.id.clone(),
                outcome: Outcome::Skipped,
                cells: Vec::new(),
            };
        }

        let cells = join_all(
            job.cells()
                .into_iter()
                .map(|cell| self.run_cell(job, cell, token)),
        )
        .await;

        let outcome = cells
            .iter()
            .map(|c| c.outcome)
            .max()
            .unwrap_or(Outcome::Passed);
        JobReport {
            id: job.id.clone(),
            outcome,
            cells,
        }
    }

    /// Run one matrix cell's steps in order.
    ///
    /// A failed step fails the cell but `always_run` steps still execute.
    /// Cancellation abandons the remainder outright — cleanup is scoped per
    /// attempt and is not guaranteed across cancellation.
    async fn run_cell(&self, job: &JobSpec, cell: Cell, token: &CancellationToken) -> CellReport {
        let label = cell.label();
        let mut failed_step: Option<String> = None;
        let mut missing_secrets: Vec<String> = Vec::new();

        for step in &job.steps {
            if token.is_cancelled() {
                return CellReport {
                    label,
                    outcome: Outcome::Cancelled,
                    failed_step,
                    missing_secrets,
                };
            }
            if failed_step.is_some() && !step.always_run {
                continue;
            }

            let rendered = step.rendered_run(&cell);
            let argv = match shell_words::split(&rendered) {
                Ok(argv) if !argv.is_empty() => argv,
                _ => {
                    // Validated at load; a bad line still must not pass.
                    failed_step.get_or_insert_with(|| step.name.clone());
                    continue;
                }
            };
            let args: Vec<&str> = argv.iter().skip(1).map(String::as_str).collect();

            let (envs, missing) = self.secrets.resolve(&step.env);
            missing_secrets.extend(missing);

            let result = tokio::select! {
                result = self
                    .runner
                    .run_with_env(&argv[0], &args, &envs, &self.secret_names) => result,
                () = token.cancelled() => {
                    return CellReport {
                        label,
                        outcome: Outcome::Cancelled,
                        failed_step,
                        missing_secrets,
                    };
                }
            };

            match result {
                Ok(output) if output.status.success() => {}
                Ok(_) | Err(_) => {
                    failed_step.get_or_insert_with(|| step.name.clone());
                }
            }
        }

        missing_secrets.sort_unstable();
        missing_secrets.dedup();
        let outcome = if failed_step.is_some() {
            Outcome::Failed
        } else {
            Outcome::Passed
        };
        CellReport {
            label,
            outcome,
            failed_step,
            missing_secrets,
        }
    }
}
