//! Declarative pipeline definition — triggers, jobs, matrix fan-out, steps.
//!
//! Loaded from YAML or built in code via [`Workflow::default_ci`]. Step
//! command lines stay opaque strings until execution; the only templating is
//! `{python}` / `{os}` substitution per matrix cell.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ci::event::{PullRequestAction, PullRequestEvent};
use crate::harness::RUN_CACHE_DIR;

/// Fixed target branch the pipeline gates merges into.
pub const TARGET_BRANCH: &str = "main";

/// Label that admits the secondary-platform job.
pub const MACOS_LABEL: &str = "macos";

/// Structural problems in a pipeline definition, caught at load time.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("duplicate job id '{0}'")]
    DuplicateJobId(String),

    #[error("job '{0}' has no steps")]
    EmptyJob(String),

    #[error("job '{job}' step '{step}' has an unsplittable command line: {source}")]
    BadCommand {
        job: String,
        step: String,
        source: shell_words::ParseError,
    },
}

/// A pipeline: trigger conditions, concurrency policy, and jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Workflow {
    pub name: String,
    pub trigger: Trigger,
    pub concurrency: Concurrency,
    pub jobs: Vec<JobSpec>,
}

/// Pull-request trigger conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Trigger {
    /// Target branches the pipeline runs for.
    pub branches: Vec<String>,
    /// Lifecycle actions that trigger a run.
    pub types: Vec<PullRequestAction>,
}

impl Trigger {
    /// Whether an event triggers this pipeline at all.
    #[must_use]
    pub fn matches(&self, event: &PullRequestEvent) -> bool {
        self.types.contains(&event.action) && self.branches.iter().any(|b| *b == event.base)
    }
}

/// Concurrency policy: at most one active run per (workflow, branch) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Concurrency {
    /// A superseding event cancels the in-flight run rather than queueing.
    pub cancel_in_progress: bool,
}

/// One independently scheduled job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobSpec {
    pub id: String,
    /// Runner platform, e.g. `ubuntu-latest`.
    pub runs_on: String,
    /// Runtime-version fan-out; `None` means a single unparameterized cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Matrix>,
    /// Label that must be present on the pull request for this job to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_label: Option<String>,
    pub steps: Vec<StepSpec>,
}

/// Matrix fan-out over runtime versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Matrix {
    pub python: Vec<String>,
}

/// One step of a job: a command line plus its credential bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StepSpec {
    pub name: String,
    pub run: String,
    /// Secrets injected into this step's environment — and only this step's.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvBinding>,
    /// Run even after an earlier step failed (cache cleanup).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub always_run: bool,
}

/// One environment variable sourced from a named secret. Two bindings may
/// reference the same secret under different variable names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnvBinding {
    pub name: String,
    pub secret: String,
}

impl EnvBinding {
    fn same(name: &str) -> Self {
        Self {
            name: name.to_string(),
            secret: name.to_string(),
        }
    }
}

/// One concrete matrix cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub os: String,
    pub python: Option<String>,
}

impl Cell {
    /// Human-readable cell identity, e.g. `ubuntu-latest/py3.11`.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.python {
            Some(py) => format!("{}/py{py}", self.os),
            None => self.os.clone(),
        }
    }
}

impl JobSpec {
    /// Expand the matrix into concrete cells.
    #[must_use]
    pub fn cells(&self) -> Vec<Cell> {
        match &self.matrix {
            Some(matrix) => matrix
                .python
                .iter()
                .map(|py| Cell {
                    os: self.runs_on.clone(),
                    python: Some(py.clone()),
                })
                .collect(),
            None => vec![Cell {
                os: self.runs_on.clone(),
                python: None,
            }],
        }
    }
}

impl StepSpec {
    /// Render the command line for a cell, substituting matrix placeholders.
    #[must_use]
    pub fn rendered_run(&self, cell: &Cell) -> String {
        let mut run = self.run.replace("{os}", &cell.os);
        if let Some(py) = &cell.python {
            run = run.replace("{python}", py);
        }
        run
    }
}

impl Workflow {
    /// Load and validate a pipeline definition from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading workflow file {}", path.display()))?;
        let workflow: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing workflow file {}", path.display()))?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Structural validation: unique job ids, non-empty jobs, splittable
    /// command lines.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorkflowError`] found.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let mut seen = BTreeSet::new();
        for job in &self.jobs {
            if !seen.insert(job.id.as_str()) {
                return Err(WorkflowError::DuplicateJobId(job.id.clone()));
            }
            if job.steps.is_empty() {
                return Err(WorkflowError::EmptyJob(job.id.clone()));
            }
            for step in &job.steps {
                if let Err(source) = shell_words::split(&step.run) {
                    return Err(WorkflowError::BadCommand {
                        job: job.id.clone(),
                        step: step.name.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// All secret names any step references, for sourcing from the
    /// environment.
    #[must_use]
    pub fn secret_names(&self) -> BTreeSet<String> {
        self.jobs
            .iter()
            .flat_map(|j| &j.steps)
            .flat_map(|s| &s.env)
            .map(|b| b.secret.clone())
            .collect()
    }

    /// Concurrency-group key = (workflow identity, source-branch identity).
    #[must_use]
    pub fn concurrency_key(&self, branch: &str) -> String {
        format!("{}-{branch}", self.name)
    }

    /// The shipped merge-gating pipeline: a static-analysis job plus a
    /// primary test matrix and a label-gated secondary platform job.
    #[must_use]
    pub fn default_ci() -> Self {
        let test_steps = |extra_env: &[EnvBinding]| {
            let mut pytest_env = vec![
                EnvBinding::same("OPENAI_API_KEY"),
                EnvBinding::same("ANTHROPIC_API_KEY"),
                EnvBinding::same("GEMINI_API_KEY"),
                EnvBinding::same("HF_TOKEN"),
                // Same secret under a second name: the test suite contains two
                // credential-lookup conventions and neither is authoritative.
                EnvBinding {
                    name: "HUGGINGFACE_API_KEY".to_string(),
                    secret: "HF_TOKEN".to_string(),
                },
            ];
            pytest_env.extend_from_slice(extra_env);
            vec![
                StepSpec {
                    name: "setup-python".to_string(),
                    run: "uv python install {python}".to_string(),
                    env: Vec::new(),
                    always_run: false,
                },
                StepSpec {
                    name: "install-deps".to_string(),
                    run: "uv sync --no-dev --group test --python {python}".to_string(),
                    env: Vec::new(),
                    always_run: false,
                },
                StepSpec {
                    name: "install-ollama".to_string(),
                    run: "sh -c \"curl -fsSL https://ollama.com/install.sh | sh\"".to_string(),
                    env: Vec::new(),
                    always_run: false,
                },
                StepSpec {
                    name: "pytest".to_string(),
                    run: "uv run pytest".to_string(),
                    env: pytest_env,
                    always_run: false,
                },
                StepSpec {
                    name: "clear-cache".to_string(),
                    run: format!("rm -rf {RUN_CACHE_DIR}"),
                    env: Vec::new(),
                    always_run: true,
                },
            ]
        };

        Self {
            name: "ci".to_string(),
            trigger: Trigger {
                branches: vec![TARGET_BRANCH.to_string()],
                types: vec![
                    PullRequestAction::Opened,
                    PullRequestAction::Synchronize,
                    PullRequestAction::Reopened,
                    PullRequestAction::ReadyForReview,
                ],
            },
            concurrency: Concurrency {
                cancel_in_progress: true,
            },
            jobs: vec![
                JobSpec {
                    id: "lint".to_string(),
                    runs_on: "ubuntu-latest".to_string(),
                    matrix: None,
                    require_label: None,
                    steps: vec![
                        StepSpec {
                            name: "install-ruff".to_string(),
                            run: "pip install ruff==0.6.9".to_string(),
                            env: Vec::new(),
                            always_run: false,
                        },
                        StepSpec {
                            name: "ruff-check".to_string(),
                            run: "ruff check .".to_string(),
                            env: Vec::new(),
                            always_run: false,
                        },
                        StepSpec {
                            name: "ruff-format-diff".to_string(),
                            run: "ruff format --check --diff .".to_string(),
                            env: Vec::new(),
                            always_run: false,
                        },
                    ],
                },
                JobSpec {
                    id: "test".to_string(),
                    runs_on: "ubuntu-latest".to_string(),
                    matrix: Some(Matrix {
                        python: vec![
                            "3.10".to_string(),
                            "3.11".to_string(),
                            "3.12".to_string(),
                        ],
                    }),
                    require_label: None,
                    steps: test_steps(&[]),
                },
                JobSpec {
                    id: "test-macos".to_string(),
                    runs_on: "macos-latest".to_string(),
                    matrix: Some(Matrix {
                        python: vec!["3.11".to_string()],
                    }),
                    require_label: Some(MACOS_LABEL.to_string()),
                    steps: test_steps(&[
                        EnvBinding::same("AZURE_OPENAI_API_KEY"),
                        EnvBinding::same("AZURE_OPENAI_ENDPOINT"),
                    ]),
                },
            ],
        }
    }
}
