//! Pull-request lifecycle events that trigger the pipeline.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The lifecycle actions the pipeline reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Opened,
    Synchronize,
    Reopened,
    ReadyForReview,
}

/// One pull-request trigger event, as replayed from the platform payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestEvent {
    /// Lifecycle action that produced this event.
    pub action: PullRequestAction,
    /// Source branch — the concurrency-group key component.
    pub branch: String,
    /// Target branch of the pull request.
    pub base: String,
    /// Draft pull requests run no gated job.
    #[serde(default)]
    pub draft: bool,
    /// Labels carried by the pull request.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl PullRequestEvent {
    /// Load an event payload from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading event file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing event file {}", path.display()))
    }

    /// Whether the pull request carries the given label.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}
