//! Invocation contract for the external EuroEval harness.
//!
//! The harness is an opaque collaborator: its argument grammar and result
//! formats are owned by the harness itself. This layer only splits the raw
//! argument string and hands it over verbatim.

use anyhow::{Context, Result};

/// Environment variable carrying the full harness argument string.
pub const ARGS_ENV: &str = "EUROEVAL_ARGS";

/// Harness executable invoked by the container entrypoint.
pub const DEFAULT_HARNESS: &str = "euroeval";

/// Harness-managed cache directory created during test runs.
pub const RUN_CACHE_DIR: &str = ".euroeval_cache";

/// Guidance printed when no arguments are supplied. A deliberate no-op, not
/// an error.
pub const USAGE_HINT: &str = "\
No EUROEVAL_ARGS supplied - nothing to do.

Start an evaluation with:

  docker run --gpus all -e EUROEVAL_ARGS='--model <model-id>' <image>

The value of EUROEVAL_ARGS is shell-split and passed to the harness verbatim.";

/// Split the raw argument string into discrete harness arguments.
///
/// Returns `None` when the variable is unset, empty, or whitespace-only —
/// the caller must treat that as a successful no-op.
///
/// # Errors
///
/// Returns an error when the string cannot be shell-split (unbalanced
/// quotes). Guessing an argv here would misinvoke the harness.
pub fn split_args(raw: Option<&str>) -> Result<Option<Vec<String>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let argv = shell_words::split(raw).with_context(|| format!("parsing {ARGS_ENV}"))?;
    Ok(Some(argv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_args_unset_is_noop() {
        assert!(split_args(None).expect("ok").is_none());
    }

    #[test]
    fn test_split_args_empty_is_noop() {
        assert!(split_args(Some("")).expect("ok").is_none());
    }

    #[test]
    fn test_split_args_whitespace_only_is_noop() {
        assert!(split_args(Some("   \t ")).expect("ok").is_none());
    }

    #[test]
    fn test_split_args_model_flag_yields_two_arguments() {
        let argv = split_args(Some("--model gpt-4o")).expect("ok").expect("some");
        assert_eq!(argv, vec!["--model", "gpt-4o"]);
    }

    #[test]
    fn test_split_args_preserves_quoted_values() {
        let argv = split_args(Some("--model 'org/model name' --batch-size 8"))
            .expect("ok")
            .expect("some");
        assert_eq!(argv, vec!["--model", "org/model name", "--batch-size", "8"]);
    }

    #[test]
    fn test_split_args_unbalanced_quote_is_error() {
        let err = split_args(Some("--model 'oops")).unwrap_err().to_string();
        assert!(err.contains(ARGS_ENV), "got: {err}");
    }
}
