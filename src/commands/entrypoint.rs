//! `evalbox entrypoint` — the container's run-phase controller.
//!
//! Translates the externally-supplied argument string into one harness
//! invocation. No arguments is a deliberate, successful no-op; otherwise the
//! harness inherits stdio and working directory (and with it any pre-staged
//! results), and its exit status is mirrored unchanged.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::command_runner::CommandRunner;
use crate::harness;

/// Arguments for the entrypoint command.
#[derive(Args)]
pub struct EntrypointArgs {
    /// Harness executable to invoke (dev/test override)
    #[arg(long, env = "EVALBOX_HARNESS", default_value = harness::DEFAULT_HARNESS)]
    pub harness: String,

    /// Working directory for the harness (defaults to the current directory)
    #[arg(long)]
    pub workdir: Option<PathBuf>,
}

/// Entry point for `evalbox entrypoint`.
///
/// # Errors
///
/// Returns an error if the argument string cannot be shell-split or the
/// harness cannot be spawned. A non-zero harness exit is not an error here —
/// it becomes the returned exit code.
pub async fn run(args: &EntrypointArgs, runner: &impl CommandRunner) -> Result<ExitCode> {
    let raw = std::env::var(harness::ARGS_ENV).ok();
    let Some(argv) = harness::split_args(raw.as_deref())? else {
        println!("{}", harness::USAGE_HINT);
        return Ok(ExitCode::SUCCESS);
    };

    let arg_refs: Vec<&str> = argv.iter().map(String::as_str).collect();
    let status = runner
        .run_status(&args.harness, &arg_refs, args.workdir.as_deref())
        .await
        .with_context(|| format!("failed to launch harness '{}'", args.harness))?;

    // Mirror the harness's exit status verbatim; signal death maps to 1.
    let code = status.code().unwrap_or(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(ExitCode::from(code as u8))
}
