//! `evalbox stage` — build-phase staging of a prior results bundle.
//!
//! Invoked once from the Dockerfile so the harness can skip work that prior
//! runs already computed. Zero matches is success by design.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::bundle;
use crate::output::OutputContext;

/// Arguments for the stage command.
#[derive(Args)]
pub struct StageArgs {
    /// Build context to copy the results bundle from
    #[arg(long, default_value = ".")]
    pub context: PathBuf,

    /// Working directory the harness will run in
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,
}

/// Entry point for `evalbox stage`.
///
/// # Errors
///
/// Returns an error if the context directory is missing or a matched entry
/// cannot be copied.
pub fn run(args: &StageArgs, ctx: &OutputContext) -> Result<()> {
    let staged = bundle::stage(&args.context, &args.workdir)?;
    if staged == 0 {
        ctx.info("no prior results bundle found - harness starts fresh");
    } else {
        ctx.success(&format!("staged {staged} results bundle entries"));
    }
    Ok(())
}
