//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::command_runner::{DEFAULT_STEP_TIMEOUT, TokioCommandRunner};
use crate::commands;
use crate::output::OutputContext;

/// GPU container entrypoint and CI pipeline runner for the EuroEval harness
#[derive(Parser)]
#[command(
    name = "evalbox",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Launch the harness with the arguments carried by EUROEVAL_ARGS
    Entrypoint(commands::entrypoint::EntrypointArgs),

    /// Stage a prior results bundle from the build context into the workdir
    Stage(commands::stage::StageArgs),

    /// Run the CI pipeline for a pull-request event
    Ci(commands::ci::CiArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails before it can produce an exit
    /// status of its own (bad event file, unreadable workflow, spawn failure).
    pub async fn run(self) -> Result<ExitCode> {
        let Cli { no_color, quiet, json, command } = self;
        match command {
            Command::Version => {
                commands::version::run(json);
                Ok(ExitCode::SUCCESS)
            }
            Command::Entrypoint(args) => {
                let runner = TokioCommandRunner::new(DEFAULT_STEP_TIMEOUT);
                commands::entrypoint::run(&args, &runner).await
            }
            Command::Stage(args) => {
                let ctx = OutputContext::new(no_color, quiet);
                commands::stage::run(&args, &ctx)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Ci(args) => {
                let ctx = OutputContext::new(no_color, quiet);
                commands::ci::run(&args, &ctx).await
            }
        }
    }
}
