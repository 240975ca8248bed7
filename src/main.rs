//! Evalbox - GPU container entrypoint and CI pipeline runner for the EuroEval harness

use std::process::ExitCode;

use clap::Parser;

use evalbox::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
