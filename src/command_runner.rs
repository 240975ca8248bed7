use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

/// Default timeout for a single CI step (dependency installs can be slow).
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(600);

/// Generic command execution with timeout and guaranteed process kill.
///
/// This trait is NOT tied to any one program — CI steps and the harness both
/// go through it. The production implementation uses tokio; test doubles can
/// return canned results without spawning processes.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a command with the default timeout and no extra environment.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Run a command with a scoped environment. Every name in `scrub` is
    /// removed from the inherited environment first, then `envs` is applied
    /// on top. Used for credential-scoped steps: secrets reach exactly the
    /// step that declares a binding, even when the surrounding process
    /// carries them.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(String, String)],
        scrub: &[String],
    ) -> Result<Output>;

    /// Run a command with inherited stdio and no timeout, returning only the
    /// exit status. Used for the harness itself, whose output streams through
    /// to the container logs and whose runtime is unbounded.
    async fn run_status(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<std::process::ExitStatus>;
}

/// Production `CommandRunner` — uses tokio for async process execution
/// with guaranteed timeout and kill.
///
/// `tokio::time::timeout` around `.output().await` does not kill the child
/// on every platform when the timeout fires, so this implementation uses
/// `tokio::select!` with explicit `child.kill()`.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_env(program, args, &[], &[]).await
    }

    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(String, String)],
        scrub: &[String],
    ) -> Result<Output> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Scrub before applying bindings: a bound name survives because
        // `env` overrides the earlier `env_remove` for the same key.
        for name in scrub {
            cmd.env_remove(name);
        }
        for (name, value) in envs {
            cmd.env(name, value);
        }
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        // Read stdout/stderr CONCURRENTLY with wait() to avoid pipe deadlock.
        // If the child writes more than the OS pipe buffer, it blocks on
        // write; waiting first would never resolve.
        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", self.timeout.as_secs())
            }
        }
    }

    async fn run_status(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<std::process::ExitStatus> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args).kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        child
            .wait()
            .await
            .with_context(|| format!("waiting for {program}"))
    }
}
