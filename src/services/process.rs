//! External command execution.
//!
//! Every operation in this tool is a sequence of external commands
//! (`debootstrap`, `schroot`, `wrestool`, ...). [`CommandRunner`] is the seam
//! between the services and the operating system: production code uses
//! [`SystemRunner`], tests substitute a recording fake.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// A fully-described external command invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Data piped to the child's stdin (used for `tee`-style config writes).
    pub stdin: Option<String>,
    /// Hard wall-clock limit; the child is killed when it elapses.
    pub timeout: Option<Duration>,
    /// Capture stdout/stderr (false inherits the terminal, for `run -t`).
    pub capture: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
            timeout: None,
            capture: true,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn with_inherited_io(mut self) -> Self {
        self.capture = false;
        self
    }

    /// Shell-style rendering for logs and dry-run reporting.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Captured result of a completed command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Closed set of ways an external command can fail, with enough context for
/// the caller to decide between abort, warn-and-continue and retry.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("command not found: {0}")]
    NotFound(String),

    #[error("permission denied running {0}")]
    PermissionDenied(String),

    #[error("{program} timed out after {limit:?}")]
    Timeout { program: String, limit: Duration },

    #[error("{program} exited with status {code}: {stderr}")]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("i/o error running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Abstraction over process execution.
///
/// `run` blocks until the child exits (or the spec's timeout fires); a
/// non-zero exit status is a normal `Ok` result, see [`run_checked`] for the
/// gate-style variant. `spawn_detached` is fire-and-forget: the child is
/// placed in its own session group with null stdio and its outcome is
/// unobservable by design.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ProcessError>;

    fn spawn_detached(&self, spec: CommandSpec) -> Result<(), ProcessError>;
}

impl<T: CommandRunner> CommandRunner for &T {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ProcessError> {
        (**self).run(spec).await
    }

    fn spawn_detached(&self, spec: CommandSpec) -> Result<(), ProcessError> {
        (**self).spawn_detached(spec)
    }
}

/// Run a command and turn a non-zero exit status into [`ProcessError::Failed`].
pub async fn run_checked<R: CommandRunner>(
    runner: &R,
    spec: CommandSpec,
) -> Result<CommandOutput, ProcessError> {
    let program = spec.program.clone();
    let output = runner.run(spec).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(ProcessError::Failed {
            program,
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// [`CommandRunner`] backed by real tokio subprocesses.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ProcessError> {
        tracing::debug!("$ {}", spec.display_line());

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        cmd.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if spec.capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        // Reap the child if the timeout drops the wait future.
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| map_spawn_error(&spec.program, e))?;

        if let Some(input) = &spec.stdin
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| ProcessError::Io {
                    program: spec.program.clone(),
                    source: e,
                })?;
            // Dropping stdin closes the pipe so the child sees EOF.
        }

        let wait = child.wait_with_output();
        let output = match spec.timeout {
            Some(limit) => timeout(limit, wait)
                .await
                .map_err(|_| ProcessError::Timeout {
                    program: spec.program.clone(),
                    limit,
                })?,
            None => wait.await,
        }
        .map_err(|e| ProcessError::Io {
            program: spec.program.clone(),
            source: e,
        })?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn_detached(&self, spec: CommandSpec) -> Result<(), ProcessError> {
        use std::os::unix::process::CommandExt;

        tracing::debug!("$ {} &", spec.display_line());

        let mut cmd = std::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);

        cmd.spawn()
            .map(drop)
            .map_err(|e| map_spawn_error(&spec.program, e))
    }
}

fn map_spawn_error(program: &str, e: std::io::Error) -> ProcessError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ProcessError::NotFound(program.to_string()),
        std::io::ErrorKind::PermissionDenied => ProcessError::PermissionDenied(program.to_string()),
        _ => ProcessError::Io {
            program: program.to_string(),
            source: e,
        },
    }
}
