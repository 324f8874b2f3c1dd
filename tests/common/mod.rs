//! Shared test support: a scripted [`CommandRunner`] that records every
//! invocation instead of touching the host.

use std::sync::Mutex;

use wine_chroot::services::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

type Script = Box<dyn Fn(&CommandSpec) -> Result<CommandOutput, ProcessError> + Send + Sync>;

/// Fake runner: every `run` call is recorded and answered by the script,
/// every `spawn_detached` call is recorded and succeeds.
pub struct ScriptedRunner {
    script: Script,
    calls: Mutex<Vec<CommandSpec>>,
    detached: Mutex<Vec<CommandSpec>>,
}

#[allow(dead_code)]
impl ScriptedRunner {
    /// Every command exits 0 with empty output.
    pub fn succeeding() -> Self {
        Self::with_script(|_| Ok(CommandOutput::default()))
    }

    pub fn with_script(
        script: impl Fn(&CommandSpec) -> Result<CommandOutput, ProcessError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            detached: Mutex::new(Vec::new()),
        }
    }

    /// Shell-style rendering of every `run` invocation, in order.
    pub fn call_lines(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(CommandSpec::display_line)
            .collect()
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn detached(&self) -> Vec<CommandSpec> {
        self.detached.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ProcessError> {
        self.calls.lock().unwrap().push(spec.clone());
        (self.script)(&spec)
    }

    fn spawn_detached(&self, spec: CommandSpec) -> Result<(), ProcessError> {
        self.detached.lock().unwrap().push(spec);
        Ok(())
    }
}

/// A zero-exit output carrying `stdout`.
#[allow(dead_code)]
pub fn output(stdout: &str) -> CommandOutput {
    CommandOutput {
        code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

/// A non-zero exit without an error (the command ran, but failed).
#[allow(dead_code)]
pub fn exit_with(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}
