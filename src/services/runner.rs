//! Wine execution inside the chroot.

use std::time::Duration;

use crate::models::Config;
use crate::paths::linux_path_to_windows;
use crate::services::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

const WINE_VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Launches Windows applications through Wine in the configured chroot.
pub struct WineRunner<R> {
    config: Config,
    runner: R,
}

impl<R: CommandRunner> WineRunner<R> {
    pub fn new(config: Config, runner: R) -> Self {
        Self { config, runner }
    }

    /// Build the full launch command:
    /// `<privilege> schroot -c <name> -- [env DISPLAY=.. [XAUTHORITY=..]] wine <path> [args..]`
    pub fn build_run_command(&self, win_path: &str, args: &[String]) -> CommandSpec {
        let mut cmd: Vec<String> = vec![
            "schroot".to_string(),
            "-c".to_string(),
            self.config.chroot.name.clone(),
            "--".to_string(),
        ];

        if self.config.execution.x11_forwarding {
            let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string());
            cmd.push("env".to_string());
            cmd.push(format!("DISPLAY={display}"));
            if let Ok(xauthority) = std::env::var("XAUTHORITY")
                && !xauthority.is_empty()
            {
                cmd.push(format!("XAUTHORITY={xauthority}"));
            }
        }

        cmd.push("wine".to_string());
        cmd.push(win_path.to_string());
        cmd.extend(args.iter().cloned());

        CommandSpec::new(self.config.privilege_tool(), cmd)
    }

    /// Run a Windows application.
    ///
    /// The path is translated to Windows form when it looks like a host path.
    /// With `wait` or `show_terminal` the command runs synchronously and its
    /// exit code is returned verbatim; otherwise it is detached into its own
    /// session and 0 is returned immediately, whatever the eventual outcome.
    pub async fn run(
        &self,
        exe_path: &str,
        args: &[String],
        wait: bool,
        show_terminal: bool,
    ) -> Result<i32, ProcessError> {
        let win_path = if exe_path.contains('/') {
            linux_path_to_windows(exe_path)
        } else {
            exe_path.to_string()
        };

        if self.config.execution.x11_forwarding {
            self.grant_x11_access().await;
        }

        let mut spec = self.build_run_command(&win_path, args);

        if wait || show_terminal {
            if show_terminal {
                spec = spec.with_inherited_io();
            }
            let output = self.runner.run(spec).await?;
            Ok(output.code)
        } else {
            self.runner.spawn_detached(spec)?;
            tracing::info!("Application started in background");
            Ok(0)
        }
    }

    /// Best-effort `xhost +local:` so the chroot's root user may talk to the
    /// host display. A missing xhost or a failure is silently ignored.
    async fn grant_x11_access(&self) {
        let spec = CommandSpec::new("xhost", vec!["+local:"]);
        if let Err(e) = self.runner.run(spec).await {
            tracing::debug!("xhost grant skipped: {e}");
        }
    }

    /// Run an arbitrary Wine command inside the chroot.
    pub async fn run_wine_command(
        &self,
        wine_args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, ProcessError> {
        let mut cmd: Vec<String> = vec![
            "schroot".to_string(),
            "-c".to_string(),
            self.config.chroot.name.clone(),
            "--".to_string(),
            "wine".to_string(),
        ];
        cmd.extend(wine_args.iter().map(|s| s.to_string()));

        let mut spec = CommandSpec::new(self.config.privilege_tool(), cmd);
        if let Some(limit) = timeout {
            spec = spec.with_timeout(limit);
        }
        self.runner.run(spec).await
    }

    /// Whether Wine responds inside the chroot: zero exit and non-empty output.
    pub async fn check_wine_installation(&self) -> bool {
        self.get_wine_version().await.is_some()
    }

    /// The trimmed `wine --version` output, accepted as-is without parsing.
    pub async fn get_wine_version(&self) -> Option<String> {
        match self
            .run_wine_command(&["--version"], Some(WINE_VERSION_TIMEOUT))
            .await
        {
            Ok(out) if out.success() && !out.stdout.trim().is_empty() => {
                Some(out.stdout.trim().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Wine version check failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_with(config: Config) -> WineRunner<crate::services::process::SystemRunner> {
        WineRunner::new(config, crate::services::process::SystemRunner::new())
    }

    #[test]
    fn test_build_run_command_shape() {
        let mut config = Config::default();
        config.execution.x11_forwarding = false;
        let runner = runner_with(config);

        let spec = runner.build_run_command(r"C:\Program Files\App\App.exe", &[]);
        assert_eq!(spec.program, "sudo");
        assert_eq!(spec.args[..4], ["schroot", "-c", "debian-amd64", "--"]);
        assert_eq!(spec.args[4], "wine");
        assert_eq!(spec.args[5], r"C:\Program Files\App\App.exe");
    }

    #[test]
    fn test_build_run_command_forwards_display() {
        let mut config = Config::default();
        config.execution.x11_forwarding = true;
        let runner = runner_with(config);

        let spec = runner.build_run_command(r"C:\app.exe", &[]);
        assert!(spec.args.contains(&"env".to_string()));
        assert!(spec.args.iter().any(|a| a.starts_with("DISPLAY=")));
    }

    #[test]
    fn test_build_run_command_pkexec() {
        let mut config = Config::default();
        config.execution.use_pkexec = true;
        config.execution.x11_forwarding = false;
        let runner = runner_with(config);

        let spec = runner.build_run_command(r"C:\app.exe", &[]);
        assert_eq!(spec.program, "pkexec");
    }

    #[test]
    fn test_build_run_command_appends_app_args() {
        let mut config = Config::default();
        config.execution.x11_forwarding = false;
        let runner = runner_with(config);

        let args = vec!["/silent".to_string(), "/norestart".to_string()];
        let spec = runner.build_run_command(r"C:\setup.exe", &args);
        assert_eq!(spec.args[spec.args.len() - 2..], ["/silent", "/norestart"]);
    }
}
