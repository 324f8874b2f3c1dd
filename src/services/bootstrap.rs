//! Chroot bootstrap sequencing.
//!
//! [`ChrootBootstrapper::initialize`] drives the ordered external-command
//! steps that turn an empty directory into a registered, Wine-capable Debian
//! chroot. Steps are either hard gates (any failure aborts the sequence) or
//! conveniences that warn and continue. Nothing here is idempotent: an
//! existing target path is rejected, never reconciled.

use camino::Utf8PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::models::Config;
use crate::services::deps::DependencyChecker;
use crate::services::process::{run_checked, CommandRunner, CommandSpec, ProcessError};

/// Wall-clock limit for the two long package operations (debootstrap, Wine).
pub const SETUP_STEP_TIMEOUT: Duration = Duration::from_secs(600);

const ROOT_CHECK_TIMEOUT: Duration = Duration::from_secs(2);
const VERIFY_ENTER_TIMEOUT: Duration = Duration::from_secs(5);
const VERIFY_WINE_TIMEOUT: Duration = Duration::from_secs(10);

const DEBIAN_MIRROR: &str = "http://deb.debian.org/debian";
const SCHROOT_CONF_DIR: &str = "/etc/schroot/chroot.d";
const SCHROOT_FSTAB: &str = "/etc/schroot/default/fstab";

/// Caller options for `init`; unset fields fall back to the configuration.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub name: Option<String>,
    pub path: Option<Utf8PathBuf>,
    pub debian_version: Option<String>,
    pub skip_wine: bool,
    pub dry_run: bool,
}

/// Identity of one schroot registration, persisted to
/// `/etc/schroot/chroot.d/<name>.conf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChrootDescriptor {
    pub name: String,
    pub path: Utf8PathBuf,
    pub debian_version: String,
    pub architecture: String,
}

impl ChrootDescriptor {
    pub fn conf_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(SCHROOT_CONF_DIR).join(format!("{}.conf", self.name))
    }

    /// Render the schroot registration file.
    pub fn schroot_conf(&self, user: &str, preserve_environment: bool) -> String {
        format!(
            "[{name}]\n\
             description=Debian {arch} chroot for Wine\n\
             directory={path}\n\
             type=directory\n\
             users={user}\n\
             root-users={user}\n\
             personality=linux\n\
             preserve-environment={preserve}\n",
            name = self.name,
            arch = self.architecture,
            path = self.path,
            user = user,
            preserve = preserve_environment,
        )
    }
}

/// Why a bootstrap run stopped.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("missing required tools: {}", .0.join(", "))]
    MissingTools(Vec<String>),

    #[error("path already exists: {0} (remove it first or choose a different path)")]
    PathExists(Utf8PathBuf),

    #[error("{step} failed")]
    StepFailed {
        step: &'static str,
        #[source]
        source: ProcessError,
    },
}

/// Sequences chroot creation, registration and Wine installation.
pub struct ChrootBootstrapper<R> {
    config: Config,
    runner: R,
    checker: DependencyChecker,
}

impl<R: CommandRunner> ChrootBootstrapper<R> {
    pub fn new(config: Config, runner: R) -> Self {
        Self {
            config,
            runner,
            checker: DependencyChecker::new(),
        }
    }

    /// Replace the dependency prober (tests).
    pub fn with_checker(mut self, checker: DependencyChecker) -> Self {
        self.checker = checker;
        self
    }

    /// Run the full bootstrap sequence.
    ///
    /// Hard gates: prerequisites, target path availability, debootstrap,
    /// schroot registration, bind mounts, and Wine installation (unless
    /// skipped). Locales, repositories and i386 enablement warn and continue.
    /// Verification never fails the run. In dry-run mode every step only
    /// reports what it would do and succeeds.
    pub async fn initialize(
        &self,
        opts: &InitOptions,
    ) -> Result<ChrootDescriptor, BootstrapError> {
        let descriptor = self.resolve_descriptor(opts);
        let dry_run = opts.dry_run;

        tracing::info!(
            "Initializing chroot '{}' at {} (Debian {} {})",
            descriptor.name,
            descriptor.path,
            descriptor.debian_version,
            descriptor.architecture,
        );
        if dry_run {
            tracing::info!("Dry-run mode: no changes will be made");
        }

        // Step 1: prerequisites
        tracing::info!("[ 1/10] Checking prerequisites");
        let (ok, missing) = self
            .checker
            .check_bootstrap_tools(self.config.privilege_tool());
        if !ok {
            if dry_run {
                tracing::warn!("Missing required tools: {}", missing.join(", "));
            } else {
                return Err(BootstrapError::MissingTools(missing));
            }
        }
        if !dry_run && !self.check_root_access().await {
            tracing::warn!(
                "Cannot verify sudo access without a password; you may be prompted during installation"
            );
        }

        // Step 2: target path must not exist
        tracing::info!("[ 2/10] Checking that {} is available", descriptor.path);
        if descriptor.path.as_std_path().exists() {
            if dry_run {
                tracing::warn!("Path already exists: {}", descriptor.path);
            } else {
                return Err(BootstrapError::PathExists(descriptor.path.clone()));
            }
        }

        // Step 3: debootstrap (hard, long)
        tracing::info!(
            "[ 3/10] Creating Debian {} {} base system (this may take several minutes)",
            descriptor.debian_version,
            descriptor.architecture,
        );
        self.run_debootstrap(&descriptor, dry_run)
            .await
            .map_err(|e| step_failed("debootstrap", e))?;

        // Step 4: schroot registration (hard)
        tracing::info!("[ 4/10] Registering schroot configuration");
        self.configure_schroot(&descriptor, dry_run)
            .await
            .map_err(|e| step_failed("schroot configuration", e))?;

        // Step 5: bind mounts (hard)
        tracing::info!("[ 5/10] Configuring bind mounts");
        self.configure_fstab(dry_run)
            .await
            .map_err(|e| step_failed("bind mount configuration", e))?;

        // Step 6: locales (soft)
        tracing::info!("[ 6/10] Configuring locales");
        if let Err(e) = self.configure_locales(&descriptor.name, dry_run).await {
            tracing::warn!("Locale configuration failed ({e}), continuing");
        }

        // Step 7: repositories (soft)
        tracing::info!("[ 7/10] Configuring Debian repositories");
        if let Err(e) = self.configure_repositories(&descriptor, dry_run).await {
            tracing::warn!("Repository configuration failed ({e}), continuing");
        }

        // Step 8: i386 multiarch (soft)
        if self.config.wine.enable_i386 {
            tracing::info!("[ 8/10] Enabling i386 architecture");
            if let Err(e) = self.enable_i386(&descriptor.name, dry_run).await {
                tracing::warn!("Failed to add i386 architecture ({e}), continuing");
            }
        } else {
            tracing::info!("[ 8/10] Skipping i386 architecture (disabled in configuration)");
        }

        // Step 9: Wine (hard unless skipped)
        if opts.skip_wine {
            tracing::info!("[ 9/10] Skipping Wine installation (--skip-wine)");
        } else {
            tracing::info!("[ 9/10] Installing Wine (this may take a while)");
            self.install_wine(&descriptor.name, dry_run)
                .await
                .map_err(|e| step_failed("Wine installation", e))?;
        }

        // Step 10: verification (advisory)
        if dry_run {
            tracing::info!("[10/10] Would verify the installation");
        } else {
            tracing::info!("[10/10] Verifying installation");
            if let Err(e) = self.verify_installation(&descriptor.name).await {
                tracing::warn!(
                    "Verification failed ({e}); the chroot was created but may need manual configuration"
                );
            }
        }

        tracing::info!("Chroot initialization completed");
        Ok(descriptor)
    }

    fn resolve_descriptor(&self, opts: &InitOptions) -> ChrootDescriptor {
        let name = opts
            .name
            .clone()
            .unwrap_or_else(|| self.config.chroot.name.clone());
        // A custom name without an explicit path lands under /srv/<name>.
        let path = opts.path.clone().unwrap_or_else(|| {
            if name != self.config.chroot.name {
                Utf8PathBuf::from("/srv").join(&name)
            } else {
                self.config.chroot.path.clone()
            }
        });
        let debian_version = opts
            .debian_version
            .clone()
            .unwrap_or_else(|| self.config.chroot.debian_version.clone());

        ChrootDescriptor {
            name,
            path,
            debian_version,
            architecture: self.config.chroot.architecture.clone(),
        }
    }

    /// Advisory probe for passwordless sudo.
    async fn check_root_access(&self) -> bool {
        let spec =
            CommandSpec::new("sudo", vec!["-n", "true"]).with_timeout(ROOT_CHECK_TIMEOUT);
        matches!(self.runner.run(spec).await, Ok(out) if out.success())
    }

    /// `<privilege> schroot -c <name> -- <args...>`
    fn chroot_exec(&self, name: &str, args: &[&str]) -> CommandSpec {
        let mut full: Vec<String> = vec![
            "schroot".to_string(),
            "-c".to_string(),
            name.to_string(),
            "--".to_string(),
        ];
        full.extend(args.iter().map(|s| s.to_string()));
        CommandSpec::new(self.config.privilege_tool(), full)
    }

    async fn run_debootstrap(
        &self,
        descriptor: &ChrootDescriptor,
        dry_run: bool,
    ) -> Result<(), ProcessError> {
        let spec = CommandSpec::new(
            self.config.privilege_tool(),
            vec![
                "debootstrap".to_string(),
                format!("--arch={}", descriptor.architecture),
                descriptor.debian_version.clone(),
                descriptor.path.to_string(),
                DEBIAN_MIRROR.to_string(),
            ],
        )
        .with_timeout(SETUP_STEP_TIMEOUT);

        if dry_run {
            tracing::info!("Would run: {}", spec.display_line());
            return Ok(());
        }

        run_checked(&self.runner, spec).await.map(drop)
    }

    async fn configure_schroot(
        &self,
        descriptor: &ChrootDescriptor,
        dry_run: bool,
    ) -> Result<(), ProcessError> {
        let content =
            descriptor.schroot_conf(&current_user(), self.config.execution.preserve_environment);
        let conf_path = descriptor.conf_path();

        if dry_run {
            tracing::info!("Would create {} with:\n{}", conf_path, content);
            return Ok(());
        }

        let spec = CommandSpec::new(
            self.config.privilege_tool(),
            vec!["tee".to_string(), conf_path.to_string()],
        )
        .with_stdin(content);
        run_checked(&self.runner, spec).await?;

        tracing::info!("Schroot configured: {}", conf_path);
        Ok(())
    }

    async fn configure_fstab(&self, dry_run: bool) -> Result<(), ProcessError> {
        let fstab_content = "\
# fstab: static file system information for chroots.
# <file system> <mount point>   <type>  <options>  <dump>  <pass>
/dev            /dev            none    rw,bind    0       0
/dev/pts        /dev/pts        none    rw,bind    0       0
/home           /home           none    rw,bind    0       0
/proc           /proc           none    rw,bind    0       0
/sys            /sys            none    rw,bind    0       0
/tmp            /tmp            none    rw,bind    0       0
/tmp/.X11-unix  /tmp/.X11-unix  none    rw,bind    0       0
";

        if dry_run {
            tracing::info!("Would update: {}", SCHROOT_FSTAB);
            return Ok(());
        }

        // Previous fstab is kept with a timestamp suffix, last writer wins.
        if std::path::Path::new(SCHROOT_FSTAB).exists() {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let backup = format!("{SCHROOT_FSTAB}.backup.{ts}");
            let spec = CommandSpec::new(
                self.config.privilege_tool(),
                vec!["cp".to_string(), SCHROOT_FSTAB.to_string(), backup.clone()],
            );
            run_checked(&self.runner, spec).await?;
            tracing::info!("Backed up existing fstab to {}", backup);
        }

        let spec = CommandSpec::new(
            self.config.privilege_tool(),
            vec!["tee".to_string(), SCHROOT_FSTAB.to_string()],
        )
        .with_stdin(fstab_content);
        run_checked(&self.runner, spec).await.map(drop)
    }

    async fn configure_locales(&self, name: &str, dry_run: bool) -> Result<(), ProcessError> {
        if dry_run {
            tracing::info!("Would install locales and generate en_US.UTF-8");
            return Ok(());
        }

        run_checked(&self.runner, self.chroot_exec(name, &["apt", "update"])).await?;
        run_checked(
            &self.runner,
            self.chroot_exec(name, &["apt", "install", "-y", "locales"]),
        )
        .await?;
        run_checked(
            &self.runner,
            self.chroot_exec(name, &["locale-gen", "en_US.UTF-8"]),
        )
        .await
        .map(drop)
    }

    async fn configure_repositories(
        &self,
        descriptor: &ChrootDescriptor,
        dry_run: bool,
    ) -> Result<(), ProcessError> {
        let version = &descriptor.debian_version;
        let sources_list = format!(
            "# Debian {version} repositories\n\
             deb {mirror} {version} main contrib non-free non-free-firmware\n\
             deb-src {mirror} {version} main contrib non-free non-free-firmware\n\
             \n\
             # Updates\n\
             deb {mirror} {version}-updates main contrib non-free non-free-firmware\n\
             \n\
             # Security\n\
             deb http://security.debian.org/debian-security {version}-security main contrib non-free non-free-firmware\n",
            mirror = DEBIAN_MIRROR,
        );

        if dry_run {
            tracing::info!("Would write /etc/apt/sources.list inside the chroot");
            return Ok(());
        }

        let write = self
            .chroot_exec(&descriptor.name, &["tee", "/etc/apt/sources.list"])
            .with_stdin(sources_list);
        run_checked(&self.runner, write).await?;
        run_checked(
            &self.runner,
            self.chroot_exec(&descriptor.name, &["apt", "update"]),
        )
        .await
        .map(drop)
    }

    async fn enable_i386(&self, name: &str, dry_run: bool) -> Result<(), ProcessError> {
        if dry_run {
            tracing::info!("Would run: dpkg --add-architecture i386");
            return Ok(());
        }

        run_checked(
            &self.runner,
            self.chroot_exec(name, &["dpkg", "--add-architecture", "i386"]),
        )
        .await?;
        run_checked(&self.runner, self.chroot_exec(name, &["apt", "update"]))
            .await
            .map(drop)
    }

    async fn install_wine(&self, name: &str, dry_run: bool) -> Result<(), ProcessError> {
        if dry_run {
            tracing::info!("Would install: wine wine32 wine64 wine-binfmt fonts-wine");
            return Ok(());
        }

        let spec = self
            .chroot_exec(
                name,
                &[
                    "apt",
                    "install",
                    "-y",
                    "--install-recommends",
                    "wine",
                    "wine32",
                    "wine64",
                    "wine-binfmt",
                    "fonts-wine",
                ],
            )
            .with_timeout(SETUP_STEP_TIMEOUT);
        run_checked(&self.runner, spec).await.map(drop)
    }

    async fn verify_installation(&self, name: &str) -> Result<(), ProcessError> {
        let enter = self
            .chroot_exec(name, &["echo", "test"])
            .with_timeout(VERIFY_ENTER_TIMEOUT);
        run_checked(&self.runner, enter).await?;

        let wine = self
            .chroot_exec(name, &["wine", "--version"])
            .with_timeout(VERIFY_WINE_TIMEOUT);
        let out = run_checked(&self.runner, wine).await?;
        tracing::info!("Wine version: {}", out.stdout.trim());
        Ok(())
    }
}

fn step_failed(step: &'static str, source: ProcessError) -> BootstrapError {
    BootstrapError::StepFailed { step, source }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "root".to_string())
}
