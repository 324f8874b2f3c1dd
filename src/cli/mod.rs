//! Command-line interface: argument parsing and command dispatch.

use std::io::{self, BufRead, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::config::ConfigManager;
use crate::exit_codes;
use crate::models::Config;
use crate::paths::validate_exe_path;
use crate::services::bootstrap::{ChrootBootstrapper, InitOptions};
use crate::services::deps::DependencyChecker;
use crate::services::desktop::DesktopManager;
use crate::services::process::SystemRunner;
use crate::services::runner::WineRunner;
use crate::VERSION;

/// Manage Windows applications on ARM64 Linux using Wine in a chroot.
#[derive(Debug, Parser)]
#[command(name = "wine-chroot", version, about)]
pub struct Cli {
    /// Path to wine-chroot.toml configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Initialize a new chroot environment
    Init(InitArgs),
    /// Run a Windows application
    Run(RunArgs),
    /// Create a .desktop launcher
    Desktop(DesktopArgs),
    /// List applications or launchers
    List(ListArgs),
    /// Manage configuration
    Config(ConfigArgs),
    /// Show version information
    Version,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Chroot name (default: from config)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Chroot installation path (default: from config)
    #[arg(short, long)]
    pub path: Option<Utf8PathBuf>,

    /// Debian version to install
    #[arg(long)]
    pub debian_version: Option<String>,

    /// Don't install Wine automatically
    #[arg(long)]
    pub skip_wine: bool,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to .exe file (Windows or Linux format)
    pub exe: String,

    /// Arguments to pass to the application
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,

    /// Wait for application to exit
    #[arg(short, long)]
    pub wait: bool,

    /// Show terminal output
    #[arg(short, long)]
    pub terminal: bool,
}

#[derive(Debug, Args)]
pub struct DesktopArgs {
    /// Path to .exe file
    #[arg(short, long)]
    pub exe: Utf8PathBuf,

    /// Application name for the menu
    #[arg(short, long)]
    pub name: String,

    /// Extract icon from .exe
    #[arg(short, long)]
    pub icon: bool,

    /// Custom .desktop launcher filename
    #[arg(short, long)]
    pub desktop: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// List only .desktop launchers
    #[arg(short, long)]
    pub launchers: bool,
}

#[derive(Debug, Args)]
#[command(group = ArgGroup::new("mode").required(true))]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(short, long, group = "mode")]
    pub show: bool,

    /// Create example configuration file
    #[arg(short, long, group = "mode")]
    pub init: bool,

    /// Output path for --init (default: ~/.config/wine-chroot.toml)
    #[arg(short, long, requires = "init")]
    pub output: Option<Utf8PathBuf>,
}

/// Load configuration and dispatch to the requested command.
///
/// Returns the process exit code; errors are reported here so `main` only
/// has to translate the code.
pub async fn execute(cli: Cli) -> i32 {
    if cli.verbose {
        report_missing_dependencies();
    }

    let manager = ConfigManager::load(cli.config.as_deref());

    match cli.command {
        Command::Init(args) => cmd_init(args, manager.into_config()).await,
        Command::Run(args) => cmd_run(args, manager.into_config()).await,
        Command::Desktop(args) => cmd_desktop(args, manager.into_config()).await,
        Command::List(args) => cmd_list(args, manager.into_config()),
        Command::Config(args) => cmd_config(&args, &manager),
        Command::Version => cmd_version(manager.into_config()).await,
    }
}

fn report_missing_dependencies() {
    let (all_ok, missing) = DependencyChecker::new().check_all();
    if !all_ok {
        println!("Some dependencies are missing:");
        for tool in &missing {
            println!("  - {tool}");
        }
        println!();
        println!("Install with:");
        println!("  sudo apt install schroot debootstrap qemu-user-static icoutils");
        println!();
    }
}

async fn cmd_init(args: InitArgs, config: Config) -> i32 {
    let opts = InitOptions {
        name: args.name,
        path: args.path,
        debian_version: args.debian_version,
        skip_wine: args.skip_wine,
        dry_run: args.dry_run,
    };

    if !opts.dry_run {
        let path = opts.path.as_deref().unwrap_or(&config.chroot.path);
        println!();
        println!("Warning: this will create a new chroot environment");
        println!("Installation path: {path}");
        println!();
        println!("This operation will:");
        println!("  - Download ~200-500 MB of Debian packages");
        println!("  - Require root access (sudo)");
        println!("  - Take 10-30 minutes depending on your internet connection");
        println!();
        if !confirm("Continue? [y/N]: ") {
            println!();
            println!("Cancelled by user");
            return exit_codes::GENERAL_ERROR;
        }
    }

    let bootstrapper = ChrootBootstrapper::new(config, SystemRunner::new());
    match bootstrapper.initialize(&opts).await {
        Ok(descriptor) => {
            if !opts.dry_run {
                println!();
                println!("Chroot '{}' is ready.", descriptor.name);
                println!("Try: wine-chroot run <path-to-exe>");
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            tracing::error!("Initialization failed: {e:#}");
            exit_codes::GENERAL_ERROR
        }
    }
}

async fn cmd_run(args: RunArgs, config: Config) -> i32 {
    // Host-style paths are checked up front; Windows-style paths are handed
    // to Wine as-is and resolved inside the chroot.
    if args.exe.contains('/') {
        let exe = Utf8Path::new(&args.exe);
        if !validate_exe_path(exe, Some(config.chroot.path.as_path())) {
            return exit_codes::GENERAL_ERROR;
        }
    }

    let chroot_name = config.chroot.name.clone();
    let runner = WineRunner::new(config, SystemRunner::new());

    if !runner.check_wine_installation().await {
        eprintln!("Error: Wine is not installed in the chroot");
        eprintln!("Run: wine-chroot init --name {chroot_name}");
        return exit_codes::GENERAL_ERROR;
    }

    match runner.run(&args.exe, &args.args, args.wait, args.terminal).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Failed to run application: {e}");
            exit_codes::GENERAL_ERROR
        }
    }
}

async fn cmd_desktop(args: DesktopArgs, config: Config) -> i32 {
    let manager = DesktopManager::new(config, SystemRunner::new());
    match manager
        .create_launcher(&args.exe, &args.name, args.icon, args.desktop.as_deref())
        .await
    {
        Ok(path) => {
            println!("Created launcher: {path}");
            exit_codes::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to create launcher: {e:#}");
            exit_codes::GENERAL_ERROR
        }
    }
}

fn cmd_list(args: ListArgs, config: Config) -> i32 {
    let manager = DesktopManager::new(config, SystemRunner::new());

    if args.launchers {
        let launchers = manager.list_desktop_files();
        if launchers.is_empty() {
            println!("No Wine launchers found");
            return exit_codes::SUCCESS;
        }

        println!("{:<30} {}", "Application", "Desktop File");
        for launcher in &launchers {
            println!("{:<30} {}", launcher.name, launcher.path);
        }
    } else {
        println!("Scanning chroot for Windows applications...");
        let applications = manager.list_wine_applications();
        if applications.is_empty() {
            println!("No Windows applications found in chroot");
            return exit_codes::SUCCESS;
        }

        println!("{:<30} {:<8} {}", "Name", "Launcher", "Path");
        for app in &applications {
            let status = if app.has_launcher { "yes" } else { "no" };
            println!("{:<30} {:<8} {}", app.name, status, app.path);
        }

        let with_launchers = applications.iter().filter(|a| a.has_launcher).count();
        println!();
        println!(
            "Found {} applications, {} with launchers",
            applications.len(),
            with_launchers
        );
    }

    exit_codes::SUCCESS
}

fn cmd_config(args: &ConfigArgs, manager: &ConfigManager) -> i32 {
    if args.show {
        println!("Current configuration:");
        println!();
        match toml::Value::try_from(manager.config()) {
            Ok(value) => print_flattened(&value, ""),
            Err(e) => {
                tracing::error!("Failed to render configuration: {e}");
                return exit_codes::GENERAL_ERROR;
            }
        }
        println!();
        match manager.config_path() {
            Some(path) if path.as_std_path().exists() => println!("Loaded from: {path}"),
            _ => println!("Using default configuration"),
        }
        return exit_codes::SUCCESS;
    }

    // --init
    let output = args
        .output
        .clone()
        .or_else(|| ConfigManager::default_config_paths().into_iter().next());
    let Some(output) = output else {
        tracing::error!("No output path available for the example configuration");
        return exit_codes::GENERAL_ERROR;
    };
    match ConfigManager::write_example_config(&output) {
        Ok(()) => {
            println!("Example configuration written to {output}");
            exit_codes::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            exit_codes::GENERAL_ERROR
        }
    }
}

async fn cmd_version(config: Config) -> i32 {
    println!("wine-chroot version {VERSION}");

    let runner = WineRunner::new(config, SystemRunner::new());
    if let Some(wine_version) = runner.get_wine_version().await {
        println!("Wine in chroot: {wine_version}");
    }

    exit_codes::SUCCESS
}

/// Dotted key=value dump of a TOML tree, tables first-level only in practice.
fn print_flattened(value: &toml::Value, prefix: &str) {
    match value {
        toml::Value::Table(table) => {
            for (key, inner) in table {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                print_flattened(inner, &full_key);
            }
        }
        toml::Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render_scalar).collect();
            println!("{prefix} = [{}]", rendered.join(", "));
        }
        other => println!("{prefix} = {}", render_scalar(other)),
    }
}

fn render_scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}
