//! wine-chroot - CLI entry point.
//!
//! Parses arguments, initializes logging, and runs the selected command on a
//! current-thread tokio runtime. Ctrl+C aborts the command and exits with
//! 130, matching shell convention for SIGINT.

use std::process::ExitCode;

use clap::Parser;

use wine_chroot::cli::{self, Cli};
use wine_chroot::{exit_codes, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the guard alive so the file writer flushes on exit. Logging
    // failures (read-only home, etc.) are not fatal for a CLI tool.
    let _guard = match logging::setup_logging(cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging setup failed: {e:#}");
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create async runtime: {e}");
            return ExitCode::from(exit_codes::GENERAL_ERROR as u8);
        }
    };

    let code = runtime.block_on(async {
        tokio::select! {
            code = cli::execute(cli) => code,
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                eprintln!("Interrupted");
                exit_codes::USER_INTERRUPTED
            }
        }
    });

    ExitCode::from(code.clamp(0, 255) as u8)
}
