//! Services: the operational core of wine-chroot.
//!
//! Everything the tool does is a sequence of external commands glued together
//! with path translation and configuration. Each service is framework-free
//! and takes a [`process::CommandRunner`] so sequencing logic can be tested
//! without touching the host:
//!
//! - [`process`]: the command-execution seam ([`process::SystemRunner`] in
//!   production, a recording fake in tests) with a closed
//!   [`process::ProcessError`] taxonomy.
//! - [`deps`]: presence probing for the required external tools.
//! - [`bootstrap`]: the ten-step chroot initialization sequencer with
//!   hard/soft gating and dry-run support.
//! - [`runner`]: Wine invocation through the privilege wrapper, foreground
//!   or detached.
//! - [`desktop`]: `.desktop` launcher generation and chroot application
//!   discovery.
//! - [`icons`]: the wrestool/icotool extraction pipeline.

pub mod bootstrap;
pub mod deps;
pub mod desktop;
pub mod icons;
pub mod process;
pub mod runner;

pub use bootstrap::{BootstrapError, ChrootBootstrapper, ChrootDescriptor, InitOptions};
pub use deps::DependencyChecker;
pub use desktop::{DesktopManager, Launcher, WineApp};
pub use icons::IconExtractor;
pub use process::{CommandOutput, CommandRunner, CommandSpec, ProcessError, SystemRunner};
pub use runner::WineRunner;
