//! Host dependency probing.
//!
//! The tool delegates all real work to external programs; this module checks
//! up front that they are installed so failures surface as actionable install
//! hints instead of spawn errors halfway through a bootstrap.

use std::path::Path;

use crate::paths::check_command_exists;

/// The fixed registry of required external tools, with install hints.
pub const REQUIRED_TOOLS: [(&str, &str); 5] = [
    ("schroot", "Manage chroot sessions (package: schroot)"),
    ("debootstrap", "Create Debian base systems (package: debootstrap)"),
    (
        "qemu-user-static",
        "x86-64 emulation on ARM64 (package: qemu-user-static)",
    ),
    ("wrestool", "Extract icons from .exe files (package: icoutils)"),
    ("icotool", "Convert .ico to .png (package: icoutils)"),
];

/// Known filesystem locations for the qemu user-mode binary when it is not
/// on the search path (binfmt setups often install it outside $PATH).
const QEMU_STATIC_PATHS: [&str; 2] = [
    "/usr/bin/qemu-x86_64-static",
    "/usr/libexec/qemu-binfmt/x86_64-static",
];

/// Probes the host for required external executables.
///
/// The lookup is injectable so sequencing logic can be tested on machines
/// without debootstrap/schroot installed.
pub struct DependencyChecker {
    lookup: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl DependencyChecker {
    /// Checker backed by a real `$PATH` search.
    pub fn new() -> Self {
        Self {
            lookup: Box::new(check_command_exists),
        }
    }

    /// Checker with a custom presence predicate (tests).
    pub fn with_lookup(lookup: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn found(&self, command: &str) -> bool {
        // qemu ships under several names and sometimes outside $PATH.
        if command == "qemu-user-static" {
            return (self.lookup)("qemu-x86_64-static")
                || (self.lookup)("qemu-user-static")
                || QEMU_STATIC_PATHS.iter().any(|p| Path::new(p).exists());
        }
        (self.lookup)(command)
    }

    /// Check the full five-tool registry.
    ///
    /// Returns whether everything is present, plus exactly the missing names.
    pub fn check_all(&self) -> (bool, Vec<String>) {
        let mut missing = Vec::new();

        for (command, description) in REQUIRED_TOOLS {
            if self.found(command) {
                tracing::debug!("found {}: {}", command, description);
            } else {
                tracing::debug!("missing {}: {}", command, description);
                missing.push(command.to_string());
            }
        }

        (missing.is_empty(), missing)
    }

    /// Check only what chroot bootstrapping needs: the base-system and chroot
    /// tools, the emulation layer, and the configured privilege tool.
    pub fn check_bootstrap_tools(&self, privilege_tool: &str) -> (bool, Vec<String>) {
        let mut missing = Vec::new();

        for command in ["debootstrap", "schroot", "qemu-user-static"] {
            if !self.found(command) {
                missing.push(command.to_string());
            }
        }
        if !(self.lookup)(privilege_tool) {
            missing.push(privilege_tool.to_string());
        }

        (missing.is_empty(), missing)
    }
}

impl Default for DependencyChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_present() {
        let checker = DependencyChecker::with_lookup(|_| true);
        let (ok, missing) = checker.check_all();
        assert!(ok);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_reports_exactly_the_missing_names() {
        let checker = DependencyChecker::with_lookup(|cmd| cmd != "wrestool");
        let (ok, missing) = checker.check_all();
        assert!(!ok);
        assert_eq!(missing, vec!["wrestool".to_string()]);
    }

    #[test]
    fn test_qemu_alternate_name_satisfies() {
        // Only the -x86_64-static spelling exists; the registry entry still passes.
        let checker = DependencyChecker::with_lookup(|cmd| cmd == "qemu-x86_64-static");
        let (_, missing) = checker.check_all();
        assert!(!missing.contains(&"qemu-user-static".to_string()));
    }

    #[test]
    fn test_bootstrap_tools_include_privilege_tool() {
        let checker = DependencyChecker::with_lookup(|cmd| cmd != "pkexec");
        let (ok, missing) = checker.check_bootstrap_tools("pkexec");
        assert!(!ok);
        assert_eq!(missing, vec!["pkexec".to_string()]);
    }
}
