//! Desktop-menu integration: `.desktop` launcher files for Wine applications.

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use walkdir::WalkDir;

use crate::models::Config;
use crate::paths::{linux_path_to_windows, slugify, validate_exe_path};
use crate::services::icons::{IconExtractor, wine_icon};
use crate::services::process::{CommandRunner, CommandSpec};

/// Executable names that are not applications worth a menu entry.
const SKIP_PATTERNS: [&str; 7] = [
    "unins", "uninst", "uninstall", "update", "updater", "setup", "install",
];

/// One existing Wine launcher in the applications directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Launcher {
    pub name: String,
    pub path: Utf8PathBuf,
}

/// One `.exe` discovered under the chroot's Program Files trees.
#[derive(Debug, Clone)]
pub struct WineApp {
    pub name: String,
    pub path: Utf8PathBuf,
    pub win_path: String,
    pub has_launcher: bool,
}

/// Creates, lists and removes `.desktop` files for the configured chroot.
pub struct DesktopManager<R> {
    config: Config,
    runner: R,
}

impl<R: CommandRunner> DesktopManager<R> {
    pub fn new(config: Config, runner: R) -> Self {
        Self { config, runner }
    }

    /// Create a launcher for `exe_path` named `app_name`.
    ///
    /// The filename is derived from the app name unless `custom_filename` is
    /// given. Icon extraction failures fall back to the generic `wine` icon.
    /// Returns the path of the written `.desktop` file.
    pub async fn create_launcher(
        &self,
        exe_path: &Utf8Path,
        app_name: &str,
        extract_icon: bool,
        custom_filename: Option<&str>,
    ) -> Result<Utf8PathBuf> {
        if !validate_exe_path(exe_path, Some(self.config.chroot.path.as_path())) {
            bail!("executable not found: {exe_path}");
        }

        let filename = match custom_filename {
            Some(name) if name.ends_with(".desktop") => name.to_string(),
            Some(name) => format!("{name}.desktop"),
            None => format!("{}.desktop", slugify(app_name)),
        };

        let desktop_dir = &self.config.desktop.applications_dir;
        fs::create_dir_all(desktop_dir)
            .with_context(|| format!("Failed to create {desktop_dir}"))?;
        let desktop_file = desktop_dir.join(filename);

        let win_path = linux_path_to_windows(exe_path.as_str());

        let icon = if extract_icon {
            let extractor = IconExtractor::new(&self.runner);
            extractor
                .extract(exe_path, &self.config.desktop.icon_dir, &slugify(app_name))
                .await
                .map(|p| p.to_string())
                .unwrap_or_else(|| wine_icon().to_string())
        } else {
            wine_icon().to_string()
        };

        let content = self.launcher_contents(app_name, &win_path, &icon);
        fs::write(&desktop_file, content)
            .with_context(|| format!("Failed to write {desktop_file}"))?;

        tracing::info!("Desktop launcher created: {}", desktop_file);
        self.update_desktop_database().await;

        Ok(desktop_file)
    }

    /// Remove a launcher. Returns whether a file was actually deleted.
    pub async fn remove_launcher(&self, desktop_file: &Utf8Path) -> bool {
        if !desktop_file.as_std_path().exists() {
            tracing::warn!("Launcher not found: {}", desktop_file);
            return false;
        }
        match fs::remove_file(desktop_file) {
            Ok(()) => {
                tracing::info!("Removed launcher: {}", desktop_file);
                self.update_desktop_database().await;
                true
            }
            Err(e) => {
                tracing::error!("Failed to remove launcher {}: {e}", desktop_file);
                false
            }
        }
    }

    /// All Wine/schroot launchers in the applications directory, sorted.
    ///
    /// A file qualifies when it mentions both `schroot` and `wine`; the
    /// display name is the first `Name=` line.
    pub fn list_desktop_files(&self) -> Vec<Launcher> {
        let desktop_dir = &self.config.desktop.applications_dir;
        let Ok(entries) = desktop_dir.read_dir_utf8() else {
            return Vec::new();
        };

        let mut launchers = Vec::new();
        for entry in entries.flatten() {
            let path = entry.into_path();
            if path.extension() != Some("desktop") {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            if !content.contains("schroot") || !content.to_lowercase().contains("wine") {
                continue;
            }
            if let Some(name) = content
                .lines()
                .find_map(|line| line.strip_prefix("Name="))
            {
                launchers.push(Launcher {
                    name: name.trim().to_string(),
                    path,
                });
            }
        }

        launchers.sort();
        launchers
    }

    /// Scan the chroot's `Program Files` trees for installed applications.
    ///
    /// Installer/updater/uninstaller executables are skipped; each hit is
    /// cross-referenced against existing launchers by path or filename.
    pub fn list_wine_applications(&self) -> Vec<WineApp> {
        let drive_c = self.config.drive_c_root();
        let search_dirs = [
            drive_c.join("Program Files"),
            drive_c.join("Program Files (x86)"),
        ];

        let launcher_contents: Vec<String> = self
            .list_desktop_files()
            .iter()
            .filter_map(|l| fs::read_to_string(&l.path).ok())
            .collect();

        let mut applications = Vec::new();
        for search_dir in search_dirs {
            if !search_dir.as_std_path().exists() {
                continue;
            }
            for entry in WalkDir::new(&search_dir).into_iter().flatten() {
                let Some(path) = Utf8Path::from_path(entry.path()) else {
                    continue;
                };
                if !entry.file_type().is_file() || path.extension() != Some("exe") {
                    continue;
                }
                let exe_name = path.file_name().unwrap_or_default().to_lowercase();
                if SKIP_PATTERNS.iter().any(|skip| exe_name.contains(skip)) {
                    continue;
                }

                let has_launcher = launcher_contents.iter().any(|content| {
                    content.contains(path.as_str())
                        || path.file_name().is_some_and(|f| content.contains(f))
                });

                applications.push(WineApp {
                    name: path.file_stem().unwrap_or_default().to_string(),
                    path: path.to_path_buf(),
                    win_path: linux_path_to_windows(path.as_str()),
                    has_launcher,
                });
            }
        }

        applications
    }

    fn launcher_contents(&self, app_name: &str, win_path: &str, icon: &str) -> String {
        let chroot_name = &self.config.chroot.name;
        let wm_class = win_path.rsplit(['\\', '/']).next().unwrap_or(win_path);
        format!(
            "[Desktop Entry]\n\
             Name={app_name}\n\
             Comment=Run {app_name} inside the {chroot_name} chroot\n\
             Exec={privilege} schroot -c {chroot_name} -- wine \"{win_path}\"\n\
             Type=Application\n\
             Categories={categories};\n\
             StartupNotify=true\n\
             Terminal=false\n\
             StartupWMClass={wm_class}\n\
             Icon={icon}\n",
            privilege = self.config.privilege_tool(),
            categories = self.config.desktop.categories.join(";"),
        )
    }

    /// Refresh the desktop-entry index; a missing tool is not an error.
    async fn update_desktop_database(&self) {
        let spec = CommandSpec::new(
            "update-desktop-database",
            vec![self.config.desktop.applications_dir.to_string()],
        );
        match self.runner.run(spec).await {
            Ok(_) => tracing::debug!("Desktop database updated"),
            Err(e) => tracing::debug!("update-desktop-database skipped: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::process::SystemRunner;

    fn manager() -> DesktopManager<SystemRunner> {
        DesktopManager::new(Config::default(), SystemRunner::new())
    }

    #[test]
    fn test_launcher_contents_exec_line() {
        let content =
            manager().launcher_contents("My App", r"C:\Program Files\App\App.exe", "wine");
        assert!(content.contains(
            r#"Exec=sudo schroot -c debian-amd64 -- wine "C:\Program Files\App\App.exe""#
        ));
        assert!(content.contains("Name=My App\n"));
        assert!(content.contains("Categories=Wine;WindowsApps;\n"));
        assert!(content.contains("StartupWMClass=App.exe\n"));
        assert!(content.contains("Icon=wine\n"));
    }

    #[test]
    fn test_launcher_contents_fixed_fields() {
        let content = manager().launcher_contents("X", r"C:\x.exe", "wine");
        assert!(content.starts_with("[Desktop Entry]\n"));
        assert!(content.contains("Type=Application\n"));
        assert!(content.contains("StartupNotify=true\n"));
        assert!(content.contains("Terminal=false\n"));
    }
}
