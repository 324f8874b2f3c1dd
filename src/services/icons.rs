//! Icon extraction from Windows executables via wrestool and icotool.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use walkdir::WalkDir;

use crate::paths::slugify;
use crate::services::process::{run_checked, CommandRunner, CommandSpec, ProcessError};

/// Default icon name for Wine applications when extraction fails.
pub fn wine_icon() -> &'static str {
    "wine"
}

/// Two-stage icon pipeline: `wrestool` pulls the icon resource group out of
/// the `.exe`, `icotool` expands it to PNGs, and the largest PNG is copied to
/// the icon directory. Every failure degrades to "no icon".
pub struct IconExtractor<R> {
    runner: R,
    work_dir: Utf8PathBuf,
}

impl<R: CommandRunner> IconExtractor<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            work_dir: Utf8PathBuf::from("/tmp"),
        }
    }

    /// Relocate scratch files (tests).
    pub fn with_work_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Extract the icon of `exe_path` into `<icon_dir>/<icon_name>.png`.
    ///
    /// Returns the final PNG path, or `None` when any stage fails (missing
    /// tool, non-zero exit, no output). Nothing is written to `icon_dir`
    /// in the failure case. Temporary artifacts are cleaned up best-effort.
    pub async fn extract(
        &self,
        exe_path: &Utf8Path,
        icon_dir: &Utf8Path,
        icon_name: &str,
    ) -> Option<Utf8PathBuf> {
        let tmp_ico = self.work_dir.join(format!("{icon_name}.ico"));
        let tmp_png_dir = self.work_dir.join("wine-chroot-icons");

        tracing::debug!("Extracting icon from {}", exe_path);

        // Stage 1: .exe -> .ico. Resource type 14 is the icon group; sudo
        // because the chroot's Wine tree is root-owned.
        let wrestool = CommandSpec::new(
            "sudo",
            vec![
                "wrestool".to_string(),
                "-x".to_string(),
                "-t14".to_string(),
                exe_path.to_string(),
                "-o".to_string(),
                tmp_ico.to_string(),
            ],
        );
        if let Err(e) = run_checked(&self.runner, wrestool).await {
            warn_stage("wrestool", &e);
            return None;
        }
        if !tmp_ico.as_std_path().exists() {
            tracing::warn!("wrestool did not produce an .ico file");
            return None;
        }

        // Stage 2: .ico -> one .png per embedded size.
        if let Err(e) = fs::create_dir_all(&tmp_png_dir) {
            tracing::warn!("Cannot create temporary icon directory: {e}");
            self.cleanup(&tmp_ico, &tmp_png_dir);
            return None;
        }
        let icotool = CommandSpec::new(
            "icotool",
            vec![
                "-x".to_string(),
                tmp_ico.to_string(),
                "-o".to_string(),
                tmp_png_dir.to_string(),
            ],
        );
        if let Err(e) = run_checked(&self.runner, icotool).await {
            warn_stage("icotool", &e);
            self.cleanup(&tmp_ico, &tmp_png_dir);
            return None;
        }

        // icotool names outputs <stem>_<n>_<w>x<h>x<depth>.png, so the
        // lexicographically last file approximates the largest size. This is
        // a naming-convention heuristic, not a real dimension comparison.
        let mut pngs = list_pngs(&tmp_png_dir);
        pngs.sort();
        let Some(chosen) = pngs.last() else {
            tracing::warn!("No .png files were extracted");
            self.cleanup(&tmp_ico, &tmp_png_dir);
            return None;
        };

        let final_icon = icon_dir.join(format!("{icon_name}.png"));
        let copied = fs::create_dir_all(icon_dir)
            .and_then(|_| fs::copy(chosen, &final_icon))
            .map(drop);
        self.cleanup(&tmp_ico, &tmp_png_dir);

        match copied {
            Ok(()) => {
                tracing::info!("Icon extracted to {}", final_icon);
                Some(final_icon)
            }
            Err(e) => {
                tracing::warn!("Failed to store extracted icon: {e}");
                None
            }
        }
    }

    fn cleanup(&self, tmp_ico: &Utf8Path, tmp_png_dir: &Utf8Path) {
        let _ = fs::remove_file(tmp_ico);
        let _ = fs::remove_dir_all(tmp_png_dir);
    }
}

fn warn_stage(tool: &str, e: &ProcessError) {
    match e {
        ProcessError::NotFound(_) => {
            tracing::warn!("{tool} not found, icon extraction disabled (install with: sudo apt install icoutils)");
        }
        _ => tracing::warn!("{tool} failed: {e}"),
    }
}

fn list_pngs(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let Ok(entries) = dir.read_dir_utf8() else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|e| e.into_path())
        .filter(|p| p.extension() == Some("png"))
        .collect()
}

/// Search the usual icon locations for a theme icon matching the app name.
/// Fallback for when extraction is disabled or fails.
pub fn find_system_icon(app_name: &str) -> Option<String> {
    let mut bases = vec![
        Utf8PathBuf::from("/usr/share/icons/hicolor"),
        Utf8PathBuf::from("/usr/share/pixmaps"),
    ];
    if let Some(home) = dirs::home_dir().and_then(|p| Utf8PathBuf::from_path_buf(p).ok()) {
        bases.push(home.join(".local/share/icons"));
    }

    let search_name = slugify(app_name);
    if search_name.is_empty() {
        return None;
    }

    for base in bases {
        if !base.as_std_path().exists() {
            continue;
        }
        for entry in WalkDir::new(&base).into_iter().flatten() {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem == search_name && (ext == "png" || ext == "svg") {
                return Some(path.display().to_string());
            }
        }
    }

    None
}
