//! Path translation between the Wine drive emulation and the host filesystem,
//! plus small filename/system helpers shared across services.

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::sync::LazyLock;

/// Matches a Windows drive-letter prefix (`C:\`, `d:\`, ...).
static WIN_DRIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:\\").expect("Invalid drive prefix regex"));

/// Convert a host path to Windows format for Wine.
///
/// Inputs already carrying a drive-letter prefix pass through unchanged. Paths
/// containing a `drive_c/` segment are rewritten onto `C:\` with backslash
/// separators. Anything else is returned as-is, since Wine also accepts raw
/// Unix paths.
///
/// ```
/// use wine_chroot::paths::linux_path_to_windows;
///
/// assert_eq!(
///     linux_path_to_windows("/srv/debian-amd64/root/.wine/drive_c/Program Files/app.exe"),
///     r"C:\Program Files\app.exe"
/// );
/// assert_eq!(linux_path_to_windows(r"C:\Windows\System32"), r"C:\Windows\System32");
/// ```
pub fn linux_path_to_windows(path: &str) -> String {
    if WIN_DRIVE.is_match(path) {
        return path.to_string();
    }

    if let Some((_, after)) = path.split_once("drive_c/") {
        return format!("C:\\{}", after.replace('/', "\\"));
    }

    path.to_string()
}

/// Convert a Windows path back to its host location inside the chroot.
///
/// The drive letter is dropped and the remainder is rejoined under
/// `<chroot_path>/<wine_prefix>/drive_c/`, with the chroot-relative prefix
/// (e.g. `/root/.wine`) re-rooted below the chroot path.
pub fn windows_path_to_linux(
    win_path: &str,
    chroot_path: &Utf8Path,
    wine_prefix: &str,
) -> Utf8PathBuf {
    let rest = if WIN_DRIVE.is_match(win_path) {
        &win_path[3..]
    } else {
        win_path
    };

    chroot_path
        .join(wine_prefix.trim_start_matches('/'))
        .join("drive_c")
        .join(rest.replace('\\', "/"))
}

/// Reduce arbitrary text to a filesystem-safe slug.
///
/// Lowercases, collapses every run of non-alphanumeric characters to a single
/// hyphen and trims leading/trailing hyphens. Idempotent.
///
/// ```
/// use wine_chroot::paths::slugify;
///
/// assert_eq!(slugify("My Application (Wine)"), "my-application-wine");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Check whether a command is available on the executable search path.
pub fn check_command_exists(command: &str) -> bool {
    which::which(command).is_ok()
}

/// Validate that an `.exe` path exists and is a regular file.
///
/// Permission-denied degrades to a warning and counts as valid: execution
/// proceeds optimistically and fails later if the path really is wrong.
/// `chroot_path` is only used to print a host-perspective hint on failure.
pub fn validate_exe_path(exe_path: &Utf8Path, chroot_path: Option<&Utf8Path>) -> bool {
    match fs::metadata(exe_path) {
        Ok(meta) if meta.is_file() => true,
        Ok(_) => {
            tracing::error!("Path exists but is not a file: {}", exe_path);
            false
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::warn!(
                "Cannot verify that {} exists (permission denied), continuing anyway",
                exe_path
            );
            true
        }
        Err(_) => {
            tracing::error!("The .exe does not exist at {}", exe_path);
            if let Some(chroot) = chroot_path {
                tracing::info!(
                    "Make sure the path is from the host perspective, e.g. {}/root/.wine/drive_c/Program Files/...",
                    chroot
                );
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_c_path_converted() {
        assert_eq!(
            linux_path_to_windows("/srv/debian-amd64/root/.wine/drive_c/Program Files/App/App.exe"),
            r"C:\Program Files\App\App.exe"
        );
    }

    #[test]
    fn test_windows_path_is_identity() {
        assert_eq!(
            linux_path_to_windows(r"C:\Windows\notepad.exe"),
            r"C:\Windows\notepad.exe"
        );
        assert_eq!(linux_path_to_windows(r"d:\games"), r"d:\games");
    }

    #[test]
    fn test_plain_unix_path_is_identity() {
        assert_eq!(linux_path_to_windows("/usr/bin/true"), "/usr/bin/true");
    }

    #[test]
    fn test_windows_path_to_linux() {
        let linux = windows_path_to_linux(
            r"C:\Program Files\app.exe",
            Utf8Path::new("/srv/debian-amd64"),
            "/root/.wine",
        );
        assert_eq!(
            linux,
            Utf8PathBuf::from("/srv/debian-amd64/root/.wine/drive_c/Program Files/app.exe")
        );
    }

    #[test]
    fn test_round_trip() {
        let original = "/srv/debian-amd64/root/.wine/drive_c/Program Files/App/App.exe";
        let win = linux_path_to_windows(original);
        let back = windows_path_to_linux(&win, Utf8Path::new("/srv/debian-amd64"), "/root/.wine");
        assert_eq!(back, Utf8PathBuf::from(original));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My App!"), "my-app");
        assert_eq!(slugify("My Application (Wine)"), "my-application-wine");
        assert_eq!(slugify("  --Weird--  "), "weird");
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_idempotent() {
        for input in ["My App!", "already-a-slug", "Ünïcøde Näme", "a  b   c"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once);
        }
    }
}
