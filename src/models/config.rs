use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Complete wine-chroot configuration, loaded from `wine-chroot.toml`.
///
/// Every field has a documented default, so a missing or partial file always
/// yields a usable configuration. The sections mirror the on-disk TOML tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chroot: ChrootSection,
    pub wine: WineSection,
    pub desktop: DesktopSection,
    pub execution: ExecutionSection,
}

/// `[chroot]` - identity of the managed schroot environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChrootSection {
    /// Schroot configuration name.
    pub name: String,

    /// Filesystem path where the chroot tree lives.
    pub path: Utf8PathBuf,

    /// Target Debian architecture (the foreign one, e.g. `amd64` on ARM64).
    pub architecture: String,

    /// Debian release to bootstrap.
    pub debian_version: String,
}

/// `[wine]` - Wine settings inside the chroot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WineSection {
    /// Wine prefix path inside the chroot (chroot-relative, e.g. `/root/.wine`).
    pub prefix: String,

    /// Enable the i386 foreign architecture for 32-bit Wine.
    pub enable_i386: bool,
}

/// `[desktop]` - desktop-menu integration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopSection {
    /// Where extracted icons are stored.
    pub icon_dir: Utf8PathBuf,

    /// Where `.desktop` launchers are written.
    pub applications_dir: Utf8PathBuf,

    /// Category tags for generated launchers.
    pub categories: Vec<String>,
}

/// `[execution]` - how applications are launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    /// Use pkexec instead of sudo for privilege escalation.
    pub use_pkexec: bool,

    /// Preserve the caller environment when entering the chroot.
    pub preserve_environment: bool,

    /// Forward DISPLAY/XAUTHORITY and grant local X11 access before launch.
    pub x11_forwarding: bool,
}

impl Default for ChrootSection {
    fn default() -> Self {
        Self {
            name: "debian-amd64".to_string(),
            path: Utf8PathBuf::from("/srv/debian-amd64"),
            architecture: "amd64".to_string(),
            debian_version: "trixie".to_string(),
        }
    }
}

impl Default for WineSection {
    fn default() -> Self {
        Self {
            prefix: "/root/.wine".to_string(),
            enable_i386: true,
        }
    }
}

impl Default for DesktopSection {
    fn default() -> Self {
        Self {
            icon_dir: home_dir().join(".local/share/icons"),
            applications_dir: home_dir().join(".local/share/applications"),
            categories: vec!["Wine".to_string(), "WindowsApps".to_string()],
        }
    }
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            // sudo is more reliable than pkexec for GUI applications
            use_pkexec: false,
            preserve_environment: true,
            x11_forwarding: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chroot: ChrootSection::default(),
            wine: WineSection::default(),
            desktop: DesktopSection::default(),
            execution: ExecutionSection::default(),
        }
    }
}

impl Config {
    /// Privilege escalation command selected by `[execution]`.
    pub fn privilege_tool(&self) -> &'static str {
        if self.execution.use_pkexec {
            "pkexec"
        } else {
            "sudo"
        }
    }

    /// Host path of the Wine `drive_c` tree inside the chroot.
    ///
    /// The configured prefix is chroot-relative (`/root/.wine`), so it is
    /// re-rooted under the chroot path.
    pub fn drive_c_root(&self) -> Utf8PathBuf {
        self.chroot
            .path
            .join(self.wine.prefix.trim_start_matches('/'))
            .join("drive_c")
    }
}

fn home_dir() -> Utf8PathBuf {
    dirs::home_dir()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}
