use std::path::{Path, PathBuf};

/// Name of the client launcher executable.
pub const CLIENT_EXE: &str = "RiotClientServices.exe";

/// Game executable, relative to the game's patchline directory.
pub const GAME_EXE: &str = "VALORANT.exe";

/// Provides access to the Riot install layout under one install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiotPaths {
    root: PathBuf,
}

impl RiotPaths {
    /// Creates a new `RiotPaths` rooted at `root` (e.g. `C:/Riot Games`).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the install root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the Riot Client directory.
    pub fn client_dir(&self) -> PathBuf {
        self.root.join("Riot Client")
    }

    /// Returns the client launcher executable.
    pub fn client_exe(&self) -> PathBuf {
        self.client_dir().join(CLIENT_EXE)
    }

    /// Returns the `live` patchline directory of the game.
    pub fn game_dir(&self) -> PathBuf {
        self.root.join("VALORANT").join("live")
    }

    /// Returns the game executable.
    pub fn game_exe(&self) -> PathBuf {
        self.game_dir().join(GAME_EXE)
    }

    /// Returns the live asset directory that receives localization paks.
    pub fn paks_dir(&self) -> PathBuf {
        self.game_dir()
            .join("ShooterGame")
            .join("Content")
            .join("Paks")
    }
}

/// Default install root for the platform.
pub fn default_install_root() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        PathBuf::from(r"C:\Riot Games")
    }

    #[cfg(not(target_os = "windows"))]
    {
        home_dir().join("Riot Games")
    }
}

/// Default directory the Riot Client writes its rotating logs to.
pub fn default_log_dir() -> PathBuf {
    local_app_data()
        .join("Riot Games")
        .join("Riot Client")
        .join("logs")
        .join("riot client logs")
}

/// Per-user local application data directory.
///
/// `%LOCALAPPDATA%` on Windows, `~/.local/share` elsewhere.
pub fn local_app_data() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Users\Default\AppData\Local"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        home_dir().join(".local").join("share")
    }
}

#[cfg(not(target_os = "windows"))]
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}
