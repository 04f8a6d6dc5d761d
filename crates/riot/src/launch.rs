//! Client and game launch.
//!
//! Both launches go through the client launcher executable; the game is
//! selected with product/patchline flags. Spawned processes are detached and
//! never supervised.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::RiotError;

/// Flags that make the client launcher start the game on the live patchline.
pub const GAME_LAUNCH_ARGS: [&str; 2] = ["--launch-product=valorant", "--launch-patchline=live"];

/// Starts the external client and game.
///
/// A successful return only means the spawn call itself succeeded.
pub trait Launcher {
    /// Starts the client with no arguments.
    fn start_client(&self) -> Result<(), RiotError>;

    /// Starts the game through the client.
    fn start_game(&self) -> Result<(), RiotError>;
}

/// Launches real processes through `RiotClientServices.exe`.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    client_exe: PathBuf,
}

impl ProcessLauncher {
    pub fn new(client_exe: impl Into<PathBuf>) -> Self {
        Self {
            client_exe: client_exe.into(),
        }
    }

    /// Returns the launcher executable path.
    pub fn client_exe(&self) -> &Path {
        &self.client_exe
    }

    fn spawn(&self, what: &'static str, args: &[&str]) -> Result<(), RiotError> {
        if !self.client_exe.is_file() {
            return Err(RiotError::ClientNotFound(self.client_exe.clone()));
        }

        Command::new(&self.client_exe)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| RiotError::Spawn { what, source })?;

        tracing::info!(exe = %self.client_exe.display(), ?args, "started {what}");
        Ok(())
    }
}

impl Launcher for ProcessLauncher {
    fn start_client(&self) -> Result<(), RiotError> {
        self.spawn("Riot Client", &[])
    }

    fn start_game(&self) -> Result<(), RiotError> {
        self.spawn("VALORANT", &GAME_LAUNCH_ARGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_client_is_not_found() {
        let launcher = ProcessLauncher::new("/definitely/not/RiotClientServices.exe");
        let err = launcher.start_client().unwrap_err();
        assert!(matches!(err, RiotError::ClientNotFound(_)));
        assert!(err.to_string().contains("RiotClientServices.exe"));
    }

    #[test]
    fn missing_client_blocks_game_launch() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = ProcessLauncher::new(tmp.path().join("RiotClientServices.exe"));
        assert!(matches!(
            launcher.start_game(),
            Err(RiotError::ClientNotFound(_))
        ));
    }

    #[test]
    fn directory_is_not_a_client() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = ProcessLauncher::new(tmp.path());
        assert!(launcher.start_client().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_client_is_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = tmp.path().join("RiotClientServices.exe");
        std::fs::write(&exe, "not a program").unwrap();

        let launcher = ProcessLauncher::new(&exe);
        let err = launcher.start_client().unwrap_err();
        assert!(matches!(err, RiotError::Spawn { what: "Riot Client", .. }));
    }

    #[test]
    fn game_args_select_live_valorant() {
        assert_eq!(
            GAME_LAUNCH_ARGS,
            ["--launch-product=valorant", "--launch-patchline=live"]
        );
    }
}
