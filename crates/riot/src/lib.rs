//! Riot Client integration: install layout and process launch.
//!
//! ValText never supervises the client or the game. It only resolves where
//! they live and asks the OS to start them.

pub mod launch;
pub mod paths;

// Re-export primary types.
pub use launch::{GAME_LAUNCH_ARGS, Launcher, ProcessLauncher};
pub use paths::{RiotPaths, default_install_root, default_log_dir, local_app_data};

/// Errors for Riot Client operations.
#[derive(Debug, thiserror::Error)]
pub enum RiotError {
    #[error("Riot Client not found at {0}")]
    ClientNotFound(std::path::PathBuf),

    #[error("failed to start {what}: {source}")]
    Spawn {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}
