//! Localization asset files: the reference store kept outside the game and
//! the verified swaps that copy assets into the game's `Paks` directory.

mod staging;
mod swap;

pub use staging::{LanguageAsset, LanguageStore, StageError};
pub use swap::{LocalizationSwapper, SwapError, SwapFile, SwapReport, file_digest};

/// Default reference store directory name under local app data.
pub const DEFAULT_STORE_DIR: &str = "VALTEXT";

/// Resolves the default reference store path.
///
/// Returns `<local app data>/VALTEXT`.
pub fn default_store_path(local_app_data: &std::path::Path) -> std::path::PathBuf {
    local_app_data.join(DEFAULT_STORE_DIR)
}

/// Ensures a directory exists, creating it and its parents if necessary.
pub(crate) fn ensure_dir(path: &std::path::Path) -> Result<(), StageError> {
    std::fs::create_dir_all(path).map_err(|source| StageError::CreateDir {
        path: path.to_path_buf(),
        source,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(
            |source| StageError::CreateDir {
                path: path.to_path_buf(),
                source,
            },
        )?;
    }

    Ok(())
}
