//! Latest log file lookup.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A single-wildcard file name pattern such as `*.log` or `client_*.log`.
///
/// Only one `*` is supported; a pattern without `*` matches one exact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPattern {
    prefix: String,
    suffix: Option<String>,
}

impl LogPattern {
    pub fn new(pattern: &str) -> Self {
        match pattern.split_once('*') {
            Some((prefix, suffix)) => Self {
                prefix: prefix.to_string(),
                suffix: Some(suffix.to_string()),
            },
            None => Self {
                prefix: pattern.to_string(),
                suffix: None,
            },
        }
    }

    /// Returns whether a file name matches.
    pub fn matches(&self, name: &str) -> bool {
        match &self.suffix {
            Some(suffix) => {
                name.len() >= self.prefix.len() + suffix.len()
                    && name.starts_with(&self.prefix)
                    && name.ends_with(suffix.as_str())
            }
            None => name == self.prefix,
        }
    }
}

impl Default for LogPattern {
    fn default() -> Self {
        Self::new(crate::DEFAULT_LOG_PATTERN)
    }
}

/// Finds the most recently modified file matching `pattern` in `log_dir`.
///
/// Returns `None` when the directory is missing or has no matching file.
/// Ties on modification time go to the lexicographically largest path, so an
/// unchanged directory always yields the same answer.
pub fn find_latest_log(log_dir: &Path, pattern: &LogPattern) -> Option<PathBuf> {
    std::fs::read_dir(log_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| pattern.matches(name))
        })
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, entry.path()))
        })
        .max()
        .map(|(_, path)| path)
}

/// Something that can name the log file currently being written.
///
/// The watcher re-asks on every tick; implementations must not cache.
pub trait LogDirectory {
    fn latest(&self) -> Option<PathBuf>;
}

/// A real directory scanned with a [`LogPattern`].
#[derive(Debug, Clone)]
pub struct GlobDirectory {
    dir: PathBuf,
    pattern: LogPattern,
}

impl GlobDirectory {
    pub fn new(dir: impl Into<PathBuf>, pattern: LogPattern) -> Self {
        Self {
            dir: dir.into(),
            pattern,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LogDirectory for GlobDirectory {
    fn latest(&self) -> Option<PathBuf> {
        find_latest_log(&self.dir, &self.pattern)
    }
}
