//! Offset-tracking reader for one append-only log file.
//!
//! Only complete lines are returned. A partially written final line stays
//! in the file and is picked up again by the next read once its newline
//! lands.

use std::collections::HashMap;
use std::fs::{File, Metadata};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Upper bound on the bytes consumed by a single [`TailReader::read_new`].
pub const MAX_READ_BYTES: u64 = 4 * 1024 * 1024;

/// Errors from reading the bound log file.
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    #[error("log file is gone: {}", .0.display())]
    Gone(PathBuf),

    #[error("no log file bound")]
    Unbound,

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TailError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            TailError::Gone(path.to_path_buf())
        } else {
            TailError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Distinguishes two files that lived at the same path.
///
/// Device and inode on Unix. Elsewhere the creation time, which a file
/// deleted and recreated under the same name normally does not keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileKey {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    #[cfg(not(unix))]
    created: Option<SystemTime>,
}

impl FileKey {
    fn of(metadata: &Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self {
                dev: metadata.dev(),
                ino: metadata.ino(),
            }
        }

        #[cfg(not(unix))]
        {
            Self {
                created: metadata.created().ok(),
            }
        }
    }
}

/// Which file is being read, as of the last observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub key: FileKey,
    pub modified: Option<SystemTime>,
}

impl FileIdentity {
    /// Why the file now at `self.path` is not the one that was read, if so.
    fn replaced_by(&self, current: &Metadata, offset: u64) -> Option<&'static str> {
        if FileKey::of(current) != self.key {
            return Some("replaced");
        }
        if current.len() < offset {
            return Some("truncated");
        }
        match (self.modified, current.modified().ok()) {
            (Some(seen), Some(now)) if now < seen => Some("modification time went back"),
            _ => None,
        }
    }
}

/// Read position within the bound file.
///
/// `offset` always points just past the last complete line handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPosition {
    pub identity: FileIdentity,
    pub offset: u64,
}

/// Tails a single log file from a stored byte offset.
///
/// Positions of files it was bound to before are remembered, so rebinding
/// to one of them resumes after the lines already handed out.
#[derive(Debug, Default)]
pub struct TailReader {
    file: Option<File>,
    position: Option<LogPosition>,
    seen: HashMap<PathBuf, LogPosition>,
}

impl TailReader {
    /// Creates an unbound reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reader bound to `path` at offset 0.
    pub fn open(path: &Path) -> Result<Self, TailError> {
        let mut reader = Self::new();
        reader.rebind(path)?;
        Ok(reader)
    }

    /// Closes the current file, if any, and binds to `path`.
    ///
    /// Starts at offset 0 unless this same file was read before, in which
    /// case reading resumes where it stopped.
    pub fn rebind(&mut self, path: &Path) -> Result<(), TailError> {
        if let Some(previous) = self.position.take() {
            self.seen.insert(previous.identity.path.clone(), previous);
        }
        self.file = None;

        let resume = self.seen.remove(path);
        self.bind(path, resume)
    }

    /// Drops the handle and position, forgetting the bound file.
    pub fn unbind(&mut self) {
        self.file = None;
        if let Some(position) = self.position.take() {
            self.seen.remove(&position.identity.path);
        }
    }

    fn bind(&mut self, path: &Path, resume: Option<LogPosition>) -> Result<(), TailError> {
        let file = File::open(path).map_err(|e| TailError::from_io(path, e))?;
        let metadata = file.metadata().map_err(|e| TailError::from_io(path, e))?;

        let offset = match resume {
            Some(previous) if previous.identity.replaced_by(&metadata, previous.offset).is_none() => {
                previous.offset
            }
            _ => 0,
        };

        self.file = Some(file);
        self.position = Some(LogPosition {
            identity: FileIdentity {
                path: path.to_path_buf(),
                key: FileKey::of(&metadata),
                modified: metadata.modified().ok(),
            },
            offset,
        });

        Ok(())
    }

    /// Path of the bound file.
    pub fn bound_path(&self) -> Option<&Path> {
        self.position.as_ref().map(|p| p.identity.path.as_path())
    }

    /// Current read position.
    pub fn position(&self) -> Option<&LogPosition> {
        self.position.as_ref()
    }

    /// Reads every complete line appended since the last call.
    ///
    /// Returns an empty vector when nothing new is available. Blank lines are
    /// skipped and trailing `\r` is stripped. If the file at the bound path is
    /// no longer the one being read (recreated, or shrunk below the stored
    /// offset) the path is reopened and read from the start.
    pub fn read_new(&mut self) -> Result<Vec<String>, TailError> {
        let Some(position) = self.position.as_ref() else {
            return Err(TailError::Unbound);
        };
        let path = position.identity.path.clone();
        let path = path.as_path();

        // Stat by path: an open handle keeps a deleted file readable on Unix.
        let metadata = std::fs::metadata(path).map_err(|e| TailError::from_io(path, e))?;

        if let Some(reason) = position.identity.replaced_by(&metadata, position.offset) {
            tracing::warn!(
                file = %path.display(),
                offset = position.offset,
                len = metadata.len(),
                reason,
                "log file changed underneath, re-reading from start"
            );
            self.file = None;
            self.position = None;
            self.bind(path, None)?;
        }

        let (Some(file), Some(position)) = (self.file.as_mut(), self.position.as_mut()) else {
            return Err(TailError::Unbound);
        };
        position.identity.modified = metadata.modified().ok();

        if metadata.len() == position.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(position.offset))
            .map_err(|e| TailError::from_io(path, e))?;

        let mut buf = Vec::new();
        file.by_ref()
            .take(MAX_READ_BYTES)
            .read_to_end(&mut buf)
            .map_err(|e| TailError::from_io(path, e))?;

        let consumed = match buf.iter().rposition(|&b| b == b'\n') {
            Some(last_newline) => last_newline + 1,
            // A single line longer than the read bound is handed out as is
            // rather than stalling the reader forever.
            None if buf.len() as u64 >= MAX_READ_BYTES => buf.len(),
            None => return Ok(Vec::new()),
        };

        let lines = split_lines(&buf[..consumed]);
        position.offset += consumed as u64;

        tracing::trace!(
            file = %path.display(),
            offset = position.offset,
            lines = lines.len(),
            "read log lines"
        );

        Ok(lines)
    }
}

/// Splits complete lines, dropping blanks and `\r` terminators.
fn split_lines(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| b == b'\n')
        .map(|raw| String::from_utf8_lossy(raw).trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
