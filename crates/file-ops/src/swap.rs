//! Localization swaps into the game's live asset directory.
//!
//! A swap unit is every file the role needs (at least the `.pak` and its
//! `.sig`). Files are first copied next to their destination under a hidden
//! `.partial` name and checked against the source digest; only when the whole
//! unit is staged are they renamed into place. Any failure removes the
//! partial files and fails the whole unit, so a caller never sees a half
//! applied swap reported as success.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use valtext_protocol::{Language, Role};

use crate::staging::LanguageStore;

/// Errors from a localization swap.
#[derive(Debug, thiserror::Error)]
pub enum SwapError {
    #[error("{language} source file missing: {}", .path.display())]
    MissingSource { language: Language, path: PathBuf },

    #[error("destination directory not found: {}", .0.display())]
    MissingDestination(PathBuf),

    #[error("failed to list {}: {source}", .path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("copy of {} does not match its source", .0.display())]
    Verify(PathBuf),

    #[error("failed to move {} into place: {source}", .path.display())]
    Commit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One file of a swap unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapFile {
    pub source: PathBuf,
    /// File name inside the destination directory.
    pub dest_name: String,
}

/// Files written by a successful swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReport {
    pub role: Role,
    pub files: Vec<PathBuf>,
}

/// Copies staged language assets into the game's asset directory.
#[derive(Debug, Clone)]
pub struct LocalizationSwapper {
    store: LanguageStore,
    destination: PathBuf,
    text: Language,
    voice: Language,
}

impl LocalizationSwapper {
    pub fn new(
        store: LanguageStore,
        destination: impl Into<PathBuf>,
        text: Language,
        voice: Language,
    ) -> Self {
        Self {
            store,
            destination: destination.into(),
            text,
            voice,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Applies the swap unit for `role`.
    ///
    /// `Voice` places the voice pair as-is. `Text` places every staged file of
    /// the text language whose name starts with the text file code, renamed
    /// to the voice file code: the client loads voice-coded file names, so
    /// this is how text from one language plays alongside voice from another.
    pub fn swap(&self, role: Role) -> Result<SwapReport, SwapError> {
        let unit = self.plan(role)?;
        let files = self.apply(&unit)?;
        tracing::info!(%role, text = %self.text, voice = %self.voice, files = files.len(), "localization swap applied");
        Ok(SwapReport { role, files })
    }

    /// Resolves the files of `role`'s unit without touching the destination.
    pub fn plan(&self, role: Role) -> Result<Vec<SwapFile>, SwapError> {
        match role {
            Role::Voice => {
                let asset = self.store.asset(self.voice);
                [asset.pak, asset.sig]
                    .into_iter()
                    .map(|source| {
                        if !source.is_file() {
                            return Err(SwapError::MissingSource {
                                language: self.voice,
                                path: source,
                            });
                        }
                        let dest_name = file_name(&source);
                        Ok(SwapFile { source, dest_name })
                    })
                    .collect()
            }
            Role::Text => self.plan_text(),
        }
    }

    fn plan_text(&self) -> Result<Vec<SwapFile>, SwapError> {
        let dir = self.store.language_dir(self.text);
        let text_code = self.text.file_code();
        let voice_code = self.voice.file_code();

        let entries = std::fs::read_dir(&dir).map_err(|source| SwapError::ReadSource {
            path: dir.clone(),
            source,
        })?;

        let mut unit: Vec<SwapFile> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let rest = name.strip_prefix(&text_code)?;
                Some(SwapFile {
                    source: entry.path(),
                    dest_name: format!("{voice_code}{rest}"),
                })
            })
            .collect();
        unit.sort_by(|a, b| a.dest_name.cmp(&b.dest_name));

        // The pair is the minimum: a unit without either half is incomplete.
        let asset = self.store.asset(self.text);
        for required in [asset.pak, asset.sig] {
            if !unit.iter().any(|f| f.source == required) {
                return Err(SwapError::MissingSource {
                    language: self.text,
                    path: required,
                });
            }
        }

        Ok(unit)
    }

    fn apply(&self, unit: &[SwapFile]) -> Result<Vec<PathBuf>, SwapError> {
        if !self.destination.is_dir() {
            return Err(SwapError::MissingDestination(self.destination.clone()));
        }

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(unit.len());
        for file in unit {
            let target = self.destination.join(&file.dest_name);
            let partial = self.destination.join(format!(".{}.partial", file.dest_name));
            // Tracked before copying so a failed copy's leftovers are removed too.
            staged.push((partial.clone(), target));

            if let Err(e) = stage_copy(&file.source, &partial) {
                discard(&staged);
                return Err(e);
            }
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (partial, target)) in staged.iter().enumerate() {
            if let Err(source) = std::fs::rename(partial, target) {
                discard(&staged[i..]);
                return Err(SwapError::Commit {
                    path: target.clone(),
                    source,
                });
            }
            tracing::debug!(file = %target.display(), "asset in place");
            written.push(target.clone());
        }

        Ok(written)
    }
}

/// Copies `from` to `partial` and checks the copy's digest.
fn stage_copy(from: &Path, partial: &Path) -> Result<(), SwapError> {
    let copy_err = |source| SwapError::Copy {
        from: from.to_path_buf(),
        to: partial.to_path_buf(),
        source,
    };

    std::fs::copy(from, partial).map_err(copy_err)?;

    let expected = file_digest(from).map_err(copy_err)?;
    let actual = file_digest(partial).map_err(copy_err)?;
    if expected != actual {
        return Err(SwapError::Verify(partial.to_path_buf()));
    }

    Ok(())
}

/// Removes partial files left behind by an aborted swap.
fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (partial, _) in staged {
        match std::fs::remove_file(partial) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(file = %partial.display(), error = %e, "failed to remove partial copy");
            }
        }
    }
}

/// Hex SHA-256 of a file's contents.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
