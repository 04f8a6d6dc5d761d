//! Reference asset store: per-language `.pak`/`.sig` copies kept outside the
//! game so they survive client updates.

use std::path::{Path, PathBuf};

use valtext_protocol::Language;

/// Errors while preparing or populating the asset store.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{language} assets are not staged in {}", .dir.display())]
    NotStaged {
        language: Language,
        dir: PathBuf,
        missing: Vec<PathBuf>,
    },

    #[error("game asset not found: {}", .0.display())]
    MissingGameAsset(PathBuf),

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One language's asset pair inside the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageAsset {
    pub language: Language,
    pub pak: PathBuf,
    pub sig: PathBuf,
}

impl LanguageAsset {
    /// Files of the pair that do not exist.
    pub fn missing(&self) -> Vec<PathBuf> {
        [&self.pak, &self.sig]
            .into_iter()
            .filter(|p| !p.is_file())
            .cloned()
            .collect()
    }

    /// Whether both files are present.
    pub fn is_staged(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Root of the reference asset store: one subdirectory per language name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageStore {
    root: PathBuf,
}

impl LanguageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding `language`'s assets.
    pub fn language_dir(&self, language: Language) -> PathBuf {
        self.root.join(language.name())
    }

    /// Expected asset pair for `language`.
    pub fn asset(&self, language: Language) -> LanguageAsset {
        let dir = self.language_dir(language);
        LanguageAsset {
            language,
            pak: dir.join(language.pak_name()),
            sig: dir.join(language.sig_name()),
        }
    }

    /// Creates the store root and the folders of the given languages.
    pub fn ensure_dirs(&self, languages: &[Language]) -> Result<(), StageError> {
        crate::ensure_dir(&self.root)?;
        for &language in languages {
            crate::ensure_dir(&self.language_dir(language))?;
        }
        Ok(())
    }

    /// Checks that `language`'s pair is staged.
    pub fn verify(&self, language: Language) -> Result<LanguageAsset, StageError> {
        let asset = self.asset(language);
        let missing = asset.missing();
        if !missing.is_empty() {
            tracing::warn!(%language, ?missing, "language assets not staged");
            return Err(StageError::NotStaged {
                language,
                dir: self.language_dir(language),
                missing,
            });
        }
        Ok(asset)
    }

    /// Copies `language`'s pair out of the game's asset directory into the
    /// store.
    ///
    /// Only meaningful while the game is currently set to `language`; the
    /// client keeps a single language pair in its asset directory.
    pub fn stage_from_game(
        &self,
        language: Language,
        paks_dir: &Path,
    ) -> Result<LanguageAsset, StageError> {
        let asset = self.asset(language);
        let sources = [
            paks_dir.join(language.sig_name()),
            paks_dir.join(language.pak_name()),
        ];
        if let Some(missing) = sources.iter().find(|p| !p.is_file()) {
            return Err(StageError::MissingGameAsset(missing.clone()));
        }

        crate::ensure_dir(&self.language_dir(language))?;

        for (from, to) in sources.iter().zip([&asset.sig, &asset.pak]) {
            std::fs::copy(from, to).map_err(|source| StageError::Copy {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;
            tracing::info!(from = %from.display(), to = %to.display(), "staged asset");
        }

        Ok(asset)
    }
}
