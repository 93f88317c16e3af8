use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::resolver::ResolvedVerse;

#[derive(Debug, Error)]
pub enum VerseLogError {
    #[error("could not open verse log {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write verse log {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only file of saved verses, one per line.
///
/// The file is opened and closed on every append; no handle is held between
/// saves.
#[derive(Debug, Clone)]
pub struct VerseLog {
    path: PathBuf,
}

impl VerseLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, verse: &ResolvedVerse) -> Result<(), VerseLogError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| VerseLogError::Open {
                path: self.path.clone(),
                source,
            })?;

        writeln!(file, "{}", verse.display_text()).map_err(|source| VerseLogError::Write {
            path: self.path.clone(),
            source,
        })?;

        log::info!("Saved {} to {}", verse.citation(), self.path.display());
        Ok(())
    }
}
