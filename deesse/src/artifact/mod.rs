//! Derived artifacts on disk: writing them atomically and loading the
//! compiled table manifest back.

use crate::compiler::Table;
use crate::error::{DeesseError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SCHEMA_SQL: &str = "schema.sql";
pub const SCHEMA_JSON: &str = "schema.json";
pub const TYPES_RS: &str = "types.rs";

/// A generated file, relative to the artifact directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Artifact {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Write into `dir` via a temp file in the same directory and a rename,
    /// so readers never observe a partial file. Returns false when the file
    /// already held these contents and was left untouched.
    pub fn write_to(&self, dir: &Path) -> Result<bool> {
        Ok(!write_all(dir, std::slice::from_ref(self))?.is_empty())
    }

    /// Write the contents to a temp file beside the target. `None` when the
    /// target already holds these contents.
    fn stage(&self, dir: &Path) -> Result<Option<Staged>> {
        let target = dir.join(&self.path);
        let previous = match std::fs::read(&target) {
            Ok(existing) if existing == self.contents.as_bytes() => return Ok(None),
            Ok(existing) => Some(existing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let parent = target.parent().unwrap_or(dir);
        std::fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(self.contents.as_bytes())?;
        tmp.flush()?;
        Ok(Some(Staged {
            path: self.path.clone(),
            target,
            tmp,
            previous,
        }))
    }
}

/// An artifact written to a temp file, waiting to be renamed into place.
struct Staged {
    path: PathBuf,
    target: PathBuf,
    tmp: NamedTempFile,
    previous: Option<Vec<u8>>,
}

/// A file that has been replaced, with what it held before.
struct Committed {
    target: PathBuf,
    previous: Option<Vec<u8>>,
}

impl Staged {
    fn commit(self) -> Result<Committed> {
        self.tmp
            .persist(&self.target)
            .map_err(|e| DeesseError::Io(e.error))?;
        Ok(Committed {
            target: self.target,
            previous: self.previous,
        })
    }
}

impl Committed {
    /// Put back the previous contents, or remove a file that did not exist.
    fn restore(&self) -> Result<()> {
        match &self.previous {
            Some(contents) => {
                let parent = self.target.parent().unwrap_or(Path::new("."));
                let mut tmp = NamedTempFile::new_in(parent)?;
                tmp.write_all(contents)?;
                tmp.persist(&self.target)
                    .map_err(|e| DeesseError::Io(e.error))?;
            }
            None => std::fs::remove_file(&self.target)?,
        }
        Ok(())
    }
}

fn roll_back(committed: &[Committed]) {
    for done in committed.iter().rev() {
        if let Err(e) = done.restore() {
            log::warn!("Failed to restore {}: {e}", done.target.display());
        }
    }
}

/// Write every artifact into `dir` as a set. Returns the paths that changed.
///
/// All contents are staged before any file is replaced. If a replacement
/// fails, the files already replaced get their previous contents back, so
/// the directory never holds a mix of old and new artifacts.
pub fn write_all(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    let mut staged = Vec::new();
    for artifact in artifacts {
        if let Some(ready) = artifact.stage(dir)? {
            staged.push(ready);
        }
    }

    let mut changed = Vec::with_capacity(staged.len());
    let mut committed = Vec::with_capacity(staged.len());
    for ready in staged {
        let path = ready.path.clone();
        match ready.commit() {
            Ok(done) => {
                log::debug!("Wrote {}", path.display());
                committed.push(done);
                changed.push(path);
            }
            Err(e) => {
                roll_back(&committed);
                return Err(e);
            }
        }
    }
    Ok(changed)
}

/// Outcome of loading the compiled schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedSchema {
    Generated(Vec<Table>),
    /// Nothing has been generated yet; equivalent to an empty schema.
    NotGenerated,
}

impl LoadedSchema {
    pub fn tables(&self) -> &[Table] {
        match self {
            LoadedSchema::Generated(tables) => tables,
            LoadedSchema::NotGenerated => &[],
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, LoadedSchema::Generated(_))
    }
}

/// Loads the table manifest from an artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    dir: PathBuf,
}

impl ArtifactLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ArtifactLoader { dir: dir.into() }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(SCHEMA_JSON)
    }

    /// Read `schema.json`. A missing file means nothing was generated; a
    /// corrupt one is an error.
    pub fn load(&self) -> Result<LoadedSchema> {
        let path = self.manifest_path();
        if !path.exists() {
            log::debug!("No manifest at {}", path.display());
            return Ok(LoadedSchema::NotGenerated);
        }
        let content = std::fs::read_to_string(&path)?;
        let tables = serde_json::from_str(&content)?;
        Ok(LoadedSchema::Generated(tables))
    }
}
