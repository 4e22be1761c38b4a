//! Directory definition loading from TOML files.
//!
//! Definitions live one per file under a definitions directory (any depth).
//! The Psychology Today definition is compiled in so a fresh install can
//! discover without any files on disk.

use crate::{
    definition::DirectoryDefinition,
    error::{DiscoveryError, Result},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const BUILTIN: &[(&str, &str)] = &[(
    "psychology_today.toml",
    include_str!("../directories/psychology_today.toml"),
)];

/// Loader for directory definitions from TOML files.
#[derive(Debug)]
pub struct DirectoryLoader {
    /// Base directory containing definitions
    definitions_dir: PathBuf,
}

impl DirectoryLoader {
    /// Create a new loader with the given definitions directory.
    ///
    /// # Errors
    /// Returns error if the directory doesn't exist.
    pub fn new(definitions_dir: impl Into<PathBuf>) -> Result<Self> {
        let definitions_dir = definitions_dir.into();

        if !definitions_dir.is_dir() {
            return Err(DiscoveryError::DirectoryNotFound {
                path: definitions_dir.display().to_string(),
            });
        }

        Ok(Self { definitions_dir })
    }

    /// Definitions compiled into the binary.
    ///
    /// # Errors
    /// Returns error if an embedded definition fails to parse or validate.
    pub fn builtin() -> Result<Vec<DirectoryDefinition>> {
        BUILTIN
            .iter()
            .map(|(origin, source)| {
                let definition = DirectoryDefinition::from_toml(source, origin)?;
                definition.validate()?;
                Ok(definition)
            })
            .collect()
    }

    /// Load a single definition by ID.
    ///
    /// # Errors
    /// Returns error if the definition file doesn't exist, can't be read, or is invalid.
    pub fn load(&self, directory_id: &str) -> Result<DirectoryDefinition> {
        let filename = format!("{directory_id}.toml");
        let path = Self::find_file(&self.definitions_dir, &filename)?.ok_or_else(|| {
            DiscoveryError::NotFound {
                directory_id: directory_id.to_string(),
            }
        })?;

        let definition = Self::load_from_path(&path)?;
        definition.validate()?;

        debug!(
            directory_id = %directory_id,
            name = %definition.name(),
            "loaded directory definition"
        );

        Ok(definition)
    }

    /// Load all definitions from the definitions directory.
    ///
    /// Invalid definitions are logged as warnings and skipped.
    ///
    /// # Errors
    /// Returns error if the directory can't be read.
    pub fn load_all(&self) -> Result<Vec<DirectoryDefinition>> {
        let mut definitions = Vec::new();

        Self::walk_and_load(&self.definitions_dir, &mut definitions)?;
        definitions.sort_by(|a, b| a.id().cmp(b.id()));

        info!(
            count = definitions.len(),
            dir = %self.definitions_dir.display(),
            "loaded directory definitions"
        );

        Ok(definitions)
    }

    fn walk_and_load(dir: &Path, definitions: &mut Vec<DirectoryDefinition>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();

            if path.is_dir() {
                Self::walk_and_load(&path, definitions)?;
                continue;
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }

            let loaded = Self::load_from_path(&path).and_then(|definition| {
                definition.validate()?;
                Ok(definition)
            });
            match loaded {
                Ok(definition) => definitions.push(definition),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "skipping invalid directory definition"
                ),
            }
        }

        Ok(())
    }

    fn find_file(dir: &Path, filename: &str) -> Result<Option<PathBuf>> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();

            if path.is_dir() {
                if let Some(found) = Self::find_file(&path, filename)? {
                    return Ok(Some(found));
                }
            } else if path.file_name().and_then(|s| s.to_str()) == Some(filename) {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    fn load_from_path(path: &Path) -> Result<DirectoryDefinition> {
        let contents = std::fs::read_to_string(path).map_err(|e| DiscoveryError::LoadError {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        DirectoryDefinition::from_toml(&contents, &path.display().to_string())
    }
}
