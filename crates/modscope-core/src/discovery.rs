//! Solution discovery
//!
//! Walks upward from a starting directory until a directory containing a
//! manifest file is found, or the filesystem root has been checked.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{HostError, ResolveError};

/// Locates the manifest of the enclosing solution.
#[derive(Debug, Clone)]
pub struct SolutionDiscovery {
    extension: String,
    start: Option<PathBuf>,
}

impl Default for SolutionDiscovery {
    fn default() -> Self {
        Self::new("sln")
    }
}

impl SolutionDiscovery {
    /// `extension` is matched without its leading dot.
    pub fn new(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
            start: None,
        }
    }

    /// Start the walk from `dir` instead of the working directory.
    pub fn starting_at(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start = Some(dir.into());
        self
    }

    /// Find the nearest manifest at or above the starting directory.
    pub fn find_manifest(&self) -> Result<PathBuf, ResolveError> {
        let start = match &self.start {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(HostError::from)?,
        };
        self.find_manifest_from(&start)
    }

    /// Find the nearest manifest at or above `start`.
    ///
    /// A relative `start` is taken against the working directory, so the walk
    /// still reaches the filesystem root.
    pub fn find_manifest_from(&self, start: &Path) -> Result<PathBuf, ResolveError> {
        let start = if start.is_absolute() {
            start.to_path_buf()
        } else {
            std::env::current_dir().map_err(HostError::from)?.join(start)
        };

        for dir in start.ancestors() {
            debug!("Searching {:?} for *.{}", dir, self.extension);
            if let Some(found) = self.manifest_in(dir)? {
                debug!("Found manifest {:?}", found);
                return Ok(found);
            }
        }

        Err(ResolveError::not_found(format!(
            "no *.{} file in {:?} or any parent directory",
            self.extension, start
        )))
    }

    /// First manifest in `dir` by file name, if any.
    fn manifest_in(&self, dir: &Path) -> Result<Option<PathBuf>, ResolveError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            // Missing levels are skipped.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(HostError::from(e).into()),
        };

        let mut matches = Vec::new();
        for entry in entries {
            let path = entry.map_err(HostError::from)?.path();
            if path.is_file() && self.matches(&path) {
                matches.push(path);
            }
        }

        matches.sort();
        Ok(matches.into_iter().next())
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}
