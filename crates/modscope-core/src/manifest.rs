//! Manifest parsing
//!
//! A manifest lists the projects of a multi-module solution in a defined
//! order. [`SolutionFileParser`] reads the `.sln` solution format.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Expands a manifest into its ordered project names.
pub trait ManifestParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<Vec<String>, HostError>;
}

/// Project type GUID of solution folders, which are not buildable projects.
pub const SOLUTION_FOLDER_KIND: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

const SOLUTION_HEADER: &str = "Microsoft Visual Studio Solution File";

const PROJECT_PATTERN: &str = r#"^Project\("\{(?P<kind>[^}]+)\}"\)\s*=\s*"(?P<name>[^"]*)"\s*,\s*"(?P<path>[^"]*)"\s*,\s*"\{(?P<guid>[^}]+)\}"\s*$"#;

/// One project entry of a solution file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionProject {
    pub name: String,
    /// Path relative to the solution directory, with `/` separators
    pub relative_path: PathBuf,
    pub guid: String,
    pub kind: String,
}

/// Parser for Visual Studio style `.sln` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolutionFileParser;

impl SolutionFileParser {
    pub fn new() -> Self {
        Self
    }

    /// Projects in file order, solution folders excluded.
    pub fn parse_projects(&self, content: &str) -> Result<Vec<SolutionProject>, HostError> {
        let content = content.trim_start_matches('\u{feff}');
        if !content
            .lines()
            .any(|line| line.trim_start().starts_with(SOLUTION_HEADER))
        {
            return Err(HostError::BadImageFormat(
                "missing solution file header".to_string(),
            ));
        }

        let pattern = Regex::new(PROJECT_PATTERN)
            .map_err(|e| HostError::Other(format!("invalid project pattern: {}", e)))?;

        let mut projects = Vec::new();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if !line.starts_with("Project(") {
                continue;
            }

            let captures = pattern.captures(line).ok_or_else(|| {
                HostError::BadImageFormat(format!("malformed project entry on line {}", number + 1))
            })?;

            let kind = captures["kind"].to_ascii_uppercase();
            if kind == SOLUTION_FOLDER_KIND {
                continue;
            }

            projects.push(SolutionProject {
                name: captures["name"].to_string(),
                relative_path: PathBuf::from(captures["path"].replace('\\', "/")),
                guid: captures["guid"].to_string(),
                kind,
            });
        }

        Ok(projects)
    }
}

impl ManifestParser for SolutionFileParser {
    fn parse(&self, path: &Path) -> Result<Vec<String>, HostError> {
        let content = std::fs::read_to_string(path)?;
        Ok(self
            .parse_projects(&content)?
            .into_iter()
            .map(|project| project.name)
            .collect())
    }
}
