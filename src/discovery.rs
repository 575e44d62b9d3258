//! Finds sweep result files and the facet label encoded in their names.

use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// `<prefix><facet><suffix>` file naming, e.g. `evaluation_Sijk.csv`.
#[derive(Debug, Clone)]
pub struct FacetPattern {
    prefix: String,
    suffix: String,
    regex: Regex,
}

impl FacetPattern {
    pub fn new(prefix: &str, suffix: &str) -> Result<Self> {
        let regex = Regex::new(&format!(
            "^{}(.+){}$",
            regex::escape(prefix),
            regex::escape(suffix)
        ))?;
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            regex,
        })
    }

    /// Glob matching every candidate file name.
    pub fn glob(&self) -> String {
        format!(
            "{}*{}",
            Pattern::escape(&self.prefix),
            Pattern::escape(&self.suffix)
        )
    }

    /// Facet label of a file, or `None` when its base name does not follow
    /// the naming convention.
    pub fn facet_of(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        self.regex
            .captures(name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// An input file together with its facet label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetFile {
    pub path: PathBuf,
    pub facet: String,
}

/// Files in `dir` matching the pattern, sorted by path.
pub fn discover(dir: &Path, pattern: &FacetPattern) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InputNotFound(dir.to_path_buf()));
    }
    let dir_pattern = Pattern::escape(&dir.to_string_lossy());
    let full = format!("{}/{}", dir_pattern.trim_end_matches('/'), pattern.glob());
    debug!("Searching {}", full);

    let mut paths = Vec::new();
    for entry in glob(&full)? {
        let path = entry?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(Error::NoMatchingFiles {
            dir: dir.to_path_buf(),
            pattern: pattern.glob(),
        });
    }
    Ok(paths)
}

/// Attaches facet labels, skipping files that do not follow the convention.
pub fn label(paths: Vec<PathBuf>, pattern: &FacetPattern) -> Vec<FacetFile> {
    paths
        .into_iter()
        .filter_map(|path| match pattern.facet_of(&path) {
            Some(facet) => Some(FacetFile { path, facet }),
            None => {
                warn!("Skipping {}: file name does not match the naming pattern", path.display());
                None
            }
        })
        .collect()
}
