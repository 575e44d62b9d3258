use std::path::PathBuf;

use thiserror::Error;

use crate::schema::Role;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("no files matching `{pattern}` in {}", dir.display())]
    NoMatchingFiles { dir: PathBuf, pattern: String },

    #[error("{input} is missing required columns: {}", columns.join(", "))]
    MissingColumns { input: String, columns: Vec<String> },

    #[error("column `{0}` appears more than once in the header")]
    DuplicateColumn(String),

    #[error("schema has no {0:?} column")]
    MissingRole(Role),

    #[error("no data could be loaded from {}", .0.display())]
    NoData(PathBuf),

    #[error("column `{column}` holds non-numeric value `{value}` at row {row}")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("failed to render {}: {message}", path.display())]
    Render { path: PathBuf, message: String },

    #[error("{failed} of {total} figures failed to render")]
    PartialFailure { failed: usize, total: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}
