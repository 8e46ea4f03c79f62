#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::{io, path::PathBuf};
use thiserror::Error;

/// Logical identifier for a page in the storage layer.
///
/// Id `0` is reserved as the "no page" sentinel: an empty tree's root is
/// `PageId::NULL`, and no store ever hands out `0` from `allocate`.
/// Examples:
/// - `let empty_root = PageId::NULL;`
/// - `let first_page = PageId(1);`
/// - `let child = PageId(9001);`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub u64);

impl PageId {
    /// The reserved "no page" id.
    pub const NULL: PageId = PageId(0);

    /// Returns true for the reserved id `0`.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Canonical error type shared across the storage engine subsystems.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("node: {0}")]
    Node(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias that carries a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for the storage engine components.
///
/// # Example
/// ```
/// use common::Config;
/// use std::path::PathBuf;
///
/// let config = Config::builder()
///     .data_dir(PathBuf::from("./my_db"))
///     .sync_writes(false)
///     .build();
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Config {
    /// Directory where the page store file lives.
    #[builder(default = PathBuf::from("./db_data"))]
    pub data_dir: PathBuf,
    /// Flush file writes after every allocate/free.
    #[builder(default = true)]
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./db_data"),
            sync_writes: true,
        }
    }
}
