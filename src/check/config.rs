//! Check configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::STORE_FILE;

/// Store location used when none is configured
pub const DEFAULT_DB_PATH: &str = "/var/lib/rpm";

/// Quarantine directory name inside the store directory
pub const QUARANTINE_DIR: &str = "broken";

/// Where the store lives and whether damaged records get repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Alternate filesystem root; `db_path` is resolved beneath it
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Scan and report only
    #[serde(default)]
    pub check_only: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            root: None,
            db_path: default_db_path(),
            check_only: false,
        }
    }
}

impl CheckConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn check_only(mut self, check_only: bool) -> Self {
        self.check_only = check_only;
        self
    }

    /// Store directory: `db_path` beneath `root` when a non-empty root is set.
    pub fn store_dir(&self) -> PathBuf {
        match self.root.as_deref() {
            Some(root) if !root.as_os_str().is_empty() => {
                let relative = self.db_path.strip_prefix("/").unwrap_or(self.db_path.as_path());
                root.join(relative)
            }
            _ => self.db_path.clone(),
        }
    }

    /// Path of the record log inside the store directory.
    pub fn store_file(&self) -> PathBuf {
        self.store_dir().join(STORE_FILE)
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.store_dir().join(QUARANTINE_DIR)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}
