//! On-disk artifacts of a page database.
//!
//! A database is three files sharing a path prefix: `<prefix>.pages` holds the
//! pages back to back in page-id order, `<prefix>.rid` holds the RID table and
//! `<prefix>.info` holds the [`PageDbInfo`] sidecar.

pub mod info;
pub mod page_file;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub use info::PageDbInfo;
pub use page_file::PageFile;

/// Paths of the files making up one page database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbFiles {
    pub pages: PathBuf,
    pub rid: PathBuf,
    pub info: PathBuf,
}

impl DbFiles {
    pub fn from_prefix(prefix: &Path) -> Self {
        Self {
            pages: with_suffix(prefix, ".pages"),
            rid: with_suffix(prefix, ".rid"),
            info: with_suffix(prefix, ".info"),
        }
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(prefix.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}
