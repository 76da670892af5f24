//! Table sources
//!
//! A [`TableSource`] turns a source identifier into a freshly loaded
//! [`Table`]. The cache only ever calls it outside its own lock.

use super::remote;
use crate::error::{Error, Result};
use crate::storage::{csv, Table};
use std::fs::File;
use std::io::BufReader;

/// Loads tables by source identifier
pub trait TableSource: Send + Sync {
    /// Load the table named by `source`. Must be free of side effects, since
    /// the same source may be loaded more than once under contention.
    fn load(&self, source: &str) -> Result<Table>;
}

/// Check if a source identifier names a remote table
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://")
}

/// Default source: `http://` URLs are downloaded, anything else is a local
/// file path. Both are decoded as CSV.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceLoader;

impl TableSource for SourceLoader {
    fn load(&self, source: &str) -> Result<Table> {
        if is_remote(source) {
            return csv::read(remote::fetch(source)?);
        }

        let file = File::open(source)
            .map_err(|e| Error::Load(format!("unable to open '{}': {}", source, e)))?;
        csv::read(BufReader::new(file))
    }
}
