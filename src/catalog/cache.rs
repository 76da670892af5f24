//! Table cache for SQL-Air
//!
//! Maps source identifiers to loaded tables and remembers the most recently
//! used source for commands that omit one.

use super::source::{is_remote, SourceLoader, TableSource};
use crate::error::{Error, Result};
use crate::storage::{csv, Table};
use indexmap::IndexMap;
use std::fs::File;
use std::io::BufWriter;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Process-lifetime registry of loaded tables
pub struct TableCache {
    /// Loader used on a cache miss
    source: Arc<dyn TableSource>,
    /// Map structure and the recent pointer. Never held across a load.
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    /// Loaded tables in load order
    tables: IndexMap<String, Arc<Table>>,
    /// Most recently resolved source; always a key of `tables`
    recent: Option<String>,
}

impl TableCache {
    /// Create a cache that loads from local files and `http://` URLs
    pub fn new() -> Self {
        Self::with_source(Arc::new(SourceLoader))
    }

    /// Create a cache with a custom loader
    pub fn with_source(source: Arc<dyn TableSource>) -> Self {
        Self {
            source,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve a source identifier to its table, loading it on first use.
    ///
    /// An empty identifier means the most recently resolved source.
    ///
    /// Two callers missing on the same source at once may both load it; the
    /// first insertion is kept and the other copy is dropped, so every caller
    /// ends up sharing one table instance.
    pub fn resolve(&self, source_id: &str) -> Result<Arc<Table>> {
        let key = {
            let mut state = self.state();
            let key = if source_id.is_empty() {
                state.recent.clone().ok_or(Error::NoSource)?
            } else {
                source_id.to_string()
            };

            if let Some(table) = state.tables.get(&key).cloned() {
                debug!(source = %key, "table cache hit");
                state.recent = Some(key);
                return Ok(table);
            }
            key
        };

        info!(source = %key, "loading table");
        let loaded = self.source.load(&key).map_err(|e| {
            warn!(source = %key, error = %e, "table load failed");
            e
        })?;

        let mut state = self.state();
        let table = match state.tables.get(&key) {
            Some(existing) => {
                debug!(source = %key, "discarding duplicate load");
                existing.clone()
            }
            None => {
                let table = Arc::new(loaded);
                state.tables.insert(key.clone(), table.clone());
                table
            }
        };
        state.recent = Some(key);
        Ok(table)
    }

    /// Get a cached table without loading
    pub fn get(&self, source_id: &str) -> Option<Arc<Table>> {
        self.state().tables.get(source_id).cloned()
    }

    /// Most recently resolved source identifier
    pub fn recent(&self) -> Option<String> {
        self.state().recent.clone()
    }

    /// All cached source identifiers in load order
    pub fn sources(&self) -> Vec<String> {
        self.state().tables.keys().cloned().collect()
    }

    /// Number of cached tables
    pub fn len(&self) -> usize {
        self.state().tables.len()
    }

    /// Check if nothing has been loaded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the most recently used table back to its local file.
    ///
    /// Returns the path written. Remote sources cannot be saved.
    pub fn save_recent(&self) -> Result<String> {
        let (path, table) = {
            let state = self.state();
            let path = state.recent.clone().ok_or(Error::NoSource)?;
            if is_remote(&path) {
                return Err(Error::UnsupportedOperation(
                    "Saving CSV to an URL using POST is not implemented".to_string(),
                ));
            }
            let table = state.tables.get(&path).cloned().ok_or(Error::NoSource)?;
            (path, table)
        };

        let file = File::create(&path)?;
        csv::write(BufWriter::new(file), &table)?;

        info!(source = %path, rows = table.row_count(), "table saved");
        Ok(path)
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("TableCache")
            .field("sources", &state.tables.keys().collect::<Vec<_>>())
            .field("recent", &state.recent)
            .finish()
    }
}
