//! Row storage for SQL-Air
//!
//! A row is the unit of fine-grained locking: every read-modify or
//! compare-and-read sequence on its cells happens under the row's own mutex.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// One record of a table
#[derive(Debug, Default)]
pub struct Row {
    /// Cell values in schema order
    cells: Mutex<Vec<String>>,
}

impl Row {
    /// Create a new row from its cell values
    pub fn new(cells: Vec<String>) -> Self {
        Self {
            cells: Mutex::new(cells),
        }
    }

    /// Lock the row for a compare-and-read or read-modify-write sequence.
    ///
    /// A panic in another holder does not leave the cells half-written (every
    /// mutation is a plain cell assignment), so a poisoned lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy the current cell values out of the row
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Number of cells in the row
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the row has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<String>> for Row {
    fn from(cells: Vec<String>) -> Self {
        Self::new(cells)
    }
}
