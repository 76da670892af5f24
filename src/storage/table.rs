//! Table storage for SQL-Air
//!
//! A table combines an immutable column list with a fixed sequence of
//! independently locked rows and a change notification used by waiting
//! queries.

use super::row::Row;
use crate::error::{Error, Result};
use std::sync::{Condvar, Mutex, PoisonError};

/// An in-memory table loaded from one source
#[derive(Debug)]
pub struct Table {
    /// Column names in schema order
    columns: Vec<String>,
    /// Rows, each guarded by its own lock
    rows: Vec<Row>,
    /// Change counter, bumped on every successful update.
    /// Only pairs with `changed`; never guards row contents.
    version: Mutex<u64>,
    /// Signalled after the change counter moves
    changed: Condvar,
}

impl Table {
    /// Create a table, checking every row against the column count
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::SchemaMismatch(format!(
                    "row {} has {} values but the table has {} columns",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }

        Ok(Self {
            columns,
            rows: rows.into_iter().map(Row::new).collect(),
            version: Mutex::new(0),
            changed: Condvar::new(),
        })
    }

    /// Column names in schema order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All rows in table order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate over rows in table order
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Copy every row's values, locking one row at a time
    pub fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(Row::snapshot).collect()
    }

    /// Current value of the change counter.
    ///
    /// Read this before scanning; pass it to [`Table::wait_for_change`] so an
    /// update landing between the scan and the wait is not missed.
    pub fn version(&self) -> u64 {
        *self.version.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the change counter differs from `seen`
    pub fn wait_for_change(&self, seen: u64) {
        let guard = self.version.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .changed
            .wait_while(guard, |version| *version == seen)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Record a change and wake every waiter
    pub fn notify_changed(&self) {
        {
            let mut version = self.version.lock().unwrap_or_else(PoisonError::into_inner);
            *version = version.wrapping_add(1);
        }
        self.changed.notify_all();
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn create_test_table() -> Table {
        Table::new(
            vec!["name".to_string(), "age".to_string()],
            vec![
                vec!["Alice".to_string(), "25".to_string()],
                vec!["Bob".to_string(), "30".to_string()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_table_schema() {
        let table = create_test_table();

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_index("age"), Some(1));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn test_table_wrong_column_count() {
        let result = Table::new(
            vec!["name".to_string(), "age".to_string()],
            vec![vec!["Alice".to_string()]],
        );

        assert!(matches!(result, Err(Error::SchemaMismatch(_))));
    }

    #[test]
    fn test_table_snapshot() {
        let table = create_test_table();
        table.rows()[1].lock()[1] = "31".to_string();

        assert_eq!(
            table.snapshot(),
            vec![vec!["Alice", "25"], vec!["Bob", "31"]]
        );
    }

    #[test]
    fn test_wait_returns_after_missed_notification() {
        let table = create_test_table();
        let seen = table.version();

        // The change lands before the waiter blocks; the counter makes the
        // wait return instead of sleeping forever.
        table.notify_changed();
        table.wait_for_change(seen);

        assert_eq!(table.version(), seen + 1);
    }

    #[test]
    fn test_wait_wakes_on_notify() {
        let table = Arc::new(create_test_table());
        let seen = table.version();

        let waiter = {
            let table = table.clone();
            thread::spawn(move || table.wait_for_change(seen))
        };

        thread::sleep(Duration::from_millis(50));
        table.notify_changed();
        waiter.join().unwrap();
    }
}
