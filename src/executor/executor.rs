//! Query executor for SQL-Air
//!
//! Runs select and update against a single [`Table`] with per-row locking.
//! Row locks are held only while a row is compared and copied (select) or
//! compared and written (update); output is produced with no lock held.
//!
//! A waiting query that finds nothing blocks on the table's change
//! notification and then runs again from scratch, so its answer reflects the
//! table as it is after the wake-up.

use std::io::Write;

use tracing::debug;

use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::storage::Table;

/// A predicate resolved against a table schema
struct RowFilter<'a> {
    column: usize,
    op: Operator,
    value: &'a str,
}

impl RowFilter<'_> {
    fn matches(&self, cells: &[String]) -> bool {
        self.op.matches(&cells[self.column], self.value)
    }
}

fn column_index(table: &Table, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| Error::SchemaMismatch(format!("unknown column '{}'", name)))
}

fn resolve_filter<'a>(
    table: &Table,
    predicate: Option<&'a Predicate>,
) -> Result<Option<RowFilter<'a>>> {
    predicate
        .map(|pred| {
            Ok(RowFilter {
                column: column_index(table, &pred.column)?,
                op: pred.op,
                value: &pred.value,
            })
        })
        .transpose()
}

fn accepts(filter: &Option<RowFilter<'_>>, cells: &[String]) -> bool {
    filter.as_ref().map_or(true, |f| f.matches(cells))
}

/// Run a select, writing the header, matching rows and a row count to `out`.
///
/// Returns the number of rows selected.
pub fn select(table: &Table, stmt: &SelectStatement, out: &mut dyn Write) -> Result<usize> {
    loop {
        let names: Vec<String> = match &stmt.columns {
            Projection::All => table.columns().to_vec(),
            Projection::Columns(names) => names.clone(),
        };
        let indices = names
            .iter()
            .map(|name| column_index(table, name))
            .collect::<Result<Vec<_>>>()?;
        let filter = resolve_filter(table, stmt.predicate.as_ref())?;

        let seen = table.version();
        let mut count = 0;

        for row in table {
            let selected = {
                let cells = row.lock();
                accepts(&filter, &cells)
                    .then(|| indices.iter().map(|&i| cells[i].clone()).collect::<Vec<_>>())
            };

            if let Some(values) = selected {
                count += 1;
                if count == 1 {
                    writeln!(out, "{}", names.join("\t"))?;
                }
                writeln!(out, "{}", values.join("\t"))?;
            }
        }

        if count == 0 && stmt.must_wait {
            debug!(predicate = ?stmt.predicate, "select found no rows, waiting for an update");
            table.wait_for_change(seen);
            continue;
        }

        writeln!(out, "{} row(s) selected.", count)?;
        return Ok(count);
    }
}

/// Run an update, writing the updated row count to `out`.
///
/// Every column is resolved before any row is touched, so a bad column name
/// leaves the table unchanged. Returns the number of rows updated.
pub fn update(table: &Table, stmt: &UpdateStatement, out: &mut dyn Write) -> Result<usize> {
    loop {
        let targets = stmt
            .assignments
            .iter()
            .map(|a| Ok((column_index(table, &a.column)?, a.value.as_str())))
            .collect::<Result<Vec<_>>>()?;
        let filter = resolve_filter(table, stmt.predicate.as_ref())?;

        let seen = table.version();
        let mut count = 0;

        for row in table {
            let mut cells = row.lock();
            if accepts(&filter, &cells) {
                for &(index, value) in &targets {
                    cells[index] = value.to_string();
                }
                count += 1;
            }
        }

        if count == 0 && stmt.must_wait {
            debug!(predicate = ?stmt.predicate, "update matched no rows, waiting for an update");
            table.wait_for_change(seen);
            continue;
        }

        if count > 0 {
            table.notify_changed();
        }

        writeln!(out, "{} row(s) updated.", count)?;
        return Ok(count);
    }
}

/// Row insertion is not supported
pub fn insert(_stmt: &InsertStatement) -> Result<usize> {
    Err(Error::UnsupportedOperation(
        "insert is not yet implemented.".to_string(),
    ))
}

/// Row deletion is not supported
pub fn delete(_stmt: &DeleteStatement) -> Result<usize> {
    Err(Error::UnsupportedOperation(
        "delete is not yet implemented.".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn create_test_table() -> Table {
        Table::new(
            vec!["name".to_string(), "age".to_string(), "city".to_string()],
            vec![
                vec!["Alice".to_string(), "25".to_string(), "Oxford".to_string()],
                vec!["Bob".to_string(), "30".to_string(), "Dayton".to_string()],
                vec!["Carol".to_string(), "35".to_string(), "Oxford".to_string()],
            ],
        )
        .unwrap()
    }

    fn select_stmt(columns: Projection, predicate: Option<Predicate>) -> SelectStatement {
        SelectStatement {
            source: String::new(),
            columns,
            predicate,
            must_wait: false,
        }
    }

    fn update_stmt(assignments: Vec<Assignment>, predicate: Option<Predicate>) -> UpdateStatement {
        UpdateStatement {
            source: String::new(),
            assignments,
            predicate,
            must_wait: false,
        }
    }

    fn run_select(table: &Table, stmt: &SelectStatement) -> (usize, String) {
        let mut out = Vec::new();
        let count = select(table, stmt, &mut out).unwrap();
        (count, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_select_all() {
        let table = create_test_table();
        let (count, out) = run_select(&table, &select_stmt(Projection::All, None));

        assert_eq!(count, 3);
        assert_eq!(
            out,
            "name\tage\tcity\nAlice\t25\tOxford\nBob\t30\tDayton\nCarol\t35\tOxford\n3 row(s) selected.\n"
        );
    }

    #[test]
    fn test_select_columns_in_request_order() {
        let table = create_test_table();
        let stmt = select_stmt(
            Projection::Columns(vec!["city".to_string(), "name".to_string()]),
            Some(Predicate::eq("city", "Oxford")),
        );
        let (count, out) = run_select(&table, &stmt);

        assert_eq!(count, 2);
        assert_eq!(
            out,
            "city\tname\nOxford\tAlice\nOxford\tCarol\n2 row(s) selected.\n"
        );
    }

    #[test]
    fn test_select_no_match_prints_no_header() {
        let table = create_test_table();
        let stmt = select_stmt(Projection::All, Some(Predicate::eq("name", "Zed")));
        let (count, out) = run_select(&table, &stmt);

        assert_eq!(count, 0);
        assert_eq!(out, "0 row(s) selected.\n");
    }

    #[test]
    fn test_select_with_ordering_operator() {
        let table = create_test_table();
        let stmt = select_stmt(
            Projection::Columns(vec!["name".to_string()]),
            Some(Predicate::new("age", Operator::Gt, "26")),
        );
        let (count, out) = run_select(&table, &stmt);

        assert_eq!(count, 2);
        assert_eq!(out, "name\nBob\nCarol\n2 row(s) selected.\n");
    }

    #[test]
    fn test_select_unknown_column() {
        let table = create_test_table();
        let mut out = Vec::new();

        let stmt = select_stmt(Projection::Columns(vec!["salary".to_string()]), None);
        assert!(matches!(
            select(&table, &stmt, &mut out),
            Err(Error::SchemaMismatch(_))
        ));

        let stmt = select_stmt(Projection::All, Some(Predicate::eq("salary", "1")));
        assert!(matches!(
            select(&table, &stmt, &mut out),
            Err(Error::SchemaMismatch(_))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_update_only_matching_rows() {
        let table = create_test_table();
        let before = table.snapshot();
        let mut out = Vec::new();

        let stmt = update_stmt(
            vec![Assignment::new("age", "31")],
            Some(Predicate::eq("name", "Bob")),
        );
        let count = update(&table, &stmt, &mut out).unwrap();

        assert_eq!(count, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "1 row(s) updated.\n");

        let after = table.snapshot();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1], vec!["Bob", "31", "Dayton"]);
        assert_eq!(after[2], before[2]);
    }

    #[test]
    fn test_update_without_predicate_touches_every_row() {
        let table = create_test_table();
        let mut out = Vec::new();

        let stmt = update_stmt(
            vec![Assignment::new("city", "Cincinnati"), Assignment::new("age", "0")],
            None,
        );
        assert_eq!(update(&table, &stmt, &mut out).unwrap(), 3);

        for row in table.snapshot() {
            assert_eq!(row[1..], ["0", "Cincinnati"]);
        }
    }

    #[test]
    fn test_update_no_match_does_not_notify() {
        let table = create_test_table();
        let version = table.version();
        let mut out = Vec::new();

        let stmt = update_stmt(
            vec![Assignment::new("age", "1")],
            Some(Predicate::eq("name", "Zed")),
        );
        assert_eq!(update(&table, &stmt, &mut out).unwrap(), 0);
        assert_eq!(table.version(), version);
        assert_eq!(String::from_utf8(out).unwrap(), "0 row(s) updated.\n");
    }

    #[test]
    fn test_update_unknown_column_changes_nothing() {
        let table = create_test_table();
        let before = table.snapshot();
        let mut out = Vec::new();

        // The valid first assignment must not be applied either
        let stmt = update_stmt(
            vec![Assignment::new("age", "99"), Assignment::new("salary", "1")],
            None,
        );
        let result = update(&table, &stmt, &mut out);

        assert!(matches!(result, Err(Error::SchemaMismatch(_))));
        assert_eq!(table.snapshot(), before);
    }

    #[test]
    fn test_waiting_select_sees_post_update_state() {
        let table = Arc::new(
            Table::new(
                vec!["col0".to_string(), "col1".to_string()],
                vec![vec!["a".to_string(), "1".to_string()]],
            )
            .unwrap(),
        );

        let waiter = {
            let table = table.clone();
            thread::spawn(move || {
                let mut stmt = select_stmt(Projection::All, Some(Predicate::eq("col0", "b")));
                stmt.must_wait = true;
                run_select(&table, &stmt)
            })
        };

        thread::sleep(Duration::from_millis(100));
        assert!(!waiter.is_finished());

        let mut out = Vec::new();
        let stmt = update_stmt(vec![Assignment::new("col0", "b")], None);
        assert_eq!(update(&table, &stmt, &mut out).unwrap(), 1);

        let (count, out) = waiter.join().unwrap();
        assert_eq!(count, 1);
        assert_eq!(out, "col0\tcol1\nb\t1\n1 row(s) selected.\n");
    }

    #[test]
    fn test_waiting_update_retries_after_change() {
        let table = Arc::new(create_test_table());

        let waiter = {
            let table = table.clone();
            thread::spawn(move || {
                let mut stmt = update_stmt(
                    vec![Assignment::new("city", "Columbus")],
                    Some(Predicate::eq("name", "Dave")),
                );
                stmt.must_wait = true;
                let mut out = Vec::new();
                update(&table, &stmt, &mut out).unwrap()
            })
        };

        // An unrelated update wakes the waiter, which re-checks and keeps waiting
        thread::sleep(Duration::from_millis(50));
        let mut out = Vec::new();
        update(
            &table,
            &update_stmt(vec![Assignment::new("age", "26")], Some(Predicate::eq("name", "Alice"))),
            &mut out,
        )
        .unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        update(
            &table,
            &update_stmt(vec![Assignment::new("name", "Dave")], Some(Predicate::eq("name", "Bob"))),
            &mut out,
        )
        .unwrap();

        assert_eq!(waiter.join().unwrap(), 1);
        assert_eq!(table.snapshot()[1], vec!["Dave", "30", "Columbus"]);
    }

    #[test]
    fn test_concurrent_updates_on_disjoint_rows() {
        let table = Arc::new(create_test_table());

        let handles: Vec<_> = ["Alice", "Carol"]
            .into_iter()
            .map(|name| {
                let table = table.clone();
                thread::spawn(move || {
                    let mut out = Vec::new();
                    let mut total = 0;
                    for i in 0..200 {
                        let stmt = update_stmt(
                            vec![Assignment::new("age", i.to_string())],
                            Some(Predicate::eq("name", name)),
                        );
                        total += update(&table, &stmt, &mut out).unwrap();
                    }
                    total
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 200);
        }
        let rows = table.snapshot();
        assert_eq!(rows[0][1], "199");
        assert_eq!(rows[1][1], "30");
        assert_eq!(rows[2][1], "199");
    }

    #[test]
    fn test_insert_and_delete_are_unsupported() {
        let insert_stmt = InsertStatement {
            source: String::new(),
            columns: vec!["name".to_string()],
            values: vec!["Eve".to_string()],
            must_wait: false,
        };
        let delete_stmt = DeleteStatement {
            source: String::new(),
            predicate: None,
            must_wait: true,
        };

        assert!(matches!(
            insert(&insert_stmt),
            Err(Error::UnsupportedOperation(ref msg)) if msg == "insert is not yet implemented."
        ));
        assert!(matches!(
            delete(&delete_stmt),
            Err(Error::UnsupportedOperation(ref msg)) if msg == "delete is not yet implemented."
        ));
    }
}
