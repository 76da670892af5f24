//! CSV codec for SQL-Air
//!
//! Converts between comma-separated text and [`Table`]. The first record is
//! the header with the column names. Fields may be double-quoted, with `""`
//! standing for a literal quote; quoted fields may span lines.

use super::table::Table;
use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Read a table from CSV text
pub fn read<R: Read>(mut reader: R) -> Result<Table> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| Error::Load(format!("unable to read CSV data: {}", e)))?;

    let mut records = parse_records(&text)?.into_iter();
    let columns = records
        .next()
        .ok_or_else(|| Error::Load("CSV data has no header line".to_string()))?;

    let mut rows = Vec::new();
    for (line, mut cells) in records.enumerate() {
        if cells.len() > columns.len() {
            return Err(Error::Load(format!(
                "record {} has {} values but the header has {} columns",
                line + 2,
                cells.len(),
                columns.len()
            )));
        }
        cells.resize(columns.len(), String::new());
        rows.push(cells);
    }

    Table::new(columns, rows)
}

/// Write a table as CSV text, snapshotting one row at a time
pub fn write<W: Write>(mut writer: W, table: &Table) -> Result<()> {
    write_record(&mut writer, table.columns())?;
    for row in table {
        let cells = row.snapshot();
        write_record(&mut writer, &cells)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_record<W: Write>(writer: &mut W, cells: &[String]) -> Result<()> {
    // A lone empty cell would otherwise read back as a blank line
    if let [cell] = cells {
        if cell.is_empty() {
            writeln!(writer, "\"\"")?;
            return Ok(());
        }
    }

    let line = cells
        .iter()
        .map(|cell| quote(cell))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{}", line)?;
    Ok(())
}

fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) || cell.trim() != cell {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Split CSV text into records, skipping blank lines
fn parse_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.trim().is_empty() && !quoted => {
                field.clear();
                quoted = true;
                in_quotes = true;
            }
            ',' => record.push(finish_field(&mut field, &mut quoted)),
            '\r' if chars.peek() == Some(&'\n') => {}
            c if quoted && c != '\n' && c.is_whitespace() => {}
            '\n' => {
                let blank = is_blank(&record, &field, quoted);
                record.push(finish_field(&mut field, &mut quoted));
                if !blank {
                    records.push(std::mem::take(&mut record));
                }
                record.clear();
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(Error::Load(format!(
            "unterminated quoted field in record {}",
            records.len() + 1
        )));
    }

    if !field.is_empty() || !record.is_empty() || quoted {
        let blank = is_blank(&record, &field, quoted);
        record.push(finish_field(&mut field, &mut quoted));
        if !blank {
            records.push(record);
        }
    }

    Ok(records)
}

fn finish_field(field: &mut String, quoted: &mut bool) -> String {
    let value = if *quoted {
        std::mem::take(field)
    } else {
        let trimmed = field.trim().to_string();
        field.clear();
        trimmed
    };
    *quoted = false;
    value
}

/// A line with no separators, no quotes and nothing but whitespace
fn is_blank(record: &[String], field: &str, quoted: bool) -> bool {
    record.is_empty() && !quoted && field.trim().is_empty()
}
