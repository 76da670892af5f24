//! Storage module
//!
//! This module contains the in-memory table representation:
//! - Rows with per-row locks
//! - Tables with a change notification for waiting queries
//! - The CSV codec used to load and save tables

pub mod csv;
pub mod row;
pub mod table;

pub use row::Row;
pub use table::Table;
