//! SQL-Air - a lightweight concurrent CSV table store
//!
//! This library provides the components of a small SQL-like data server:
//! - Command parsing (AST, nom parser)
//! - In-memory tables with per-row locking and change notification
//! - A table cache keyed by file path or URL
//! - Query execution with blocking "wait until a row matches" semantics
//! - A bounded-concurrency HTTP server

pub mod catalog;
pub mod error;
pub mod executor;
pub mod server;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
