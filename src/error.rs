//! Error types for SQL-Air
//!
//! This module defines all error types used throughout the table engine.

use thiserror::Error;

/// The main error type for SQL-Air
#[derive(Error, Debug)]
pub enum Error {
    // ========== Parser Errors ==========
    #[error("Parse error: unexpected input '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    // ========== Cache Errors ==========
    #[error("No CSV source specified and no CSV was previously loaded")]
    NoSource,

    // ========== Schema Errors ==========
    #[error("Schema error: {0}")]
    SchemaMismatch(String),

    // ========== Execution Errors ==========
    #[error("{0}")]
    UnsupportedOperation(String),

    // ========== Source Errors ==========
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Load error: {0}")]
    Load(String),

    // ========== Configuration Errors ==========
    #[error("Config error: {0}")]
    Config(String),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for SQL-Air operations
pub type Result<T> = std::result::Result<T, Error>;
