//! Query execution module
//!
//! This module contains the row-level executor and the command dispatcher.

pub mod engine;
pub mod executor;

pub use engine::ExecutionEngine;
pub use executor::{delete, insert, select, update};
