//! Catalog module
//!
//! This module contains the table cache and the sources tables are loaded from.

pub mod cache;
pub mod remote;
pub mod source;

pub use cache::TableCache;
pub use remote::SourceUrl;
pub use source::{is_remote, SourceLoader, TableSource};
