//! Command dispatch for SQL-Air
//!
//! The engine is the single entry point used by the server and the CLI: it
//! parses command text, resolves the target table through the cache and runs
//! the matching executor operation.

use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use super::executor;
use crate::catalog::TableCache;
use crate::error::Result;
use crate::sql::{Parser, Statement};

/// Execution engine shared by every connection
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    cache: Arc<TableCache>,
}

impl ExecutionEngine {
    /// Create an engine over the given table cache
    pub fn new(cache: Arc<TableCache>) -> Self {
        Self { cache }
    }

    /// The table cache used by this engine
    pub fn cache(&self) -> &Arc<TableCache> {
        &self.cache
    }

    /// Parse and run one command, writing its textual result to `out`
    pub fn process(&self, query: &str, out: &mut dyn Write) -> Result<()> {
        let stmt = Parser::new(query).parse()?;
        self.execute(stmt, out)
    }

    /// Run an already parsed command
    pub fn execute(&self, stmt: Statement, out: &mut dyn Write) -> Result<()> {
        debug!(?stmt, "executing");

        match stmt {
            Statement::Select(stmt) => {
                let table = self.cache.resolve(&stmt.source)?;
                executor::select(&table, &stmt, out)?;
            }
            Statement::Update(stmt) => {
                let table = self.cache.resolve(&stmt.source)?;
                executor::update(&table, &stmt, out)?;
            }
            Statement::Insert(stmt) => {
                executor::insert(&stmt)?;
            }
            Statement::Delete(stmt) => {
                executor::delete(&stmt)?;
            }
            Statement::Save => {
                let path = self.cache.save_recent()?;
                writeln!(out, "{} saved.", path)?;
            }
        }

        Ok(())
    }
}
