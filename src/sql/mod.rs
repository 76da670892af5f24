//! SQL-Air command language
//!
//! This module contains the command AST and its parser.

pub mod ast;
pub mod parser;

pub use ast::{
    Assignment, DeleteStatement, InsertStatement, Operator, Predicate, Projection,
    SelectStatement, Statement, UpdateStatement,
};
pub use parser::{parse, Parser};
