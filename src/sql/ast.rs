//! Abstract Syntax Tree for SQL-Air commands
//!
//! These are the already-validated query parameters handed to the executor.

use std::cmp::Ordering;
use std::fmt;

/// A parsed SQL-Air command
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Insert(InsertStatement),
    Delete(DeleteStatement),
    Save,
}

/// Column list of a select
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`: every column in schema order
    All,
    /// Named columns in request order
    Columns(Vec<String>),
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Source identifier, empty for the most recently used one
    pub source: String,
    pub columns: Projection,
    pub predicate: Option<Predicate>,
    /// Block until at least one row matches
    pub must_wait: bool,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Source identifier, empty for the most recently used one
    pub source: String,
    pub assignments: Vec<Assignment>,
    pub predicate: Option<Predicate>,
    /// Block until at least one row is updated
    pub must_wait: bool,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub source: String,
    pub columns: Vec<String>,
    pub values: Vec<String>,
    pub must_wait: bool,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub source: String,
    pub predicate: Option<Predicate>,
    pub must_wait: bool,
}

/// `column = value` in an UPDATE
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: String,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Single-column WHERE condition
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: Operator,
    pub value: String,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality predicate
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, Operator::Eq, value)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Substring match
    Like,
}

impl Operator {
    /// Compare a cell against a literal.
    ///
    /// Equality is exact string equality. Ordering operators compare as
    /// numbers when both sides parse as one, as strings otherwise.
    pub fn matches(self, cell: &str, literal: &str) -> bool {
        match self {
            Operator::Eq => cell == literal,
            Operator::NotEq => cell != literal,
            Operator::Like => cell.contains(literal),
            Operator::Lt => compare(cell, literal) == Ordering::Less,
            Operator::LtEq => compare(cell, literal) != Ordering::Greater,
            Operator::Gt => compare(cell, literal) == Ordering::Greater,
            Operator::GtEq => compare(cell, literal) != Ordering::Less,
        }
    }
}

fn compare(cell: &str, literal: &str) -> Ordering {
    match (cell.trim().parse::<f64>(), literal.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => cell.cmp(literal),
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Like => "LIKE",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.column, self.op, self.value)
    }
}
