//! SQL-Air command parser
//!
//! This module parses command text into a [`Statement`]:
//!
//! ```text
//! select [wait] <cols|*> [from <source>] [where <col> <op> <value>]
//! update [wait] [<source>] set <col> = <value>, ... [where <col> <op> <value>]
//! insert [wait] into [<source>] (<cols>) values (<values>)
//! delete [wait] from [<source>] [where <col> <op> <value>]
//! save
//! ```

use super::ast::*;
use crate::error::{Error, Result};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{all_consuming, cut, map, not, opt, value},
    error::ErrorKind,
    multi::separated_list1,
    sequence::{delimited, preceded, separated_pair, terminated, tuple},
    IResult,
};

/// Characters that end a bare word
const DELIMITERS: &str = ",()=<>!;\"'";

/// Characters that end a bare source; `=` may appear in a URL query string
const SOURCE_DELIMITERS: &str = ",();\"'";

/// SQL-Air parser
pub struct Parser<'a> {
    input: &'a str,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given command text
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Parse a single command
    pub fn parse(&self) -> Result<Statement> {
        if self.input.trim().is_empty() {
            return Err(Error::UnexpectedEof("a command".to_string()));
        }

        let mut command = all_consuming(terminated(
            alt((select, update, insert, delete, save)),
            opt(ws(char(';'))),
        ));

        match command(self.input) {
            Ok((_, stmt)) => Ok(stmt),
            Err(nom::Err::Incomplete(_)) => Err(Error::UnexpectedEof("more input".to_string())),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(self.describe_error(e.input, e.code))
            }
        }
    }

    fn describe_error(&self, rest: &str, code: ErrorKind) -> Error {
        let rest = rest.trim_start();
        let expected = if rest == self.input.trim_start() {
            "SELECT, UPDATE, INSERT, DELETE, or SAVE"
        } else {
            match code {
                ErrorKind::Eof => "end of command",
                ErrorKind::TakeWhile1 | ErrorKind::IsNot => "a name or value",
                ErrorKind::Char => "a symbol",
                ErrorKind::Tag => "a keyword or operator",
                _ => "valid SQL-Air syntax",
            }
        };

        match rest.split_whitespace().next() {
            Some(found) => Error::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
            },
            None => Error::UnexpectedEof(expected.to_string()),
        }
    }
}

/// Parse command text into a statement
pub fn parse(input: &str) -> Result<Statement> {
    Parser::new(input).parse()
}

// ========== Lexical helpers ==========

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive keyword that is not the prefix of a longer word
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), not(satisfy(is_word_char)))
}

fn quoted(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('"'), opt(is_not("\"")), char('"')),
            delimited(char('\''), opt(is_not("'")), char('\'')),
        )),
        |s: Option<&str>| s.unwrap_or_default().to_string(),
    )(input)
}

fn bare_until<'a>(delimiters: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    map(
        take_while1(move |c: char| !c.is_whitespace() && !delimiters.contains(c)),
        String::from,
    )
}

/// A column name or literal: quoted or bare
fn word(input: &str) -> IResult<&str, String> {
    ws(alt((quoted, bare_until(DELIMITERS))))(input)
}

/// A file path or URL
fn source(input: &str) -> IResult<&str, String> {
    ws(alt((quoted, bare_until(SOURCE_DELIMITERS))))(input)
}

fn word_list(input: &str) -> IResult<&str, Vec<String>> {
    separated_list1(ws(char(',')), word)(input)
}

fn parenthesized(input: &str) -> IResult<&str, Vec<String>> {
    delimited(ws(char('(')), word_list, ws(char(')')))(input)
}

fn wait_flag(input: &str) -> IResult<&str, bool> {
    map(opt(ws(keyword("wait"))), |w| w.is_some())(input)
}

fn operator(input: &str) -> IResult<&str, Operator> {
    ws(alt((
        value(Operator::Eq, tag("==")),
        value(Operator::NotEq, tag("!=")),
        value(Operator::NotEq, tag("<>")),
        value(Operator::LtEq, tag("<=")),
        value(Operator::GtEq, tag(">=")),
        value(Operator::Eq, tag("=")),
        value(Operator::Lt, tag("<")),
        value(Operator::Gt, tag(">")),
        value(Operator::Like, keyword("like")),
    )))(input)
}

fn predicate(input: &str) -> IResult<&str, Predicate> {
    map(
        preceded(ws(keyword("where")), cut(tuple((word, operator, word)))),
        |(column, op, value)| Predicate { column, op, value },
    )(input)
}

// ========== Statements ==========

fn select(input: &str) -> IResult<&str, Statement> {
    preceded(ws(keyword("select")), cut(select_body))(input)
}

fn select_body(input: &str) -> IResult<&str, Statement> {
    let projection = alt((
        value(Projection::All, ws(char('*'))),
        map(word_list, Projection::Columns),
    ));

    map(
        tuple((
            wait_flag,
            projection,
            opt(preceded(ws(keyword("from")), source)),
            opt(predicate),
        )),
        |(must_wait, columns, source, predicate)| {
            Statement::Select(SelectStatement {
                source: source.unwrap_or_default(),
                columns,
                predicate,
                must_wait,
            })
        },
    )(input)
}

fn update(input: &str) -> IResult<&str, Statement> {
    preceded(ws(keyword("update")), cut(update_body))(input)
}

fn update_body(input: &str) -> IResult<&str, Statement> {
    let assignment = map(separated_pair(word, ws(char('=')), word), |(column, value)| {
        Assignment { column, value }
    });

    map(
        tuple((
            wait_flag,
            opt(preceded(not(ws(keyword("set"))), source)),
            preceded(ws(keyword("set")), separated_list1(ws(char(',')), assignment)),
            opt(predicate),
        )),
        |(must_wait, source, assignments, predicate)| {
            Statement::Update(UpdateStatement {
                source: source.unwrap_or_default(),
                assignments,
                predicate,
                must_wait,
            })
        },
    )(input)
}

fn insert(input: &str) -> IResult<&str, Statement> {
    preceded(ws(keyword("insert")), cut(insert_body))(input)
}

fn insert_body(input: &str) -> IResult<&str, Statement> {
    map(
        tuple((
            wait_flag,
            preceded(ws(keyword("into")), opt(source)),
            parenthesized,
            preceded(ws(keyword("values")), parenthesized),
        )),
        |(must_wait, source, columns, values)| {
            Statement::Insert(InsertStatement {
                source: source.unwrap_or_default(),
                columns,
                values,
                must_wait,
            })
        },
    )(input)
}

fn delete(input: &str) -> IResult<&str, Statement> {
    preceded(ws(keyword("delete")), cut(delete_body))(input)
}

fn delete_body(input: &str) -> IResult<&str, Statement> {
    map(
        tuple((
            wait_flag,
            preceded(
                ws(keyword("from")),
                opt(preceded(not(ws(keyword("where"))), source)),
            ),
            opt(predicate),
        )),
        |(must_wait, source, predicate)| {
            Statement::Delete(DeleteStatement {
                source: source.unwrap_or_default(),
                predicate,
                must_wait,
            })
        },
    )(input)
}

fn save(input: &str) -> IResult<&str, Statement> {
    value(Statement::Save, ws(keyword("save")))(input)
}
