//! Parses a line of input into an [`Statement`], rejecting malformed input
//! before it ever reaches the storage layer.

use std::fmt;

use crate::storage::{Row, RowError};

#[derive(Debug)]
pub enum Statement {
    Insert(Row),
    Select,
}

#[derive(Debug)]
pub enum PrepareError {
    Syntax,
    NegativeId,
    StringTooLong,
    Unrecognized(String),
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrepareError::Syntax => write!(f, "Syntax error. Could not parse statement."),
            PrepareError::NegativeId => write!(f, "ID must be positive."),
            PrepareError::StringTooLong => write!(f, "String is too long."),
            PrepareError::Unrecognized(line) => {
                write!(f, "Unrecognized keyword at start of '{line}'.")
            }
        }
    }
}

pub fn prepare(line: &str) -> Result<Statement, PrepareError> {
    if line.starts_with("insert") {
        prepare_insert(line)
    } else if line == "select" {
        Ok(Statement::Select)
    } else {
        Err(PrepareError::Unrecognized(line.to_string()))
    }
}

fn prepare_insert(line: &str) -> Result<Statement, PrepareError> {
    let mut parts = line.split_whitespace();
    parts.next(); // "insert"

    let id_str = parts.next().ok_or(PrepareError::Syntax)?;
    let username = parts.next().ok_or(PrepareError::Syntax)?;
    let email = parts.next().ok_or(PrepareError::Syntax)?;
    if parts.next().is_some() {
        return Err(PrepareError::Syntax);
    }

    let id: i64 = id_str.parse().map_err(|_| PrepareError::Syntax)?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    if id > u32::MAX as i64 {
        return Err(PrepareError::Syntax);
    }

    let row = Row::new(id as u32, username, email).map_err(|e| match e {
        RowError::StringTooLong => PrepareError::StringTooLong,
    })?;
    Ok(Statement::Insert(row))
}
