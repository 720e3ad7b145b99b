//! Error types for the ledger engine.

use crate::decimal::Money;
use crate::model::MemberId;
use std::fmt;
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while splitting, aggregating or settling.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed or missing input shape
    #[error("validation error: {0}")]
    Validation(String),

    /// Split amounts or percentages do not reconcile with the total
    #[error("imbalance: {0}")]
    Imbalance(String),

    /// Upstream data violates an internal invariant
    #[error("consistency error: {0}")]
    Consistency(String),

    /// Referenced group or record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A settlement would pay more than the payer currently owes
    #[error("amount {requested} exceeds pending debt of {member}; max payable: {outstanding}")]
    ExceedsDebt {
        member: MemberId,
        requested: Money,
        outstanding: Money,
    },

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// A row was rejected while running in strict mode
    #[error("row {row} rejected: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<LedgerError>,
    },
}

/// Stable category of a [`LedgerError`], suitable for mapping to response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Imbalance,
    Consistency,
    NotFound,
    ExceedsDebt,
    Io,
}

impl LedgerError {
    /// Returns the fixed category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::Imbalance(_) => ErrorKind::Imbalance,
            LedgerError::Consistency(_) => ErrorKind::Consistency,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::ExceedsDebt { .. } => ErrorKind::ExceedsDebt,
            LedgerError::Io(_) | LedgerError::Csv(_) => ErrorKind::Io,
            LedgerError::Row { source, .. } => source.kind(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub(crate) fn imbalance(message: impl Into<String>) -> Self {
        LedgerError::Imbalance(message.into())
    }

    pub(crate) fn consistency(message: impl Into<String>) -> Self {
        LedgerError::Consistency(message.into())
    }

    /// An amount computation left the representable decimal range.
    pub(crate) fn overflow(what: impl fmt::Display) -> Self {
        LedgerError::Validation(format!("{} is out of range", what))
    }
}
