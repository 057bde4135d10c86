// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use serde::{Deserialize, Serialize};

pub type Result<T> = core::result::Result<T, Error>;

/// Faults raised by the matcher, the dynamic context, and the auditor.
///
/// Only `Match` is recoverable; `test` converts it to `false`. The other
/// variants signal programming errors and are never downgraded to booleans.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value failed structural validation.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The pattern itself is malformed (empty `OneOf`, non-scalar literal).
    #[error("Bad pattern: {0}")]
    InvalidPattern(String),

    /// A context accessor was used outside a logical execution context, or
    /// an audited call left arguments unchecked.
    #[error("{0}")]
    Usage(String),

    /// A failure from user code crossing the propagation boundary.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn is_match_failure(&self) -> bool {
        matches!(self, Error::Match(_))
    }
}

/// A structural mismatch, carrying the path to the offending value.
///
/// The path starts empty at the failure site and is prefixed with each
/// enclosing key or index as the failure unwinds, e.g. `vals[3].entity.created`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchError {
    pub(crate) message: String,
    pub(crate) path: String,
}

impl MatchError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: String::new(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The sanitized form suitable for a remote-procedure boundary. Internal
    /// detail (message, path) is deliberately withheld.
    pub fn sanitized(&self) -> WireError {
        WireError {
            error: ErrorCode::Number(400),
            reason: Some("Match failed".into()),
            details: None,
        }
    }
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Match error: {}", self.message)?;
        if !self.path.is_empty() {
            write!(f, " in field {}", self.path)?;
        }
        Ok(())
    }
}

impl core::error::Error for MatchError {}

/// The wire representation of a validation fault: `{error, reason?, details?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub error: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error codes are a string or a number on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    String(String),
}

impl From<&MatchError> for WireError {
    fn from(err: &MatchError) -> Self {
        err.sanitized()
    }
}
