//! Diagnostics emitted by the verifier

use crate::program::Position;
use crate::qual::TrustLevel;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The kinds of violation the verifier can find
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A receiver or argument is less trusted than the callee requires
    #[error("trust level {found} is lower than the required level {required}")]
    TrustLevelTooLow {
        found: TrustLevel,
        required: TrustLevel,
    },
}

impl Violation {
    /// Stable message key
    pub fn key(&self) -> &'static str {
        match self {
            Violation::TrustLevelTooLow { .. } => "trust.level.too.low",
        }
    }
}

/// Which part of a call a diagnostic points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSite {
    Receiver,
    Argument(usize),
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Receiver => f.write_str("receiver"),
            CallSite::Argument(index) => write!(f, "argument {index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub violation: Violation,
    pub site: CallSite,
    /// Qualified name of the invoked method
    pub callee: String,
    pub position: Position,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: error: ({}) {} of call to {}: {}",
            self.position,
            self.violation.key(),
            self.site,
            self.callee,
            self.violation
        )
    }
}

/// Destination for reported diagnostics
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
