//! Program loading errors with clear, actionable messages
//!
//! These only arise while turning a program description into the attributed
//! model. Verification itself never fails; see [`crate::verifier::Violation`]
//! for what it reports instead.

use crate::qual::{ElementTarget, QualifierKind};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgramError {
    /// Failed to read a program description file
    #[error("Failed to read program description from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The description is not valid YAML or does not match the expected shape
    #[error("Failed to parse program description '{program}'")]
    Parse {
        program: String,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Class '{name}' is declared more than once")]
    DuplicateClass { name: String },

    #[error("Unknown class '{name}' referenced in {context}")]
    UnknownClass { name: String, context: String },

    #[error("Cannot resolve variable '{name}' in {context}")]
    UnresolvedVariable { name: String, context: String },

    #[error("No method '{method}' taking {arity} argument(s) on class '{class}' (referenced in {context})")]
    UnresolvedMethod {
        class: String,
        method: String,
        arity: usize,
        context: String,
    },

    /// A call was made on something that is not an object of a known class
    #[error("Cannot invoke '{method}' on a value of type '{type_name}' in {context}")]
    NotAnObject {
        method: String,
        type_name: String,
        context: String,
    },

    /// A receiver was written for a call that cannot have one
    #[error("Call to '{method}' in {context} cannot have a receiver")]
    UnexpectedReceiver { method: String, context: String },

    /// An instance method was called with no object to call it on
    #[error("Call to instance method '{method}' in {context} has no receiver")]
    MissingReceiver { method: String, context: String },

    #[error("{kind} is not applicable to a {target} ({context})\n\n{kind} may only annotate: {allowed}")]
    MisplacedQualifier {
        kind: QualifierKind,
        target: ElementTarget,
        context: String,
        allowed: String,
    },
}

impl ProgramError {
    pub(crate) fn misplaced(kind: QualifierKind, target: ElementTarget, context: String) -> Self {
        let allowed = kind
            .targets()
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        ProgramError::MisplacedQualifier {
            kind,
            target,
            context,
            allowed,
        }
    }
}
