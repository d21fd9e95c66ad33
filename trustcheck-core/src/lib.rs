//! Trustcheck core library exports
//!
//! Trust levels are integer qualifiers attached to classes, type uses and
//! method declarations. The verifier walks an attributed program and reports
//! every call whose receiver (or argument) is less trusted than the callee
//! requires.

pub mod config;
pub mod error;
pub mod lattice;
pub mod oracle;
pub mod program;
pub mod qual;
pub mod verifier;

pub use config::VerifierConfig;
pub use error::ProgramError;
pub use lattice::{QualifierHierarchy, TrustHierarchy};
pub use oracle::{AttributionOracle, ProgramOracle};
pub use program::Program;
pub use qual::{QualifierKind, QualifierRegistry, TrustLevel, TrustQualifier};
pub use verifier::{Diagnostic, DiagnosticSink, TrustVerifier, VerificationReport, Violation};
