//! Trust qualifiers - the annotation values the checker reasons about
//!
//! All three annotation shapes reduce to "an element with an integer level".
//! They differ only in where they may legally appear, which is captured by
//! [`QualifierKind::targets`].

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod registry;

pub use registry::QualifierRegistry;

/// Integer trust level. Higher numbers represent higher trust.
pub type TrustLevel = i32;

/// Level used when a qualifier is written without one
pub const DEFAULT_LEVEL: TrustLevel = 0;

/// The closed set of trust annotation shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualifierKind {
    /// Root qualifier of the hierarchy, usable on type uses and type parameters
    Trust,
    /// Type-use qualifier with an explicit level (e.g. on a `this` receiver)
    TrustType,
    /// Declaration-site minimum level required to invoke or access a member
    TrustRequirement,
}

/// Syntactic positions an annotation can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementTarget {
    /// A class declaration
    Type,
    /// Any use of a type, including receiver types
    TypeUse,
    TypeParameter,
    Method,
    Constructor,
    Field,
}

impl QualifierKind {
    pub const ALL: [QualifierKind; 3] = [
        QualifierKind::Trust,
        QualifierKind::TrustType,
        QualifierKind::TrustRequirement,
    ];

    /// Annotation name as written in source
    pub fn name(self) -> &'static str {
        match self {
            QualifierKind::Trust => "Trust",
            QualifierKind::TrustType => "TrustType",
            QualifierKind::TrustRequirement => "TrustReq",
        }
    }

    /// Element targets this kind of qualifier may be attached to
    pub fn targets(self) -> &'static [ElementTarget] {
        match self {
            QualifierKind::Trust => &[
                ElementTarget::Type,
                ElementTarget::TypeUse,
                ElementTarget::TypeParameter,
            ],
            QualifierKind::TrustType => &[ElementTarget::Type, ElementTarget::TypeUse],
            QualifierKind::TrustRequirement => &[
                ElementTarget::Method,
                ElementTarget::Constructor,
                ElementTarget::Field,
            ],
        }
    }

    pub fn permits(self, target: ElementTarget) -> bool {
        self.targets().contains(&target)
    }

    /// Whether this kind can describe the trust of a type (as opposed to a
    /// requirement declared on a member)
    pub fn is_type_qualifier(self) -> bool {
        matches!(self, QualifierKind::Trust | QualifierKind::TrustType)
    }
}

impl fmt::Display for QualifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

impl fmt::Display for ElementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementTarget::Type => "type",
            ElementTarget::TypeUse => "type use",
            ElementTarget::TypeParameter => "type parameter",
            ElementTarget::Method => "method",
            ElementTarget::Constructor => "constructor",
            ElementTarget::Field => "field",
        };
        f.write_str(name)
    }
}

/// An immutable trust annotation instance.
///
/// Two qualifiers are the same annotation iff both kind and level match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrustQualifier {
    kind: QualifierKind,
    level: TrustLevel,
}

impl TrustQualifier {
    pub const fn new(kind: QualifierKind, level: TrustLevel) -> Self {
        Self { kind, level }
    }

    /// The default qualifier: `@Trust(level = 0)`
    pub const fn root() -> Self {
        Self::new(QualifierKind::Trust, DEFAULT_LEVEL)
    }

    pub const fn trust(level: TrustLevel) -> Self {
        Self::new(QualifierKind::Trust, level)
    }

    pub const fn trust_type(level: TrustLevel) -> Self {
        Self::new(QualifierKind::TrustType, level)
    }

    pub const fn requirement(level: TrustLevel) -> Self {
        Self::new(QualifierKind::TrustRequirement, level)
    }

    pub fn kind(&self) -> QualifierKind {
        self.kind
    }

    pub fn level(&self) -> TrustLevel {
        self.level
    }
}

impl Default for TrustQualifier {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for TrustQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(level = {})", self.kind, self.level)
    }
}
