//! Attributed program model
//!
//! A loaded program is a set of arenas indexed by [`ClassId`], [`MethodId`]
//! and [`VarId`]. Names are resolved during loading, so every reference in a
//! method body points directly at its declaration. The model is immutable
//! once built.

use crate::qual::TrustQualifier;
use serde::Serialize;
use std::fmt;

pub mod loader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

/// Source position, used only when reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A type together with its primary trust qualifier, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedType {
    name: String,
    primary: Option<TrustQualifier>,
}

impl AnnotatedType {
    pub fn new(name: impl Into<String>, primary: Option<TrustQualifier>) -> Self {
        Self {
            name: name.into(),
            primary,
        }
    }

    pub fn unannotated(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary(&self) -> Option<TrustQualifier> {
        self.primary
    }

    /// Copy of this type with `qualifier` as its primary annotation
    pub fn with_primary(&self, qualifier: TrustQualifier) -> Self {
        Self {
            name: self.name.clone(),
            primary: Some(qualifier),
        }
    }
}

impl fmt::Display for AnnotatedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.primary {
            Some(q) => write!(f, "{} {}", q, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    /// Class-level qualifier, inherited by variables declared with this type
    pub qualifier: Option<TrustQualifier>,
    pub fields: Vec<VarId>,
    pub constructors: Vec<MethodId>,
    pub methods: Vec<MethodId>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Constructor,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub owner: ClassId,
    pub kind: MethodKind,
    pub is_static: bool,
    /// Declaration-site `@TrustReq`
    pub requirement: Option<TrustQualifier>,
    /// Type-use qualifier on the `this` receiver
    pub receiver: Option<TrustQualifier>,
    pub params: Vec<VarId>,
    pub return_type: AnnotatedType,
    pub body: Vec<Stmt>,
    pub position: Position,
}

impl MethodDecl {
    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Local,
    Field,
    Parameter,
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub name: String,
    pub kind: VariableKind,
    /// Name of the declared type; may be a class of this program or an
    /// external type such as `int`
    pub type_name: String,
    /// Explicit qualifier written on the declaration
    pub qualifier: Option<TrustQualifier>,
    pub init: Option<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Local(VarId),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Var {
        var: VarId,
        position: Position,
    },
    /// Explicit or implicit `this`, carrying the enclosing method's receiver
    /// qualifier
    This {
        class: ClassId,
        qualifier: Option<TrustQualifier>,
        position: Position,
    },
    Literal {
        type_name: String,
        position: Position,
    },
    Call(CallExpr),
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Expr::Var { position, .. }
            | Expr::This { position, .. }
            | Expr::Literal { position, .. } => *position,
            Expr::Call(call) => call.position,
        }
    }
}

/// A method or constructor invocation
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub method: MethodId,
    /// Absent for constructors and static methods
    pub receiver: Option<Box<Expr>>,
    pub arguments: Vec<Expr>,
    pub position: Position,
}

/// A fully resolved program
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub name: String,
    pub classes: Vec<ClassDecl>,
    pub methods: Vec<MethodDecl>,
    pub variables: Vec<VariableDecl>,
}

impl Program {
    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id.0]
    }

    pub fn method(&self, id: MethodId) -> &MethodDecl {
        &self.methods[id.0]
    }

    pub fn variable(&self, id: VarId) -> &VariableDecl {
        &self.variables[id.0]
    }

    pub fn class_named(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .map(ClassId)
    }

    /// Qualified name used in reports, e.g. `TrustLevelTwo.m3`
    pub fn method_name(&self, id: MethodId) -> String {
        let method = self.method(id);
        format!("{}.{}", self.class(method.owner).name, method.name)
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> {
        (0..self.methods.len()).map(MethodId)
    }
}
