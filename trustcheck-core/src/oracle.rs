//! Attribution oracle - annotated types for the nodes the verifier visits
//!
//! The verifier never computes types itself. It asks an [`AttributionOracle`]
//! and only reads the primary qualifier of what comes back.

use crate::program::{AnnotatedType, CallExpr, Expr, MethodId, Program, VarId};
use crate::qual::{QualifierKind, TrustQualifier};

pub trait AttributionOracle {
    /// Attributed type of a method or constructor declaration
    fn method_type(&self, method: MethodId) -> AnnotatedType;

    /// Attributed type of the method invoked by `call`
    fn invoked_type(&self, call: &CallExpr) -> AnnotatedType {
        self.method_type(call.method)
    }

    fn expression_type(&self, expr: &Expr) -> AnnotatedType;

    /// Type named in a variable declaration, as declared by its class
    fn declared_class_type(&self, var: VarId) -> AnnotatedType;

    /// The variable's own annotated type
    fn declaration_type(&self, var: VarId) -> AnnotatedType;

    /// Declaration-site qualifier of `kind` on a method, if present
    fn declared_qualifier_of(
        &self,
        method: MethodId,
        kind: QualifierKind,
    ) -> Option<TrustQualifier>;

    fn receiver_of<'c>(&self, call: &'c CallExpr) -> Option<&'c Expr> {
        call.receiver.as_deref()
    }
}

/// Oracle over a loaded [`Program`]
#[derive(Debug, Clone, Copy)]
pub struct ProgramOracle<'p> {
    program: &'p Program,
}

impl<'p> ProgramOracle<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// A class name used as a type, carrying the class-level qualifier.
    /// Names outside the program (`int`, `String`, ...) are unannotated.
    fn class_type(&self, name: &str) -> AnnotatedType {
        match self.program.class_named(name) {
            Some(id) => AnnotatedType::new(name, self.program.class(id).qualifier),
            None => AnnotatedType::unannotated(name),
        }
    }
}

impl AttributionOracle for ProgramOracle<'_> {
    fn method_type(&self, method: MethodId) -> AnnotatedType {
        let decl = self.program.method(method);
        let primary = self
            .declared_qualifier_of(method, QualifierKind::TrustRequirement)
            .or(decl.receiver);
        AnnotatedType::new(self.program.method_name(method), primary)
    }

    fn expression_type(&self, expr: &Expr) -> AnnotatedType {
        match expr {
            Expr::Var { var, .. } => self.declaration_type(*var),
            Expr::This {
                class, qualifier, ..
            } => {
                let ty = self.class_type(&self.program.class(*class).name);
                match qualifier {
                    Some(q) => ty.with_primary(*q),
                    None => ty,
                }
            }
            Expr::Literal { type_name, .. } => AnnotatedType::unannotated(type_name.clone()),
            Expr::Call(call) => {
                let method = self.program.method(call.method);
                if method.is_constructor() {
                    self.class_type(&self.program.class(method.owner).name)
                } else {
                    method.return_type.clone()
                }
            }
        }
    }

    fn declared_class_type(&self, var: VarId) -> AnnotatedType {
        self.class_type(&self.program.variable(var).type_name)
    }

    fn declaration_type(&self, var: VarId) -> AnnotatedType {
        let decl = self.program.variable(var);
        AnnotatedType::new(decl.type_name.clone(), decl.qualifier)
    }

    fn declared_qualifier_of(
        &self,
        method: MethodId,
        kind: QualifierKind,
    ) -> Option<TrustQualifier> {
        let decl = self.program.method(method);
        [decl.requirement, decl.receiver]
            .into_iter()
            .flatten()
            .find(|q| q.kind() == kind)
    }
}
