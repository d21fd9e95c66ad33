//! Invocation verifier - enforces trust levels at call sites
//!
//! For every call whose callee declares a trust level, the receiver (and,
//! unless disabled, each argument) must be at least that trusted. Elements
//! with no trust qualifier are never flagged: an unannotated value is
//! unknown, not level 0.
//!
//! Variable declarations inherit the qualifier of their declared class. The
//! inherited type is kept in an overlay owned by the verifier, so the oracle
//! is never mutated and later lookups of the same variable see it.

use crate::config::VerifierConfig;
use crate::oracle::AttributionOracle;
use crate::program::{AnnotatedType, CallExpr, Expr, MethodId, Program, Stmt, VarId};
use crate::qual::{ElementTarget, QualifierKind, QualifierRegistry, TrustLevel};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub mod diagnostic;


pub use diagnostic::{CallSite, Diagnostic, DiagnosticSink, Violation};

/// Numeric call-site policy: `available` satisfies `required` when it is at
/// least as high. Unrelated to [`crate::lattice::QualifierHierarchy`].
pub fn meets_requirement(available: TrustLevel, required: TrustLevel) -> bool {
    available >= required
}

/// Results of verifying one program
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub program: String,
    pub diagnostics: Vec<Diagnostic>,
    pub calls_checked: usize,
    pub declarations_refined: usize,
}

impl VerificationReport {
    /// True when no diagnostic was emitted
    pub fn passed(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub struct TrustVerifier<'o, O: AttributionOracle> {
    oracle: &'o O,
    registry: QualifierRegistry,
    config: VerifierConfig,
    /// Variable types after class-level propagation
    refined: HashMap<VarId, AnnotatedType>,
    /// Declared levels of methods, filled by `index_methods`
    method_levels: HashMap<MethodId, TrustLevel>,
    calls_checked: usize,
}

impl<'o, O: AttributionOracle> TrustVerifier<'o, O> {
    pub fn new(oracle: &'o O, config: VerifierConfig) -> Self {
        Self {
            oracle,
            registry: config.registry(),
            config,
            refined: HashMap::new(),
            method_levels: HashMap::new(),
            calls_checked: 0,
        }
    }

    pub fn registry(&self) -> &QualifierRegistry {
        &self.registry
    }

    /// Trust level carried by a type, if it has an active qualifier
    pub fn level_of(&self, ty: &AnnotatedType) -> Option<TrustLevel> {
        self.registry.admit(ty.primary()).map(|q| q.level())
    }

    /// Level a method demands of its callers.
    ///
    /// When the type's own qualifier is inactive, the active qualifier on the
    /// method's receiver still applies.
    fn declared_level(&self, method: MethodId, ty: &AnnotatedType) -> Option<TrustLevel> {
        self.level_of(ty).or_else(|| {
            QualifierKind::ALL
                .into_iter()
                .filter(|kind| self.registry.permits(*kind, ElementTarget::TypeUse))
                .find_map(|kind| self.oracle.declared_qualifier_of(method, kind))
                .map(|q| q.level())
        })
    }

    /// Record the declared level of every method that has one
    pub fn index_methods(&mut self, program: &Program) {
        for method in program.method_ids() {
            let ty = self.oracle.method_type(method);
            if let Some(level) = self.declared_level(method, &ty) {
                self.method_levels.insert(method, level);
            }
        }
        debug!("Indexed {} methods with a trust level", self.method_levels.len());
    }

    /// The variable's type, including any propagated class qualifier
    pub fn effective_declaration_type(&self, var: VarId) -> AnnotatedType {
        match self.refined.get(&var) {
            Some(ty) => ty.clone(),
            None => self.oracle.declaration_type(var),
        }
    }

    fn expression_type(&self, expr: &Expr) -> AnnotatedType {
        match expr {
            Expr::Var { var, .. } => self.effective_declaration_type(*var),
            _ => self.oracle.expression_type(expr),
        }
    }

    fn required_level(&self, call: &CallExpr, invoked: &AnnotatedType) -> Option<TrustLevel> {
        match self.method_levels.get(&call.method) {
            Some(level) => Some(*level),
            None => self.declared_level(call.method, invoked),
        }
    }

    /// Check one call expression against its callee's required level
    pub fn check_call_expression(&mut self, call: &CallExpr, sink: &mut dyn DiagnosticSink) {
        self.calls_checked += 1;

        let invoked = self.oracle.invoked_type(call);
        let Some(required) = self.required_level(call, &invoked) else {
            return;
        };

        if let Some(receiver) = self.oracle.receiver_of(call) {
            self.check_site(&invoked, receiver, CallSite::Receiver, required, sink);
        }

        if self.config.check_arguments {
            for (index, argument) in call.arguments.iter().enumerate() {
                self.check_site(&invoked, argument, CallSite::Argument(index), required, sink);
            }
        }
    }

    fn check_site(
        &self,
        invoked: &AnnotatedType,
        expr: &Expr,
        site: CallSite,
        required: TrustLevel,
        sink: &mut dyn DiagnosticSink,
    ) {
        let Some(found) = self.level_of(&self.expression_type(expr)) else {
            debug!("{} of {} has no trust level, skipping", site, invoked.name());
            return;
        };

        if meets_requirement(found, required) {
            debug!(
                "{} of {} has level {} (requires {})",
                site,
                invoked.name(),
                found,
                required
            );
            return;
        }

        let diagnostic = Diagnostic {
            violation: Violation::TrustLevelTooLow { found, required },
            site,
            callee: invoked.name().to_string(),
            position: expr.position(),
        };
        warn!("{}", diagnostic);
        sink.report(diagnostic);
    }

    /// Propagate the declared class's qualifier onto a variable.
    ///
    /// Returns the refined type when the variable's own qualifier was missing
    /// or had a different level.
    pub fn check_variable_declaration(&mut self, var: VarId) -> Option<AnnotatedType> {
        let class_type = self.oracle.declared_class_type(var);
        let class_qualifier = self
            .registry
            .admit(class_type.primary())
            .filter(|q| q.kind().is_type_qualifier())?;

        let current = self.effective_declaration_type(var);
        let current_level = self.level_of(&current);
        if current_level == Some(class_qualifier.level()) {
            return None;
        }

        let refined = current.with_primary(class_qualifier);
        debug!("Propagated {} onto declaration of type {}", class_qualifier, current.name());
        self.refined.insert(var, refined.clone());
        Some(refined)
    }

    /// Verify a whole program in one depth-first pass.
    ///
    /// Each call starts from a clean overlay and counters.
    pub fn verify(&mut self, program: &Program) -> VerificationReport {
        self.refined.clear();
        self.method_levels.clear();
        self.calls_checked = 0;

        if self.config.index_methods {
            self.index_methods(program);
        }

        let mut diagnostics = Vec::new();
        for class in &program.classes {
            for field in &class.fields {
                self.visit_variable(program, *field, &mut diagnostics);
            }
            for method in class.constructors.iter().chain(&class.methods) {
                self.visit_method(program, *method, &mut diagnostics);
            }
        }

        let report = VerificationReport {
            program: program.name.clone(),
            diagnostics,
            calls_checked: self.calls_checked,
            declarations_refined: self.refined.len(),
        };

        info!(
            "Verified '{}': {} calls checked, {} declarations refined, {} violations",
            report.program,
            report.calls_checked,
            report.declarations_refined,
            report.diagnostics.len()
        );
        report
    }

    fn visit_method(&mut self, program: &Program, method: MethodId, sink: &mut dyn DiagnosticSink) {
        let decl = program.method(method);
        for param in &decl.params {
            self.visit_variable(program, *param, sink);
        }
        for stmt in &decl.body {
            match stmt {
                Stmt::Local(var) => self.visit_variable(program, *var, sink),
                Stmt::Expr(expr) => self.visit_expr(expr, sink),
            }
        }
    }

    fn visit_variable(&mut self, program: &Program, var: VarId, sink: &mut dyn DiagnosticSink) {
        self.check_variable_declaration(var);
        if let Some(init) = &program.variable(var).init {
            self.visit_expr(init, sink);
        }
    }

    fn visit_expr(&mut self, expr: &Expr, sink: &mut dyn DiagnosticSink) {
        if let Expr::Call(call) = expr {
            self.check_call_expression(call, sink);
            if let Some(receiver) = &call.receiver {
                self.visit_expr(receiver, sink);
            }
            for argument in &call.arguments {
                self.visit_expr(argument, sink);
            }
        }
    }
}
