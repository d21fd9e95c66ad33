//! Program description loader
//!
//! Reads a YAML description of classes, members and method bodies and lowers
//! it into the arena model, resolving every name on the way.
//!
//! ```yaml
//! classes:
//!   - name: TrustLevelTwo
//!     trust: { level: 2 }
//!     methods:
//!       - name: m3
//!         receiver: { level: 3 }
//!         params:
//!           - { name: val, type: int }
//!         returns: int
//!   - name: Basic
//!     methods:
//!       - name: test
//!         body:
//!           - let: { name: o, type: TrustLevelTwo, init: { new: { class: TrustLevelTwo } } }
//!             line: 21
//!           - expr: { call: { method: m3, on: { var: o }, args: [ { lit: 1 } ] } }
//!             line: 28
//! ```

use super::{
    AnnotatedType, CallExpr, ClassDecl, ClassId, Expr, MethodDecl, MethodId, MethodKind,
    Position, Program, Stmt, VarId, VariableDecl, VariableKind,
};
use crate::error::ProgramError;
use crate::qual::{ElementTarget, QualifierKind, TrustLevel, TrustQualifier, DEFAULT_LEVEL};
use serde::Deserialize;
use serde_yaml_ng::Value;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct RawProgram {
    #[serde(default)]
    classes: Vec<RawClass>,
}

#[derive(Debug, Deserialize)]
struct RawClass {
    name: String,
    #[serde(default)]
    trust: Option<RawQualifier>,
    #[serde(default)]
    fields: Vec<RawVariable>,
    #[serde(default)]
    constructors: Vec<RawConstructor>,
    #[serde(default)]
    methods: Vec<RawMethod>,
    #[serde(default)]
    line: u32,
}

/// `{ kind, level }`, both optional
#[derive(Debug, Deserialize)]
struct RawQualifier {
    #[serde(default)]
    kind: Option<QualifierKind>,
    /// Kept untyped so a malformed level can be recovered from
    #[serde(default)]
    level: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawVariable {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    trust: Option<RawQualifier>,
    #[serde(default)]
    init: Option<RawExpr>,
    #[serde(default)]
    line: u32,
}

#[derive(Debug, Deserialize)]
struct RawConstructor {
    #[serde(default)]
    requires: Option<RawQualifier>,
    #[serde(default)]
    params: Vec<RawVariable>,
    #[serde(default)]
    body: Vec<RawStmt>,
    #[serde(default)]
    line: u32,
}

#[derive(Debug, Deserialize)]
struct RawMethod {
    name: String,
    #[serde(default, rename = "static")]
    is_static: bool,
    #[serde(default)]
    requires: Option<RawQualifier>,
    #[serde(default)]
    receiver: Option<RawQualifier>,
    #[serde(default)]
    params: Vec<RawVariable>,
    #[serde(default)]
    returns: Option<String>,
    #[serde(default)]
    return_trust: Option<RawQualifier>,
    #[serde(default)]
    body: Vec<RawStmt>,
    #[serde(default)]
    line: u32,
}

#[derive(Debug, Deserialize)]
struct RawStmt {
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
    #[serde(flatten)]
    kind: RawStmtKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawStmtKind {
    Let(RawVariable),
    Expr(RawExpr),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawExpr {
    Var(String),
    This,
    Lit(Value),
    New(RawNew),
    Call(RawCall),
}

#[derive(Debug, Deserialize)]
struct RawNew {
    class: String,
    #[serde(default)]
    args: Vec<RawExpr>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawCall {
    method: String,
    /// Receiver expression
    #[serde(default)]
    on: Option<Box<RawExpr>>,
    /// Owner class of a static method
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    args: Vec<RawExpr>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
}

impl Program {
    /// Load a program description from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProgramError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ProgramError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_yaml(name, &content)
    }

    /// Parse and resolve a program description
    pub fn from_yaml(name: impl Into<String>, content: &str) -> Result<Self, ProgramError> {
        let name = name.into();
        debug!("Parsing program description '{}'", name);

        let raw: RawProgram =
            serde_yaml_ng::from_str(content).map_err(|source| ProgramError::Parse {
                program: name.clone(),
                source,
            })?;

        let program = Lowering::new(name).lower(&raw)?;

        info!(
            "Loaded program '{}': {} classes, {} methods, {} variables",
            program.name,
            program.classes.len(),
            program.methods.len(),
            program.variables.len()
        );
        Ok(program)
    }
}

/// Where an expression is being lowered
struct Scope {
    class: ClassId,
    /// Receiver qualifier of the enclosing instance method, if any
    receiver: Option<TrustQualifier>,
    /// False inside static methods
    has_this: bool,
    /// Visible variables in declaration order; later entries shadow earlier ones
    variables: Vec<(String, VarId)>,
    context: String,
}

impl Scope {
    fn lookup(&self, name: &str) -> Option<VarId> {
        self.variables
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }
}

struct Lowering {
    program: Program,
}

impl Lowering {
    fn new(name: String) -> Self {
        Self {
            program: Program {
                name,
                ..Program::default()
            },
        }
    }

    fn lower(mut self, raw: &RawProgram) -> Result<Program, ProgramError> {
        // Classes first so member signatures can refer to any of them
        for class in &raw.classes {
            self.declare_class(class)?;
        }

        let mut bodies = Vec::new();
        for (index, class) in raw.classes.iter().enumerate() {
            bodies.extend(self.declare_members(ClassId(index), class)?);
        }

        for (index, class) in raw.classes.iter().enumerate() {
            self.lower_field_initializers(ClassId(index), class)?;
        }

        for (method, body) in bodies {
            self.lower_body(method, body)?;
        }

        Ok(self.program)
    }

    fn declare_class(&mut self, raw: &RawClass) -> Result<(), ProgramError> {
        if self.program.class_named(&raw.name).is_some() {
            return Err(ProgramError::DuplicateClass {
                name: raw.name.clone(),
            });
        }

        let qualifier = lower_qualifier(
            raw.trust.as_ref(),
            QualifierKind::Trust,
            ElementTarget::Type,
            &format!("class '{}'", raw.name),
        )?;

        self.program.classes.push(ClassDecl {
            name: raw.name.clone(),
            qualifier,
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            position: Position::new(raw.line, 0),
        });
        Ok(())
    }

    /// Declare fields, constructors and methods. Returns the bodies still to
    /// be lowered.
    fn declare_members<'r>(
        &mut self,
        class: ClassId,
        raw: &'r RawClass,
    ) -> Result<Vec<(MethodId, &'r [RawStmt])>, ProgramError> {
        let mut bodies = Vec::new();

        for field in &raw.fields {
            let context = format!("field '{}.{}'", raw.name, field.name);
            let id = self.declare_variable(field, VariableKind::Field, &context)?;
            self.program.classes[class.0].fields.push(id);
        }

        for ctor in &raw.constructors {
            let context = format!("constructor of '{}'", raw.name);
            let requirement = lower_qualifier(
                ctor.requires.as_ref(),
                QualifierKind::TrustRequirement,
                ElementTarget::Constructor,
                &context,
            )?;
            let params = self.declare_params(&ctor.params, &context)?;
            let id = self.push_method(MethodDecl {
                name: "<init>".to_string(),
                owner: class,
                kind: MethodKind::Constructor,
                is_static: false,
                requirement,
                receiver: None,
                params,
                return_type: AnnotatedType::unannotated(raw.name.clone()),
                body: Vec::new(),
                position: Position::new(ctor.line, 0),
            });
            self.program.classes[class.0].constructors.push(id);
            bodies.push((id, ctor.body.as_slice()));
        }

        if raw.constructors.is_empty() {
            debug!("Adding implicit constructor to '{}'", raw.name);
            let id = self.push_method(MethodDecl {
                name: "<init>".to_string(),
                owner: class,
                kind: MethodKind::Constructor,
                is_static: false,
                requirement: None,
                receiver: None,
                params: Vec::new(),
                return_type: AnnotatedType::unannotated(raw.name.clone()),
                body: Vec::new(),
                position: Position::new(raw.line, 0),
            });
            self.program.classes[class.0].constructors.push(id);
        }

        for method in &raw.methods {
            let context = format!("method '{}.{}'", raw.name, method.name);
            let requirement = lower_qualifier(
                method.requires.as_ref(),
                QualifierKind::TrustRequirement,
                ElementTarget::Method,
                &context,
            )?;
            let receiver = if method.is_static {
                if method.receiver.is_some() {
                    return Err(ProgramError::UnexpectedReceiver {
                        method: method.name.clone(),
                        context,
                    });
                }
                None
            } else {
                lower_qualifier(
                    method.receiver.as_ref(),
                    QualifierKind::Trust,
                    ElementTarget::TypeUse,
                    &context,
                )?
            };
            let return_type = AnnotatedType::new(
                method.returns.clone().unwrap_or_else(|| "void".to_string()),
                lower_qualifier(
                    method.return_trust.as_ref(),
                    QualifierKind::Trust,
                    ElementTarget::TypeUse,
                    &context,
                )?,
            );
            let params = self.declare_params(&method.params, &context)?;

            let id = self.push_method(MethodDecl {
                name: method.name.clone(),
                owner: class,
                kind: MethodKind::Method,
                is_static: method.is_static,
                requirement,
                receiver,
                params,
                return_type,
                body: Vec::new(),
                position: Position::new(method.line, 0),
            });
            self.program.classes[class.0].methods.push(id);
            bodies.push((id, method.body.as_slice()));
        }

        Ok(bodies)
    }

    fn declare_params(
        &mut self,
        params: &[RawVariable],
        context: &str,
    ) -> Result<Vec<VarId>, ProgramError> {
        params
            .iter()
            .map(|p| self.declare_variable(p, VariableKind::Parameter, context))
            .collect()
    }

    /// Declare a variable without its initializer
    fn declare_variable(
        &mut self,
        raw: &RawVariable,
        kind: VariableKind,
        context: &str,
    ) -> Result<VarId, ProgramError> {
        let qualifier = lower_qualifier(
            raw.trust.as_ref(),
            QualifierKind::Trust,
            ElementTarget::TypeUse,
            context,
        )?;

        let id = VarId(self.program.variables.len());
        self.program.variables.push(VariableDecl {
            name: raw.name.clone(),
            kind,
            type_name: raw.type_name.clone(),
            qualifier,
            init: None,
            position: Position::new(raw.line, 0),
        });
        Ok(id)
    }

    fn push_method(&mut self, method: MethodDecl) -> MethodId {
        let id = MethodId(self.program.methods.len());
        self.program.methods.push(method);
        id
    }

    fn class_scope(&self, class: ClassId, context: String) -> Scope {
        let variables = self
            .program
            .class(class)
            .fields
            .iter()
            .map(|id| (self.program.variable(*id).name.clone(), *id))
            .collect();
        Scope {
            class,
            receiver: None,
            has_this: true,
            variables,
            context,
        }
    }

    fn lower_field_initializers(
        &mut self,
        class: ClassId,
        raw: &RawClass,
    ) -> Result<(), ProgramError> {
        let fields = self.program.class(class).fields.clone();
        for (id, field) in fields.into_iter().zip(&raw.fields) {
            if let Some(init) = &field.init {
                let scope = self.class_scope(class, format!("field '{}.{}'", raw.name, field.name));
                let position = Position::new(field.line, 0);
                let expr = self.lower_expr(init, &scope, position)?;
                self.program.variables[id.0].init = Some(expr);
            }
        }
        Ok(())
    }

    fn lower_body(&mut self, method: MethodId, body: &[RawStmt]) -> Result<(), ProgramError> {
        let decl = self.program.method(method);
        let mut scope = self.class_scope(
            decl.owner,
            format!("'{}'", self.program.method_name(method)),
        );
        scope.receiver = decl.receiver;
        scope.has_this = !decl.is_static;
        for param in &decl.params {
            scope
                .variables
                .push((self.program.variable(*param).name.clone(), *param));
        }

        let mut stmts = Vec::with_capacity(body.len());
        for stmt in body {
            let position = Position::new(stmt.line, stmt.column);
            match &stmt.kind {
                RawStmtKind::Let(var) => {
                    let line = if var.line == 0 { stmt.line } else { var.line };
                    let id = self.declare_variable(var, VariableKind::Local, &scope.context)?;
                    self.program.variables[id.0].position = Position::new(line, stmt.column);
                    if let Some(init) = &var.init {
                        // The new variable is not yet in scope for its own initializer
                        let expr = self.lower_expr(init, &scope, position)?;
                        self.program.variables[id.0].init = Some(expr);
                    }
                    scope.variables.push((var.name.clone(), id));
                    debug!("Declared local '{}' in {}", var.name, scope.context);
                    stmts.push(Stmt::Local(id));
                }
                RawStmtKind::Expr(expr) => {
                    stmts.push(Stmt::Expr(self.lower_expr(expr, &scope, position)?));
                }
            }
        }

        self.program.methods[method.0].body = stmts;
        Ok(())
    }

    fn lower_expr(
        &self,
        raw: &RawExpr,
        scope: &Scope,
        position: Position,
    ) -> Result<Expr, ProgramError> {
        match raw {
            RawExpr::Var(name) => {
                let var = scope
                    .lookup(name)
                    .ok_or_else(|| ProgramError::UnresolvedVariable {
                        name: name.clone(),
                        context: scope.context.clone(),
                    })?;
                Ok(Expr::Var { var, position })
            }
            RawExpr::This => {
                if !scope.has_this {
                    return Err(ProgramError::UnresolvedVariable {
                        name: "this".to_string(),
                        context: scope.context.clone(),
                    });
                }
                Ok(Expr::This {
                    class: scope.class,
                    qualifier: scope.receiver,
                    position,
                })
            }
            RawExpr::Lit(value) => Ok(Expr::Literal {
                type_name: literal_type(value).to_string(),
                position,
            }),
            RawExpr::New(new) => {
                let position = override_position(position, new.line, new.column);
                let class = self.program.class_named(&new.class).ok_or_else(|| {
                    ProgramError::UnknownClass {
                        name: new.class.clone(),
                        context: scope.context.clone(),
                    }
                })?;
                let arguments = self.lower_args(&new.args, scope, position)?;
                let method = self.find_member(class, "<init>", arguments.len(), scope)?;
                Ok(Expr::Call(CallExpr {
                    method,
                    receiver: None,
                    arguments,
                    position,
                }))
            }
            RawExpr::Call(call) => self.lower_call(call, scope, position).map(Expr::Call),
        }
    }

    fn lower_call(
        &self,
        call: &RawCall,
        scope: &Scope,
        position: Position,
    ) -> Result<CallExpr, ProgramError> {
        let position = override_position(position, call.line, call.column);
        let arguments = self.lower_args(&call.args, scope, position)?;

        let (method, receiver) = match (&call.on, &call.class) {
            (Some(_), Some(_)) => {
                return Err(ProgramError::UnexpectedReceiver {
                    method: call.method.clone(),
                    context: scope.context.clone(),
                });
            }
            (Some(on), None) => {
                let receiver = self.lower_expr(on, scope, position)?;
                let type_name = self.static_type(&receiver);
                let class = self.program.class_named(&type_name).ok_or_else(|| {
                    ProgramError::NotAnObject {
                        method: call.method.clone(),
                        type_name: type_name.clone(),
                        context: scope.context.clone(),
                    }
                })?;
                let method = self.find_member(class, &call.method, arguments.len(), scope)?;
                if self.program.method(method).is_static {
                    return Err(ProgramError::UnexpectedReceiver {
                        method: call.method.clone(),
                        context: scope.context.clone(),
                    });
                }
                (method, Some(Box::new(receiver)))
            }
            (None, Some(class_name)) => {
                let class = self.program.class_named(class_name).ok_or_else(|| {
                    ProgramError::UnknownClass {
                        name: class_name.clone(),
                        context: scope.context.clone(),
                    }
                })?;
                let method = self.find_member(class, &call.method, arguments.len(), scope)?;
                if !self.program.method(method).is_static {
                    return Err(ProgramError::MissingReceiver {
                        method: call.method.clone(),
                        context: scope.context.clone(),
                    });
                }
                (method, None)
            }
            (None, None) => {
                let method = self.find_member(scope.class, &call.method, arguments.len(), scope)?;
                if self.program.method(method).is_static {
                    (method, None)
                } else if scope.has_this {
                    let this = Expr::This {
                        class: scope.class,
                        qualifier: scope.receiver,
                        position,
                    };
                    (method, Some(Box::new(this)))
                } else {
                    return Err(ProgramError::MissingReceiver {
                        method: call.method.clone(),
                        context: scope.context.clone(),
                    });
                }
            }
        };

        Ok(CallExpr {
            method,
            receiver,
            arguments,
            position,
        })
    }

    fn lower_args(
        &self,
        args: &[RawExpr],
        scope: &Scope,
        position: Position,
    ) -> Result<Vec<Expr>, ProgramError> {
        args.iter()
            .map(|arg| self.lower_expr(arg, scope, position))
            .collect()
    }

    /// Resolve a method or constructor by name and arity
    fn find_member(
        &self,
        class: ClassId,
        name: &str,
        arity: usize,
        scope: &Scope,
    ) -> Result<MethodId, ProgramError> {
        let decl = self.program.class(class);
        let candidates = if name == "<init>" {
            &decl.constructors
        } else {
            &decl.methods
        };

        candidates
            .iter()
            .copied()
            .find(|id| {
                let method = self.program.method(*id);
                method.name == name && method.params.len() == arity
            })
            .ok_or_else(|| ProgramError::UnresolvedMethod {
                class: decl.name.clone(),
                method: name.to_string(),
                arity,
                context: scope.context.clone(),
            })
    }

    /// Name of the static type of an expression, used for method lookup
    fn static_type(&self, expr: &Expr) -> String {
        match expr {
            Expr::Var { var, .. } => self.program.variable(*var).type_name.clone(),
            Expr::This { class, .. } => self.program.class(*class).name.clone(),
            Expr::Literal { type_name, .. } => type_name.clone(),
            Expr::Call(call) => self.program.method(call.method).return_type.name().to_string(),
        }
    }
}

fn override_position(position: Position, line: Option<u32>, column: Option<u32>) -> Position {
    Position::new(
        line.unwrap_or(position.line),
        column.unwrap_or(position.column),
    )
}

fn literal_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "double",
        Value::Number(_) => "int",
        Value::String(_) => "String",
        Value::Null => "null",
        _ => "Object",
    }
}

/// Turn a written qualifier into a value.
///
/// A missing level defaults to 0. A level that is not a non-negative `i32`
/// integer is malformed; the qualifier is then treated as absent.
fn lower_qualifier(
    raw: Option<&RawQualifier>,
    default_kind: QualifierKind,
    target: ElementTarget,
    context: &str,
) -> Result<Option<TrustQualifier>, ProgramError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let kind = raw.kind.unwrap_or(default_kind);
    if !kind.permits(target) {
        return Err(ProgramError::misplaced(kind, target, context.to_string()));
    }

    let level = match &raw.level {
        None => DEFAULT_LEVEL,
        Some(value) => match value
            .as_i64()
            .and_then(|l| TrustLevel::try_from(l).ok())
            .filter(|l| *l >= DEFAULT_LEVEL)
        {
            Some(level) => level,
            None => {
                warn!(
                    "Ignoring {} on {} with malformed level {:?}",
                    kind, context, value
                );
                return Ok(None);
            }
        },
    };

    Ok(Some(TrustQualifier::new(kind, level)))
}
