//! Serialized program documents.
//!
//! A document describes a resolved program with name-based references:
//! fields by qualified path (`Host.Companion.count`), receivers by the
//! qualified name of their declaration, locals and parameters by lexical
//! name. [`build_program`] resolves those names into arena ids, and
//! synthesizes what the front-end normally would: a `this` receiver for every
//! companion and singleton, a static instance field on the parent for each
//! companion (named after the companion), and an `INSTANCE` field on every
//! other singleton.
//!
//! ```yaml
//! name: Counter.kt
//! declarations:
//!   - name: Counter
//!     kind: class
//!     members:
//!       - member: declaration
//!         name: Companion
//!         kind: companion
//!         members:
//!           - member: property
//!             name: count
//!             type: Int
//!             init: { expr: int, value: 0 }
//! ```

use crate::ir::{
    Annotation, AnonymousInitializer, BinaryOp, Block, DeclId, DeclKind, Declaration, Expr, Field,
    FieldFlags, FieldId, Function, FunctionId, Item, Literal, Member, Program, Property, Scope,
    Stmt, TypeRef, VarId, Visibility,
};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Name of the synthesized instance field of a non-companion singleton.
pub const INSTANCE_FIELD_NAME: &str = "INSTANCE";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("declaration `{0}` is declared twice")]
    DuplicateDeclaration(String),
    #[error("field `{0}` is declared twice")]
    DuplicateField(String),
    #[error("unknown declaration `{0}`")]
    UnknownDeclaration(String),
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("`{0}` has no receiver; only companions and singletons do")]
    NoReceiver(String),
    #[error("companion `{0}` must be nested in another declaration")]
    TopLevelCompanion(String),
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramDoc {
    pub name: String,
    #[serde(default = "default_true")]
    pub annotations_resolved: bool,
    #[serde(default)]
    pub declarations: Vec<DeclDoc>,
    #[serde(default)]
    pub functions: Vec<FunctionDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclDoc {
    pub name: String,
    pub kind: DeclKind,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub members: Vec<MemberDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "member", rename_all = "snake_case")]
pub enum MemberDoc {
    Property(PropertyDoc),
    Field(FieldDoc),
    Init {
        #[serde(default)]
        body: Vec<StmtDoc>,
    },
    Function(FunctionDoc),
    Declaration(DeclDoc),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(rename = "const", default)]
    pub is_const: bool,
    #[serde(default)]
    pub fake_override: bool,
    /// `false` for abstract and delegated properties.
    #[serde(default = "default_true")]
    pub backing: bool,
    #[serde(default = "default_true", rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub init: Option<ExprDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub init: Option<ExprDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionDoc {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDoc>,
    #[serde(default)]
    pub body: Vec<StmtDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParamDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum StmtDoc {
    Let {
        name: String,
        #[serde(rename = "type", default)]
        ty: Option<String>,
        #[serde(default)]
        mutable: bool,
        #[serde(default)]
        value: Option<ExprDoc>,
    },
    Expr {
        value: ExprDoc,
    },
    Return {
        #[serde(default)]
        value: Option<ExprDoc>,
    },
    If {
        cond: ExprDoc,
        then: Vec<StmtDoc>,
        #[serde(rename = "else", default)]
        otherwise: Option<Vec<StmtDoc>>,
    },
    While {
        cond: ExprDoc,
        body: Vec<StmtDoc>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum ExprDoc {
    Null,
    Bool {
        value: bool,
    },
    Int {
        value: i64,
    },
    Str {
        value: String,
    },
    /// Local or parameter read.
    Get {
        name: String,
    },
    Set {
        name: String,
        value: Box<ExprDoc>,
    },
    /// Receiver of the named companion or singleton.
    This {
        of: String,
    },
    GetField {
        field: String,
        #[serde(default)]
        receiver: Option<Box<ExprDoc>>,
    },
    SetField {
        field: String,
        #[serde(default)]
        receiver: Option<Box<ExprDoc>>,
        value: Box<ExprDoc>,
    },
    Call {
        callee: String,
        #[serde(default)]
        receiver: Option<Box<ExprDoc>>,
        #[serde(default)]
        args: Vec<ExprDoc>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<ExprDoc>,
        rhs: Box<ExprDoc>,
    },
    Block {
        body: Vec<StmtDoc>,
    },
    Lambda {
        #[serde(default)]
        params: Vec<ParamDoc>,
        body: Vec<StmtDoc>,
    },
}

impl ProgramDoc {
    pub fn from_yaml(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a document, choosing the format by extension (`.json` or YAML).
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            _ => Self::from_yaml(&text),
        }
    }
}

impl Program {
    pub fn from_yaml(text: &str) -> Result<Program, DocumentError> {
        build_program(ProgramDoc::from_yaml(text)?)
    }

    pub fn load(path: &Path) -> Result<Program, DocumentError> {
        build_program(ProgramDoc::load(path)?)
    }
}

/// Code whose names can only be resolved once every declaration and field
/// exists.
enum Pending {
    FieldInit(FieldId, ExprDoc),
    InitBlock {
        decl: DeclId,
        index: usize,
        body: Vec<StmtDoc>,
    },
    Body(FunctionId, Vec<StmtDoc>),
}

/// Resolves a document into a program.
pub fn build_program(doc: ProgramDoc) -> Result<Program, DocumentError> {
    let mut builder = Builder {
        program: Program::new(doc.name),
        decls: FxHashMap::default(),
        fields: FxHashMap::default(),
        pending: Vec::new(),
    };
    builder.program.annotations_resolved = doc.annotations_resolved;

    for decl in doc.declarations {
        builder.declare(decl, None)?;
    }
    for function in doc.functions {
        let id = builder.declare_function(function, None);
        builder.program.items.push(Item::Function(id));
    }

    let pending = std::mem::take(&mut builder.pending);
    for work in pending {
        builder.resolve(work)?;
    }
    Ok(builder.program)
}

struct Builder {
    program: Program,
    decls: FxHashMap<String, DeclId>,
    fields: FxHashMap<String, FieldId>,
    pending: Vec<Pending>,
}

impl Builder {
    fn declare(&mut self, doc: DeclDoc, parent: Option<DeclId>) -> Result<DeclId, DocumentError> {
        if doc.kind == DeclKind::Companion && parent.is_none() {
            return Err(DocumentError::TopLevelCompanion(doc.name));
        }
        let mut decl = Declaration::new(doc.name, doc.kind);
        decl.visibility = doc.visibility;
        decl.is_local = doc.local;
        decl.parent = parent;
        let id = self.program.add_declaration(decl);
        let path = self.program.qualified_name(id);
        if self.decls.insert(path.clone(), id).is_some() {
            return Err(DocumentError::DuplicateDeclaration(path));
        }

        if doc.kind.is_object() {
            let this = self.program.add_variable(
                "this",
                TypeRef::new(path.clone()),
                false,
                Scope::Declaration(id),
            );
            self.program.declarations[id].this_receiver = Some(this);
            let (holder, name) = match (doc.kind, parent) {
                (DeclKind::Companion, Some(parent)) => {
                    (parent, self.program.declarations[id].name.clone())
                }
                _ => (id, INSTANCE_FIELD_NAME.to_string()),
            };
            let instance = self.add_field(
                holder,
                Field {
                    name,
                    ty: TypeRef::new(path),
                    flags: FieldFlags::STATIC | FieldFlags::FINAL,
                    visibility: Visibility::Public,
                    annotations: Vec::new(),
                    initializer: None,
                    parent: holder,
                },
            )?;
            self.program.declarations[holder]
                .members
                .push(Member::Field(instance));
            self.program.declarations[id].instance_field = Some(instance);
        }

        for member in doc.members {
            self.declare_member(id, member)?;
        }
        Ok(id)
    }

    fn declare_member(&mut self, decl: DeclId, member: MemberDoc) -> Result<(), DocumentError> {
        match member {
            MemberDoc::Property(doc) => {
                let backing_field = if doc.backing {
                    let mut flags = FieldFlags::empty();
                    flags.set(FieldFlags::FINAL, doc.is_final || doc.is_const);
                    flags.set(FieldFlags::EXTERNAL, doc.external);
                    let field = self.add_field(
                        decl,
                        Field {
                            name: doc.name.clone(),
                            ty: TypeRef::new(doc.ty),
                            flags,
                            visibility: doc.visibility,
                            annotations: doc.annotations.into_iter().map(Annotation::new).collect(),
                            initializer: None,
                            parent: decl,
                        },
                    )?;
                    if let Some(init) = doc.init {
                        self.pending.push(Pending::FieldInit(field, init));
                    }
                    Some(field)
                } else {
                    None
                };
                let mut property = Property::new(doc.name, backing_field);
                property.is_const = doc.is_const;
                property.is_fake_override = doc.fake_override;
                self.program.declarations[decl]
                    .members
                    .push(Member::Property(property));
            }
            MemberDoc::Field(doc) => {
                let mut flags = FieldFlags::empty();
                flags.set(FieldFlags::STATIC, doc.is_static);
                flags.set(FieldFlags::FINAL, doc.is_final);
                flags.set(FieldFlags::EXTERNAL, doc.external);
                let field = self.add_field(
                    decl,
                    Field {
                        name: doc.name,
                        ty: TypeRef::new(doc.ty),
                        flags,
                        visibility: doc.visibility,
                        annotations: doc.annotations.into_iter().map(Annotation::new).collect(),
                        initializer: None,
                        parent: decl,
                    },
                )?;
                if let Some(init) = doc.init {
                    self.pending.push(Pending::FieldInit(field, init));
                }
                self.program.declarations[decl]
                    .members
                    .push(Member::Field(field));
            }
            MemberDoc::Init { body } => {
                let members = &mut self.program.declarations[decl].members;
                let index = members.len();
                members.push(Member::Initializer(AnonymousInitializer::default()));
                self.pending.push(Pending::InitBlock { decl, index, body });
            }
            MemberDoc::Function(doc) => {
                let function = self.declare_function(doc, Some(decl));
                self.program.declarations[decl]
                    .members
                    .push(Member::Function(function));
            }
            MemberDoc::Declaration(doc) => {
                self.declare(doc, Some(decl))?;
            }
        }
        Ok(())
    }

    fn add_field(&mut self, owner: DeclId, field: Field) -> Result<FieldId, DocumentError> {
        let path = format!("{}.{}", self.program.qualified_name(owner), field.name);
        let id = self.program.fields.alloc(field);
        if self.fields.insert(path.clone(), id).is_some() {
            return Err(DocumentError::DuplicateField(path));
        }
        Ok(id)
    }

    fn declare_function(&mut self, doc: FunctionDoc, owner: Option<DeclId>) -> FunctionId {
        let function = self.program.functions.alloc(Function {
            name: doc.name,
            owner,
            params: Vec::new(),
            body: Block::default(),
        });
        let params = doc
            .params
            .into_iter()
            .map(|p| {
                self.program
                    .add_variable(p.name, TypeRef::new(p.ty), false, Scope::Function(function))
            })
            .collect();
        self.program.functions[function].params = params;
        self.pending.push(Pending::Body(function, doc.body));
        function
    }

    fn resolve(&mut self, work: Pending) -> Result<(), DocumentError> {
        match work {
            Pending::FieldInit(field, doc) => {
                let mut scope = Locals::new(Scope::Field(field));
                let expr = self.expr(doc, &mut scope)?;
                self.program.fields[field].initializer = Some(expr);
            }
            Pending::InitBlock { decl, index, body } => {
                let mut scope = Locals::new(Scope::Declaration(decl));
                let body = self.block(body, &mut scope)?;
                if let Member::Initializer(init) = &mut self.program.declarations[decl].members[index]
                {
                    init.body = body;
                }
            }
            Pending::Body(function, body) => {
                let mut scope = Locals::new(Scope::Function(function));
                for &param in &self.program.functions[function].params {
                    scope.bind(self.program.variables[param].name.clone(), param);
                }
                let body = self.block(body, &mut scope)?;
                self.program.functions[function].body = body;
            }
        }
        Ok(())
    }

    fn block(&mut self, stmts: Vec<StmtDoc>, locals: &mut Locals) -> Result<Block, DocumentError> {
        let mark = locals.mark();
        let mut statements = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            statements.push(self.stmt(stmt, locals)?);
        }
        locals.reset(mark);
        Ok(Block::new(statements))
    }

    fn stmt(&mut self, doc: StmtDoc, locals: &mut Locals) -> Result<Stmt, DocumentError> {
        Ok(match doc {
            StmtDoc::Let {
                name,
                ty,
                mutable,
                value,
            } => {
                // The initializer cannot see the variable it initializes.
                let init = value.map(|v| self.expr(v, locals)).transpose()?;
                let ty = TypeRef::new(ty.unwrap_or_else(|| "Any".to_string()));
                let var = self
                    .program
                    .add_variable(name.clone(), ty, mutable, locals.scope);
                locals.bind(name, var);
                Stmt::Let { var, init }
            }
            StmtDoc::Expr { value } => Stmt::Expr(self.expr(value, locals)?),
            StmtDoc::Return { value } => {
                Stmt::Return(value.map(|v| self.expr(v, locals)).transpose()?)
            }
            StmtDoc::If {
                cond,
                then,
                otherwise,
            } => Stmt::If {
                cond: self.expr(cond, locals)?,
                then_block: self.block(then, locals)?,
                else_block: otherwise.map(|b| self.block(b, locals)).transpose()?,
            },
            StmtDoc::While { cond, body } => Stmt::While {
                cond: self.expr(cond, locals)?,
                body: self.block(body, locals)?,
            },
        })
    }

    fn boxed(&mut self, doc: Box<ExprDoc>, locals: &mut Locals) -> Result<Box<Expr>, DocumentError> {
        Ok(Box::new(self.expr(*doc, locals)?))
    }

    fn receiver(
        &mut self,
        doc: Option<Box<ExprDoc>>,
        locals: &mut Locals,
    ) -> Result<Option<Box<Expr>>, DocumentError> {
        doc.map(|r| self.boxed(r, locals)).transpose()
    }

    fn field(&self, path: &str) -> Result<FieldId, DocumentError> {
        self.fields
            .get(path)
            .copied()
            .ok_or_else(|| DocumentError::UnknownField(path.to_string()))
    }

    fn expr(&mut self, doc: ExprDoc, locals: &mut Locals) -> Result<Expr, DocumentError> {
        Ok(match doc {
            ExprDoc::Null => Expr::Literal(Literal::Null),
            ExprDoc::Bool { value } => Expr::Literal(Literal::Bool(value)),
            ExprDoc::Int { value } => Expr::Literal(Literal::Int(value)),
            ExprDoc::Str { value } => Expr::Literal(Literal::Str(value)),
            ExprDoc::Get { name } => Expr::GetValue(locals.lookup(&name)?),
            ExprDoc::Set { name, value } => Expr::SetValue {
                var: locals.lookup(&name)?,
                value: self.boxed(value, locals)?,
            },
            ExprDoc::This { of } => {
                let decl = *self
                    .decls
                    .get(&of)
                    .ok_or_else(|| DocumentError::UnknownDeclaration(of.clone()))?;
                let this = self.program.declarations[decl]
                    .this_receiver
                    .ok_or(DocumentError::NoReceiver(of))?;
                Expr::GetValue(this)
            }
            ExprDoc::GetField { field, receiver } => Expr::GetField {
                field: self.field(&field)?,
                receiver: self.receiver(receiver, locals)?,
            },
            ExprDoc::SetField {
                field,
                receiver,
                value,
            } => Expr::SetField {
                field: self.field(&field)?,
                receiver: self.receiver(receiver, locals)?,
                value: self.boxed(value, locals)?,
            },
            ExprDoc::Call {
                callee,
                receiver,
                args,
            } => Expr::Call {
                callee,
                receiver: self.receiver(receiver, locals)?,
                args: args
                    .into_iter()
                    .map(|a| self.expr(a, locals))
                    .collect::<Result<_, _>>()?,
            },
            ExprDoc::Binary { op, lhs, rhs } => Expr::Binary {
                op,
                lhs: self.boxed(lhs, locals)?,
                rhs: self.boxed(rhs, locals)?,
            },
            ExprDoc::Block { body } => Expr::Block(self.block(body, locals)?),
            ExprDoc::Lambda { params, body } => {
                let function = self.program.functions.alloc(Function {
                    name: "<lambda>".to_string(),
                    owner: None,
                    params: Vec::new(),
                    body: Block::default(),
                });
                let outer = locals.scope;
                let mark = locals.mark();
                locals.scope = Scope::Function(function);
                let mut ids = Vec::with_capacity(params.len());
                for p in params {
                    let var = self.program.add_variable(
                        p.name.clone(),
                        TypeRef::new(p.ty),
                        false,
                        Scope::Function(function),
                    );
                    locals.bind(p.name, var);
                    ids.push(var);
                }
                let body = self.block(body, locals);
                locals.scope = outer;
                locals.reset(mark);
                let body = body?;
                let f = &mut self.program.functions[function];
                f.params = ids;
                f.body = body;
                Expr::Lambda(function)
            }
        })
    }
}

/// Lexically scoped locals.
struct Locals {
    /// Scope new `let` bindings are declared in.
    scope: Scope,
    bindings: Vec<(String, VarId)>,
}

impl Locals {
    fn new(scope: Scope) -> Self {
        Locals {
            scope,
            bindings: Vec::new(),
        }
    }

    fn bind(&mut self, name: String, var: VarId) {
        self.bindings.push((name, var));
    }

    fn lookup(&self, name: &str) -> Result<VarId, DocumentError> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, var)| *var)
            .ok_or_else(|| DocumentError::UnknownVariable(name.to_string()))
    }

    fn mark(&self) -> usize {
        self.bindings.len()
    }

    fn reset(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }
}
