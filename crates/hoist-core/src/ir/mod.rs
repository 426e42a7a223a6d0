//! Arena-backed class IR.
//!
//! A [`Program`] holds one file's worth of declarations. Nodes that other code
//! refers to (declarations, fields, variables, functions) live in `id-arena`
//! arenas and are addressed by stable ids; expressions own their children and
//! refer to those nodes only by id. Rewriting a reference is therefore a local
//! id swap, and a relocated node is a fresh arena entry rather than an
//! in-place mutation.
//!
//! Arena entries are never freed. A field that has been relocated stays in the
//! arena but is no longer *owned* by any declaration (see
//! [`Program::owned_fields`]).

pub mod decl;
pub mod expr;
pub mod visit;

pub use decl::{
    Annotation, AnonymousInitializer, DeclKind, Declaration, Field, FieldFlags, Function, Member,
    Property, Scope, TypeRef, Variable, Visibility,
};
pub use expr::{BinaryOp, Block, Expr, Literal, Stmt};

use id_arena::{Arena, Id};

pub type DeclId = Id<Declaration>;
pub type FieldId = Id<Field>;
pub type VarId = Id<Variable>;
pub type FunctionId = Id<Function>;

/// A top-level entry of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Declaration(DeclId),
    Function(FunctionId),
}

/// One file or module of IR.
pub struct Program {
    pub name: String,
    pub declarations: Arena<Declaration>,
    pub fields: Arena<Field>,
    pub variables: Arena<Variable>,
    pub functions: Arena<Function>,
    /// Top-level items in source order.
    pub items: Vec<Item>,
    /// Set by the front-end once annotations have been resolved.
    pub annotations_resolved: bool,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Program {
            name: name.into(),
            declarations: Arena::new(),
            fields: Arena::new(),
            variables: Arena::new(),
            functions: Arena::new(),
            items: Vec::new(),
            annotations_resolved: true,
        }
    }

    /// Top-level declarations in source order.
    pub fn top_level_declarations(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.items.iter().filter_map(|item| match item {
            Item::Declaration(id) => Some(*id),
            Item::Function(_) => None,
        })
    }

    /// Top-level functions in source order.
    pub fn top_level_functions(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.items.iter().filter_map(|item| match item {
            Item::Function(id) => Some(*id),
            Item::Declaration(_) => None,
        })
    }

    /// `decl` followed by every declaration nested in it, pre-order.
    pub fn subtree(&self, decl: DeclId) -> Vec<DeclId> {
        let mut out = Vec::new();
        let mut stack = vec![decl];
        while let Some(id) = stack.pop() {
            out.push(id);
            let nested: Vec<DeclId> = self.declarations[id].nested().collect();
            stack.extend(nested.into_iter().rev());
        }
        out
    }

    /// Dotted path from the outermost declaration, e.g. `Host.Companion`.
    pub fn qualified_name(&self, decl: DeclId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(decl);
        while let Some(id) = current {
            let d = &self.declarations[id];
            parts.push(d.name.as_str());
            current = d.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    pub fn qualified_field_name(&self, field: FieldId) -> String {
        let f = &self.fields[field];
        format!("{}.{}", self.qualified_name(f.parent), f.name)
    }

    /// Fields owned by `decl`, in member order.
    ///
    /// A field is owned by `decl` when it is listed as a [`Member::Field`], or
    /// when a property of `decl` uses it as backing field and the field's
    /// parent is `decl`. A property whose backing field was hoisted into the
    /// parent does not make the companion an owner.
    pub fn owned_fields(&self, decl: DeclId) -> Vec<FieldId> {
        self.declarations[decl]
            .members
            .iter()
            .filter_map(|member| match member {
                Member::Field(id) => Some(*id),
                Member::Property(p) => p
                    .backing_field
                    .filter(|field| self.fields[*field].parent == decl),
                _ => None,
            })
            .collect()
    }

    /// Allocates a declaration and, when it has a parent, appends it to the
    /// parent's members; otherwise records it as a top-level item.
    pub fn add_declaration(&mut self, decl: Declaration) -> DeclId {
        let parent = decl.parent;
        let id = self.declarations.alloc(decl);
        match parent {
            Some(p) => self.declarations[p].members.push(Member::Declaration(id)),
            None => self.items.push(Item::Declaration(id)),
        }
        id
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        ty: TypeRef,
        is_mutable: bool,
        scope: Scope,
    ) -> VarId {
        self.variables.alloc(Variable {
            name: name.into(),
            ty,
            is_mutable,
            scope,
        })
    }
}
