//! Declaration-level IR nodes: class-like declarations, their members, fields
//! and variables.

use super::expr::{Block, Expr};
use super::{DeclId, FieldId, FunctionId, VarId};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag of a class-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Class,
    Interface,
    /// Singleton nested in, and automatically associated with, its parent.
    Companion,
    /// Declaration with exactly one implicit instance and no enclosing class.
    Singleton,
}

impl DeclKind {
    /// Companions and singletons both carry a receiver and an instance slot.
    pub fn is_object(self) -> bool {
        matches!(self, DeclKind::Companion | DeclKind::Singleton)
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeclKind::Class => "class",
            DeclKind::Interface => "interface",
            DeclKind::Companion => "companion",
            DeclKind::Singleton => "object",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Internal,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Internal => "internal",
            Visibility::Private => "private",
        };
        f.write_str(s)
    }
}

/// Resolved type of a field or variable. The pass never inspects it beyond
/// copying it onto relocated nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef(name.into())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotation {
    pub name: String,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Annotation { name: name.into() }
    }
}

bitflags! {
    /// Storage flags of a field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// Owned by the declaration itself rather than by an instance.
        const STATIC = 1 << 0;
        const FINAL = 1 << 1;
        /// Implemented outside the compiled program (external linkage).
        const EXTERNAL = 1 << 2;
    }
}

/// A class-like declaration.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub visibility: Visibility,
    /// Enclosing declaration for nested declarations.
    pub parent: Option<DeclId>,
    /// Declared inside a function body rather than at file or class scope.
    pub is_local: bool,
    pub members: Vec<Member>,
    /// Self-reference slot: the implicit receiver used inside the
    /// declaration's own code. Present for companions and singletons.
    pub this_receiver: Option<VarId>,
    /// Compiler-synthesized static field holding the sole instance of a
    /// companion or singleton. For companions it lives on the parent.
    pub instance_field: Option<FieldId>,
    /// Set once the companion field lowering has processed this declaration.
    pub fields_lowered: bool,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Declaration {
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            parent: None,
            is_local: false,
            members: Vec::new(),
            this_receiver: None,
            instance_field: None,
            fields_lowered: false,
        }
    }

    pub fn is_nested(&self) -> bool {
        self.parent.is_some()
    }

    /// A singleton that is neither nested in another declaration nor local
    /// to a function body.
    pub fn is_standalone_singleton(&self) -> bool {
        self.kind == DeclKind::Singleton && !self.is_nested() && !self.is_local
    }

    /// Nested declarations listed as members, in member order.
    pub fn nested(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.members.iter().filter_map(|member| match member {
            Member::Declaration(id) => Some(*id),
            _ => None,
        })
    }
}

/// A member of a declaration.
#[derive(Debug, Clone)]
pub enum Member {
    Property(Property),
    Initializer(AnonymousInitializer),
    /// A field owned directly by the declaration, without a property wrapper.
    Field(FieldId),
    Function(FunctionId),
    Declaration(DeclId),
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    /// Backing storage slot. `None` for abstract and delegated properties.
    pub backing_field: Option<FieldId>,
    /// Compile-time constant.
    pub is_const: bool,
    /// Synthesized by fake-override generation; has no storage of its own.
    pub is_fake_override: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, backing_field: Option<FieldId>) -> Self {
        Property {
            name: name.into(),
            backing_field,
            is_const: false,
            is_fake_override: false,
        }
    }
}

/// An `init { ... }` block.
#[derive(Debug, Clone, Default)]
pub struct AnonymousInitializer {
    /// Runs once as part of the owner's static initialization.
    pub is_static: bool,
    pub body: Block,
}

/// A storage slot.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub flags: FieldFlags,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
    pub initializer: Option<Expr>,
    /// Owning declaration.
    pub parent: DeclId,
}

impl Field {
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldFlags::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.flags.contains(FieldFlags::FINAL)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }
}

/// The scope a variable was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Directly inside a declaration's initializer block, or a receiver.
    Declaration(DeclId),
    /// Inside a field initializer expression.
    Field(FieldId),
    Function(FunctionId),
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: TypeRef,
    pub is_mutable: bool,
    pub scope: Scope,
}

/// A function: a method, a top-level function, or a lambda body.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    /// Declaration the function is a member of, if any.
    pub owner: Option<DeclId>,
    pub params: Vec<VarId>,
    pub body: Block,
}
