//! Fluent construction of IR programs in tests.
//!
//! Object declarations get what the front-end would synthesize for them: a
//! `this` receiver, and a static instance field (on the parent for a
//! companion, `INSTANCE` on the declaration itself otherwise).

use hoist_core::document::INSTANCE_FIELD_NAME;
use hoist_core::ir::{
    Annotation, AnonymousInitializer, Block, DeclId, DeclKind, Declaration, Expr, Field,
    FieldFlags, FieldId, Function, FunctionId, Item, Member, Program, Property, Scope, Stmt,
    TypeRef, VarId, Visibility,
};

/// Description of a property and its backing field.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    name: String,
    ty: String,
    is_const: bool,
    is_final: bool,
    visibility: Visibility,
    annotations: Vec<String>,
    initializer: Option<Expr>,
}

impl PropertyDef {
    /// A final `Int` property with no initializer.
    pub fn new(name: &str) -> Self {
        PropertyDef {
            name: name.to_string(),
            ty: "Int".to_string(),
            is_const: false,
            is_final: true,
            visibility: Visibility::Public,
            annotations: Vec::new(),
            initializer: None,
        }
    }

    pub fn ty(mut self, ty: &str) -> Self {
        self.ty = ty.to_string();
        self
    }

    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn mutable(mut self) -> Self {
        self.is_final = false;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn annotated(mut self, annotation: &str) -> Self {
        self.annotations.push(annotation.to_string());
        self
    }

    pub fn init(mut self, expr: Expr) -> Self {
        self.initializer = Some(expr);
        self
    }
}

pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new(name: &str) -> Self {
        ProgramBuilder {
            program: Program::new(name),
        }
    }

    pub fn class(&mut self, name: &str) -> DeclId {
        self.declare(name, DeclKind::Class, None)
    }

    pub fn interface(&mut self, name: &str) -> DeclId {
        self.declare(name, DeclKind::Interface, None)
    }

    pub fn singleton(&mut self, name: &str) -> DeclId {
        self.declare(name, DeclKind::Singleton, None)
    }

    /// A singleton declared inside a function body.
    pub fn local_singleton(&mut self, name: &str) -> DeclId {
        let decl = self.singleton(name);
        self.program.declarations[decl].is_local = true;
        decl
    }

    pub fn companion(&mut self, parent: DeclId, name: &str) -> DeclId {
        self.declare(name, DeclKind::Companion, Some(parent))
    }

    pub fn nested(&mut self, parent: DeclId, name: &str, kind: DeclKind) -> DeclId {
        self.declare(name, kind, Some(parent))
    }

    fn declare(&mut self, name: &str, kind: DeclKind, parent: Option<DeclId>) -> DeclId {
        let mut decl = Declaration::new(name, kind);
        decl.parent = parent;
        let id = self.program.add_declaration(decl);
        if kind.is_object() {
            let qualified = self.program.qualified_name(id);
            let this = self.program.add_variable(
                "this",
                TypeRef::new(qualified.clone()),
                false,
                Scope::Declaration(id),
            );
            let (holder, field_name) = match (kind, parent) {
                (DeclKind::Companion, Some(parent)) => (parent, name.to_string()),
                _ => (id, INSTANCE_FIELD_NAME.to_string()),
            };
            let instance = self.program.fields.alloc(Field {
                name: field_name,
                ty: TypeRef::new(qualified),
                flags: FieldFlags::STATIC | FieldFlags::FINAL,
                visibility: Visibility::Public,
                annotations: Vec::new(),
                initializer: None,
                parent: holder,
            });
            self.program.declarations[holder]
                .members
                .push(Member::Field(instance));
            let d = &mut self.program.declarations[id];
            d.this_receiver = Some(this);
            d.instance_field = Some(instance);
        }
        id
    }

    /// Adds a property backed by a fresh field of `owner`.
    pub fn property(&mut self, owner: DeclId, def: PropertyDef) -> FieldId {
        let mut flags = FieldFlags::empty();
        flags.set(FieldFlags::FINAL, def.is_final || def.is_const);
        let field = self.program.fields.alloc(Field {
            name: def.name.clone(),
            ty: TypeRef::new(def.ty),
            flags,
            visibility: def.visibility,
            annotations: def.annotations.into_iter().map(Annotation::new).collect(),
            initializer: def.initializer,
            parent: owner,
        });
        let mut property = Property::new(def.name, Some(field));
        property.is_const = def.is_const;
        self.program.declarations[owner]
            .members
            .push(Member::Property(property));
        field
    }

    /// Adds a property without backing storage.
    pub fn abstract_property(&mut self, owner: DeclId, name: &str) {
        self.program.declarations[owner]
            .members
            .push(Member::Property(Property::new(name, None)));
    }

    /// Adds a fake override pointing at `inherited`.
    pub fn fake_override(&mut self, owner: DeclId, name: &str, inherited: FieldId) {
        let mut property = Property::new(name, Some(inherited));
        property.is_fake_override = true;
        self.program.declarations[owner]
            .members
            .push(Member::Property(property));
    }

    /// Adds a plain field member.
    pub fn field(&mut self, owner: DeclId, name: &str, flags: FieldFlags) -> FieldId {
        let field = self.program.fields.alloc(Field {
            name: name.to_string(),
            ty: TypeRef::new("Int"),
            flags,
            visibility: Visibility::Public,
            annotations: Vec::new(),
            initializer: None,
            parent: owner,
        });
        self.program.declarations[owner]
            .members
            .push(Member::Field(field));
        field
    }

    pub fn init_block(&mut self, owner: DeclId, statements: Vec<Stmt>) {
        self.program.declarations[owner]
            .members
            .push(Member::Initializer(AnonymousInitializer {
                is_static: false,
                body: Block::new(statements),
            }));
    }

    /// A local variable declared in `scope`.
    pub fn local(&mut self, scope: Scope, name: &str) -> VarId {
        self.program
            .add_variable(name, TypeRef::new("Int"), true, scope)
    }

    /// A member function of `owner`, or a top-level function when `owner` is
    /// `None`.
    pub fn function(&mut self, owner: Option<DeclId>, name: &str, body: Vec<Stmt>) -> FunctionId {
        let function = self.program.functions.alloc(Function {
            name: name.to_string(),
            owner,
            params: Vec::new(),
            body: Block::new(body),
        });
        match owner {
            Some(decl) => self.program.declarations[decl]
                .members
                .push(Member::Function(function)),
            None => self.program.items.push(Item::Function(function)),
        }
        function
    }

    /// A lambda with no parameters. Not attached to anything until an
    /// `Expr::Lambda` refers to it.
    pub fn lambda(&mut self, body: Vec<Stmt>) -> FunctionId {
        self.program.functions.alloc(Function {
            name: "<lambda>".to_string(),
            owner: None,
            params: Vec::new(),
            body: Block::new(body),
        })
    }

    /// Read of `decl`'s receiver.
    pub fn this(&self, decl: DeclId) -> Expr {
        match self.program.declarations[decl].this_receiver {
            Some(this) => Expr::GetValue(this),
            None => panic!("`{}` has no receiver", self.program.declarations[decl].name),
        }
    }

    pub fn instance_field(&self, decl: DeclId) -> FieldId {
        match self.program.declarations[decl].instance_field {
            Some(field) => field,
            None => panic!("`{}` has no instance field", self.program.declarations[decl].name),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub fn build(self) -> Program {
        self.program
    }
}
