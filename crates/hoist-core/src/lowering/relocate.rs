//! Field and initializer relocation.
//!
//! Relocated code crosses from instance to static context, so every read of
//! the old owner's receiver is materialized as a load of the owner's
//! singleton-instance field. Locals declared in relocated code get fresh
//! identities scoped to the new owner so no variable is shared between the
//! old and the new location.

use crate::error::{LoweringError, Result};
use crate::interop::InteropQueries;
use crate::ir::visit::{walk_expr_mut, walk_stmt_mut, MutVisitor};
use crate::ir::{
    AnonymousInitializer, DeclId, Expr, Field, FieldFlags, FieldId, Function, FunctionId, Program,
    Scope, Stmt, VarId, Variable,
};
use rustc_hash::FxHashMap;

/// Builds a static copy of `old` owned by `field_owner`.
///
/// `property_owner` is the declaration that keeps the property; reads of its
/// receiver in the initializer become loads of its singleton-instance field.
/// The old field is left untouched.
pub fn relocate_field(
    program: &mut Program,
    queries: &dyn InteropQueries,
    old: FieldId,
    property_owner: DeclId,
    field_owner: DeclId,
) -> Result<FieldId> {
    let template = &program.fields[old];
    let copy = Field {
        name: template.name.clone(),
        ty: template.ty.clone(),
        flags: template.flags | FieldFlags::STATIC,
        visibility: template.visibility,
        annotations: template.annotations.clone(),
        initializer: None,
        parent: field_owner,
    };
    let new = program.fields.alloc(copy);

    if let Some(mut init) = program.fields[old].initializer.clone() {
        let mut relocator = ScopeRelocator::new(
            program,
            queries,
            property_owner,
            Scope::Field(old),
            Scope::Field(new),
        );
        relocator.copy_lambdas = true;
        relocator.visit_expr(&mut init, program);
        relocator.finish(program)?;
        program.fields[new].initializer = Some(init);
    }

    Ok(new)
}

/// Rebuilds an initializer block of `old_parent` as a static block of
/// `new_parent`.
pub fn relocate_initializer_block(
    program: &mut Program,
    queries: &dyn InteropQueries,
    block: AnonymousInitializer,
    old_parent: DeclId,
    new_parent: DeclId,
) -> Result<AnonymousInitializer> {
    let mut body = block.body;
    let mut relocator = ScopeRelocator::new(
        program,
        queries,
        old_parent,
        Scope::Declaration(old_parent),
        Scope::Declaration(new_parent),
    );
    relocator.visit_block(&mut body, program);
    relocator.finish(program)?;
    Ok(AnonymousInitializer {
        is_static: true,
        body,
    })
}

/// Moves code from one scope to another.
struct ScopeRelocator {
    owner: DeclId,
    /// Receiver of `owner`; reads of it become instance-field loads.
    receiver: Option<VarId>,
    instance_field: Option<FieldId>,
    /// Locals declared in a key scope are re-created in the mapped scope.
    scopes: FxHashMap<Scope, Scope>,
    /// Block-local variable remap, filled as declarations are met.
    variables: FxHashMap<VarId, VarId>,
    /// Deep-copy lambdas instead of sharing them with the source.
    copy_lambdas: bool,
    missing_instance: bool,
}

impl ScopeRelocator {
    fn new(
        program: &Program,
        queries: &dyn InteropQueries,
        owner: DeclId,
        from: Scope,
        to: Scope,
    ) -> Self {
        let mut scopes = FxHashMap::default();
        scopes.insert(from, to);
        ScopeRelocator {
            owner,
            receiver: program.declarations[owner].this_receiver,
            instance_field: queries.singleton_instance_field(program, owner),
            scopes,
            variables: FxHashMap::default(),
            copy_lambdas: false,
            missing_instance: false,
        }
    }

    fn finish(self, program: &Program) -> Result<()> {
        if self.missing_instance {
            return Err(LoweringError::MissingInstanceField {
                declaration: program.qualified_name(self.owner),
            });
        }
        Ok(())
    }

    fn fresh_variable(&mut self, program: &mut Program, old: VarId, scope: Scope) -> VarId {
        let template = &program.variables[old];
        let copy = Variable {
            name: template.name.clone(),
            ty: template.ty.clone(),
            is_mutable: template.is_mutable,
            scope,
        };
        let new = program.variables.alloc(copy);
        self.variables.insert(old, new);
        new
    }

    fn remap(&self, var: VarId) -> VarId {
        self.variables.get(&var).copied().unwrap_or(var)
    }

    /// Copies a lambda with fresh parameters and registers its scope so the
    /// locals inside are re-created too.
    fn copy_lambda(&mut self, program: &mut Program, old: FunctionId) -> FunctionId {
        let template = program.functions[old].clone();
        let new = program.functions.alloc(Function {
            params: Vec::new(),
            ..template
        });
        self.scopes.insert(Scope::Function(old), Scope::Function(new));
        let params: Vec<VarId> = program.functions[old]
            .params
            .clone()
            .into_iter()
            .map(|param| self.fresh_variable(program, param, Scope::Function(new)))
            .collect();
        program.functions[new].params = params;
        new
    }
}

impl MutVisitor for ScopeRelocator {
    fn visit_stmt(&mut self, stmt: &mut Stmt, program: &mut Program) {
        if let Stmt::Let { var, .. } = stmt {
            let declared_in = program.variables[*var].scope;
            if let Some(&scope) = self.scopes.get(&declared_in) {
                *var = self.fresh_variable(program, *var, scope);
            }
        }
        walk_stmt_mut(self, stmt, program);
    }

    fn visit_expr(&mut self, expr: &mut Expr, program: &mut Program) {
        match expr {
            Expr::GetValue(var) if Some(*var) == self.receiver => match self.instance_field {
                Some(instance) => *expr = Expr::get_field(instance, None),
                None => self.missing_instance = true,
            },
            Expr::GetValue(var) => *var = self.remap(*var),
            Expr::SetValue { var, .. } => {
                *var = self.remap(*var);
                walk_expr_mut(self, expr, program);
            }
            Expr::Lambda(function) if self.copy_lambdas => {
                let copy = self.copy_lambda(program, *function);
                *function = copy;
                self.visit_function(copy, program);
            }
            _ => walk_expr_mut(self, expr, program),
        }
    }
}
