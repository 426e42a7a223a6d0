//! Tree walkers.
//!
//! [`MutVisitor`] rewrites code in place. A walker never holds a borrow of the
//! program while visiting a body: bodies are detached (`mem::take`), visited
//! with full `&mut Program` access, then put back. This lets visitors allocate
//! new arena nodes while they rewrite.
//!
//! [`Visitor`] is the read-only counterpart.

use super::{Block, DeclId, Expr, FieldId, FunctionId, Member, Program, Stmt};

pub trait MutVisitor {
    fn visit_block(&mut self, block: &mut Block, program: &mut Program) {
        walk_block_mut(self, block, program);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt, program: &mut Program) {
        walk_stmt_mut(self, stmt, program);
    }

    fn visit_expr(&mut self, expr: &mut Expr, program: &mut Program) {
        walk_expr_mut(self, expr, program);
    }

    fn visit_function(&mut self, function: FunctionId, program: &mut Program) {
        walk_function_mut(self, function, program);
    }
}

pub fn walk_block_mut<V: MutVisitor + ?Sized>(v: &mut V, block: &mut Block, program: &mut Program) {
    for stmt in &mut block.statements {
        v.visit_stmt(stmt, program);
    }
}

pub fn walk_stmt_mut<V: MutVisitor + ?Sized>(v: &mut V, stmt: &mut Stmt, program: &mut Program) {
    match stmt {
        Stmt::Let { init, .. } => {
            if let Some(init) = init {
                v.visit_expr(init, program);
            }
        }
        Stmt::Expr(expr) => v.visit_expr(expr, program),
        Stmt::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value, program);
            }
        }
        Stmt::If {
            cond,
            then_block,
            else_block,
        } => {
            v.visit_expr(cond, program);
            v.visit_block(then_block, program);
            if let Some(else_block) = else_block {
                v.visit_block(else_block, program);
            }
        }
        Stmt::While { cond, body } => {
            v.visit_expr(cond, program);
            v.visit_block(body, program);
        }
    }
}

pub fn walk_expr_mut<V: MutVisitor + ?Sized>(v: &mut V, expr: &mut Expr, program: &mut Program) {
    match expr {
        Expr::Literal(_) | Expr::GetValue(_) => {}
        Expr::SetValue { value, .. } => v.visit_expr(value, program),
        Expr::GetField { receiver, .. } => {
            if let Some(receiver) = receiver {
                v.visit_expr(receiver, program);
            }
        }
        Expr::SetField {
            receiver, value, ..
        } => {
            if let Some(receiver) = receiver {
                v.visit_expr(receiver, program);
            }
            v.visit_expr(value, program);
        }
        Expr::Call { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                v.visit_expr(receiver, program);
            }
            for arg in args {
                v.visit_expr(arg, program);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs, program);
            v.visit_expr(rhs, program);
        }
        Expr::Block(block) => v.visit_block(block, program),
        Expr::Lambda(function) => {
            let function = *function;
            v.visit_function(function, program);
        }
    }
}

pub fn walk_function_mut<V: MutVisitor + ?Sized>(
    v: &mut V,
    function: FunctionId,
    program: &mut Program,
) {
    let mut body = std::mem::take(&mut program.functions[function].body);
    v.visit_block(&mut body, program);
    program.functions[function].body = body;
}

/// Visits the initializer of `field`, if any.
pub fn walk_field_initializer_mut<V: MutVisitor + ?Sized>(
    v: &mut V,
    field: FieldId,
    program: &mut Program,
) {
    if let Some(mut init) = program.fields[field].initializer.take() {
        v.visit_expr(&mut init, program);
        program.fields[field].initializer = Some(init);
    }
}

/// Visits all code reachable from `decl`: initializers of owned fields,
/// initializer blocks, member functions and nested declarations. Each piece
/// of code is visited exactly once.
pub fn walk_declaration_mut<V: MutVisitor + ?Sized>(
    v: &mut V,
    decl: DeclId,
    program: &mut Program,
) {
    let count = program.declarations[decl].members.len();
    for index in 0..count {
        match &mut program.declarations[decl].members[index] {
            Member::Field(field) => {
                let field = *field;
                walk_field_initializer_mut(v, field, program);
            }
            Member::Property(property) => {
                let owned = property
                    .backing_field
                    .filter(|field| program.fields[*field].parent == decl);
                if let Some(field) = owned {
                    walk_field_initializer_mut(v, field, program);
                }
            }
            Member::Initializer(init) => {
                let mut body = std::mem::take(&mut init.body);
                v.visit_block(&mut body, program);
                if let Member::Initializer(init) = &mut program.declarations[decl].members[index] {
                    init.body = body;
                }
            }
            Member::Function(function) => {
                let function = *function;
                v.visit_function(function, program);
            }
            Member::Declaration(nested) => {
                let nested = *nested;
                walk_declaration_mut(v, nested, program);
            }
        }
    }
}

pub trait Visitor {
    fn visit_block(&mut self, block: &Block, program: &Program) {
        walk_block(self, block, program);
    }

    fn visit_stmt(&mut self, stmt: &Stmt, program: &Program) {
        walk_stmt(self, stmt, program);
    }

    fn visit_expr(&mut self, expr: &Expr, program: &Program) {
        walk_expr(self, expr, program);
    }

    fn visit_function(&mut self, function: FunctionId, program: &Program) {
        self.visit_block(&program.functions[function].body, program);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block, program: &Program) {
    for stmt in &block.statements {
        v.visit_stmt(stmt, program);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt, program: &Program) {
    match stmt {
        Stmt::Let { init, .. } => {
            if let Some(init) = init {
                v.visit_expr(init, program);
            }
        }
        Stmt::Expr(expr) => v.visit_expr(expr, program),
        Stmt::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value, program);
            }
        }
        Stmt::If {
            cond,
            then_block,
            else_block,
        } => {
            v.visit_expr(cond, program);
            v.visit_block(then_block, program);
            if let Some(else_block) = else_block {
                v.visit_block(else_block, program);
            }
        }
        Stmt::While { cond, body } => {
            v.visit_expr(cond, program);
            v.visit_block(body, program);
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr, program: &Program) {
    match expr {
        Expr::Literal(_) | Expr::GetValue(_) => {}
        Expr::SetValue { value, .. } => v.visit_expr(value, program),
        Expr::GetField { receiver, .. } => {
            if let Some(receiver) = receiver {
                v.visit_expr(receiver, program);
            }
        }
        Expr::SetField {
            receiver, value, ..
        } => {
            if let Some(receiver) = receiver {
                v.visit_expr(receiver, program);
            }
            v.visit_expr(value, program);
        }
        Expr::Call { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                v.visit_expr(receiver, program);
            }
            for arg in args {
                v.visit_expr(arg, program);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs, program);
            v.visit_expr(rhs, program);
        }
        Expr::Block(block) => v.visit_block(block, program),
        Expr::Lambda(function) => v.visit_function(*function, program),
    }
}

/// Read-only counterpart of [`walk_declaration_mut`].
pub fn walk_declaration<V: Visitor + ?Sized>(v: &mut V, decl: DeclId, program: &Program) {
    for member in &program.declarations[decl].members {
        match member {
            Member::Field(field) => {
                if let Some(init) = &program.fields[*field].initializer {
                    v.visit_expr(init, program);
                }
            }
            Member::Property(property) => {
                let owned = property
                    .backing_field
                    .filter(|field| program.fields[*field].parent == decl);
                if let Some(init) = owned.and_then(|f| program.fields[f].initializer.as_ref()) {
                    v.visit_expr(init, program);
                }
            }
            Member::Initializer(init) => v.visit_block(&init.body, program),
            Member::Function(function) => v.visit_function(*function, program),
            Member::Declaration(nested) => walk_declaration(v, *nested, program),
        }
    }
}
