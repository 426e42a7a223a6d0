//! Deterministic textual dump of a [`Program`].
//!
//! Every field, variable and function reference is printed with its arena
//! index, so two dumps are equal only if the trees are equal
//! reference-for-reference. One member or statement per line; nested code
//! blocks are printed inline.

use crate::ir::{
    Block, DeclId, Expr, FieldFlags, FieldId, FunctionId, Item, Member, Program, Stmt, VarId,
    Visibility,
};
use std::fmt::Write;

pub fn print_program(program: &Program) -> String {
    let mut printer = Printer {
        program,
        out: String::new(),
        indent: 0,
    };
    printer.line(&format!("program {}", program.name));
    for item in &program.items {
        match item {
            Item::Declaration(decl) => printer.declaration(*decl),
            Item::Function(function) => {
                let text = printer.function(*function);
                printer.line(&text);
            }
        }
    }
    printer.out
}

/// Prints a single declaration subtree.
pub fn print_declaration(program: &Program, decl: DeclId) -> String {
    let mut printer = Printer {
        program,
        out: String::new(),
        indent: 0,
    };
    printer.declaration(decl);
    printer.out
}

/// Prints an expression on one line.
pub fn print_expr(program: &Program, expr: &Expr) -> String {
    let printer = Printer {
        program,
        out: String::new(),
        indent: 0,
    };
    printer.expr(expr)
}

struct Printer<'p> {
    program: &'p Program,
    out: String,
    indent: usize,
}

impl<'p> Printer<'p> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn declaration(&mut self, decl: DeclId) {
        let program = self.program;
        let d = &program.declarations[decl];
        let mut header = String::new();
        if d.visibility != Visibility::Public {
            let _ = write!(header, "{} ", d.visibility);
        }
        if d.is_local {
            header.push_str("local ");
        }
        let _ = write!(header, "{} {}", d.kind, d.name);
        if let Some(this) = d.this_receiver {
            let _ = write!(header, " ({})", self.var(this));
        }
        header.push_str(" {");
        self.line(&header);
        self.indent += 1;
        for member in &d.members {
            match member {
                Member::Field(field) => {
                    let text = self.field(*field);
                    self.line(&text);
                }
                Member::Property(property) => {
                    let mut text = format!("property {} -> ", property.name);
                    match property.backing_field {
                        Some(field) => {
                            let _ = write!(text, "f{}", field.index());
                        }
                        None => text.push_str("none"),
                    }
                    if property.is_const {
                        text.push_str(" [const]");
                    }
                    if property.is_fake_override {
                        text.push_str(" [fake]");
                    }
                    self.line(&text);
                    let owned = property
                        .backing_field
                        .filter(|f| program.fields[*f].parent == decl);
                    if let Some(field) = owned {
                        self.indent += 1;
                        let text = self.field(field);
                        self.line(&text);
                        self.indent -= 1;
                    }
                }
                Member::Initializer(init) => {
                    let prefix = if init.is_static { "static init " } else { "init " };
                    let text = format!("{}{}", prefix, self.block(&init.body));
                    self.line(&text);
                }
                Member::Function(function) => {
                    let text = self.function(*function);
                    self.line(&text);
                }
                Member::Declaration(nested) => self.declaration(*nested),
            }
        }
        self.indent -= 1;
        self.line("}");
    }

    fn field(&self, field: FieldId) -> String {
        let f = &self.program.fields[field];
        let mut text = format!("field {}#f{}: {}", f.name, field.index(), f.ty);
        if f.visibility != Visibility::Public {
            let _ = write!(text, " {}", f.visibility);
        }
        let mut flags = Vec::new();
        if f.flags.contains(FieldFlags::STATIC) {
            flags.push("static");
        }
        if f.flags.contains(FieldFlags::FINAL) {
            flags.push("final");
        }
        if f.flags.contains(FieldFlags::EXTERNAL) {
            flags.push("external");
        }
        if !flags.is_empty() {
            let _ = write!(text, " [{}]", flags.join(", "));
        }
        for annotation in &f.annotations {
            let _ = write!(text, " @{}", annotation.name);
        }
        if let Some(init) = &f.initializer {
            let _ = write!(text, " = {}", self.expr(init));
        }
        text
    }

    fn function(&self, function: FunctionId) -> String {
        let f = &self.program.functions[function];
        let params: Vec<String> = f.params.iter().map(|p| self.var(*p)).collect();
        format!("fun {}({}) {}", f.name, params.join(", "), self.block(&f.body))
    }

    fn var(&self, var: VarId) -> String {
        format!("{}%{}", self.program.variables[var].name, var.index())
    }

    fn field_ref(&self, field: FieldId) -> String {
        format!("{}#f{}", self.program.fields[field].name, field.index())
    }

    fn static_field_ref(&self, field: FieldId) -> String {
        let owner = self.program.qualified_name(self.program.fields[field].parent);
        format!("{}::{}", owner, self.field_ref(field))
    }

    fn block(&self, block: &Block) -> String {
        if block.is_empty() {
            return "{ }".to_string();
        }
        let stmts: Vec<String> = block.statements.iter().map(|s| self.stmt(s)).collect();
        format!("{{ {} }}", stmts.join("; "))
    }

    fn stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Let { var, init } => match init {
                Some(init) => format!("let {} = {}", self.var(*var), self.expr(init)),
                None => format!("let {}", self.var(*var)),
            },
            Stmt::Expr(expr) => self.expr(expr),
            Stmt::Return(Some(value)) => format!("return {}", self.expr(value)),
            Stmt::Return(None) => "return".to_string(),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let mut text = format!("if {} {}", self.expr(cond), self.block(then_block));
                if let Some(else_block) = else_block {
                    let _ = write!(text, " else {}", self.block(else_block));
                }
                text
            }
            Stmt::While { cond, body } => {
                format!("while {} {}", self.expr(cond), self.block(body))
            }
        }
    }

    fn expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(lit) => lit.to_string(),
            Expr::GetValue(var) => self.var(*var),
            Expr::SetValue { var, value } => {
                format!("{} = {}", self.var(*var), self.expr(value))
            }
            Expr::GetField { field, receiver } => match receiver {
                Some(receiver) => format!("{}.{}", self.expr(receiver), self.field_ref(*field)),
                None => self.static_field_ref(*field),
            },
            Expr::SetField {
                field,
                receiver,
                value,
            } => {
                let target = match receiver {
                    Some(receiver) => format!("{}.{}", self.expr(receiver), self.field_ref(*field)),
                    None => self.static_field_ref(*field),
                };
                format!("{} = {}", target, self.expr(value))
            }
            Expr::Call {
                callee,
                receiver,
                args,
            } => {
                let args: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                match receiver {
                    Some(receiver) => {
                        format!("{}.{}({})", self.expr(receiver), callee, args.join(", "))
                    }
                    None => format!("{}({})", callee, args.join(", ")),
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                format!("({} {} {})", self.expr(lhs), op.symbol(), self.expr(rhs))
            }
            Expr::Block(block) => self.block(block),
            Expr::Lambda(function) => {
                let f = &self.program.functions[*function];
                let params: Vec<String> = f.params.iter().map(|p| self.var(*p)).collect();
                format!("lambda({}) {}", params.join(", "), self.block(&f.body))
            }
        }
    }
}
