//! Expression and statement nodes.
//!
//! Expressions own their children. Every reference to a field, variable or
//! function goes through an arena id so that references can be repointed
//! without chasing pointers.

use super::{FieldId, FunctionId, VarId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Eq,
    Lt,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Eq => "==",
            BinaryOp::Lt => "<",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Read of a variable, parameter or receiver.
    GetValue(VarId),
    SetValue {
        var: VarId,
        value: Box<Expr>,
    },
    /// Field load. Static fields have no receiver.
    GetField {
        field: FieldId,
        receiver: Option<Box<Expr>>,
    },
    SetField {
        field: FieldId,
        receiver: Option<Box<Expr>>,
        value: Box<Expr>,
    },
    Call {
        callee: String,
        receiver: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Statement block used in expression position; its value is the value of
    /// the last expression statement.
    Block(Block),
    Lambda(FunctionId),
}

impl Expr {
    pub fn get_field(field: FieldId, receiver: Option<Expr>) -> Self {
        Expr::GetField {
            field,
            receiver: receiver.map(Box::new),
        }
    }

    pub fn set_field(field: FieldId, receiver: Option<Expr>, value: Expr) -> Self {
        Expr::SetField {
            field,
            receiver: receiver.map(Box::new),
            value: Box::new(value),
        }
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Int(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Declares a local variable.
    Let { var: VarId, init: Option<Expr> },
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While { cond: Expr, body: Block },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Block { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
