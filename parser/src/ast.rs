//! Abstract syntax of a source program.
//!
//! A program is a declaration block followed by a command block. All
//! values are non-negative integers; expressions are a single binary
//! operation or a plain value, never nested.

/// Whole program: `DECLARE decls IN body END`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub decls: Vec<Decl>,
    pub body: Vec<Stmt>,
}

/// One entry of the declaration block.
///
/// The line number feeds duplicate-declaration and bad-bounds errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Scalar { name: String, line: usize },
    Array { name: String, line: usize, from: u64, to: u64 },
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Scalar { name, .. } | Decl::Array { name, .. } => name,
        }
    }
}

/// An array subscript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    Literal(u64),
    Variable(String),
}

/// A storage location: a scalar or one array element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ident {
    Scalar(String),
    Element { array: String, index: Index },
}

/// A value position: a numeric literal or the contents of a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(u64),
    Ident(Ident),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Lt => "<",
            RelOp::Gt => ">",
            RelOp::Le => "<=",
            RelOp::Ge => ">=",
            RelOp::Eq => "=",
            RelOp::Ne => "!=",
        }
    }
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Value(Value),
    Binary { lhs: Value, op: ArithOp, rhs: Value },
}

/// A relational test between two values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub lhs: Value,
    pub op: RelOp,
    pub rhs: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assign { target: Ident, expr: Expr },
    Read { target: Ident },
    Write { value: Value },
    If { cond: Condition, body: Vec<Stmt> },
    IfElse { cond: Condition, then_body: Vec<Stmt>, else_body: Vec<Stmt> },
    While { cond: Condition, body: Vec<Stmt> },
    DoWhile { body: Vec<Stmt>, cond: Condition },
    For { iter: String, from: Value, to: Value, body: Vec<Stmt> },
    ForDownTo { iter: String, from: Value, to: Value, body: Vec<Stmt> },
}
