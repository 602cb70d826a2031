//! Lexer, parser, and syntax tree for the source language.
//!
//! The language is a small imperative one: a `DECLARE ... IN ... END`
//! skeleton, scalar and bounded-array variables, assignment with a single
//! binary operation, `IF`/`WHILE`/`DO`/`FOR` control flow, and `READ`/
//! `WRITE` I/O. [`parse`] turns source text into a [`Program`] or a
//! [`ParseError`] carrying the offending line.

pub mod ast;
mod lexer;
mod parser;
mod token;

pub use ast::{
    ArithOp, Condition, Decl, Expr, Ident, Index, Program, RelOp, Stmt, Value,
};
pub use lexer::Lexer;
pub use parser::{ParseError, parse};
pub use token::{Token, TokenKind};
