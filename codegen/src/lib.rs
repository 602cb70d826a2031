//! Code generation: allocation, usage-weighted cell ordering, and
//! instruction emission for the register machine.
//!
//! The pipeline is [`declare_program`] to build the allocation table,
//! then [`compile`] (or [`compile_to_instrs`]) to produce a fully
//! resolved program. Both passes are deterministic: the same syntax tree
//! always yields the same instruction text.

mod emit;
mod error;
pub mod table;
pub mod usage;

pub use emit::Emitter;
pub use error::CodegenError;
pub use table::{AllocationTable, Symbol, SymbolKind};

use parser::ast::{ArithOp, Decl, Program, RelOp, Stmt};
use table::{lbound_name, ubound_name};

/// Build the allocation table: user declarations in source order, then
/// loop iterators and their bound-snapshot cells.
pub fn declare_program(
    program: &Program,
) -> Result<AllocationTable, CodegenError> {
    let mut table = AllocationTable::new();
    for decl in &program.decls {
        match decl {
            Decl::Scalar { name, line } => {
                table.declare(name, *line, SymbolKind::Scalar {
                    iterator: false,
                })?;
            }
            Decl::Array { name, line, from, to } => {
                table.declare(name, *line, SymbolKind::Array {
                    from: *from,
                    to: *to,
                })?;
            }
        }
    }
    declare_iterators(&program.body, &mut table)?;
    Ok(table)
}

/// Declare every `FOR` iterator reachable from `body`.
///
/// An iterator may share its name with a declared scalar, which is then
/// upgraded in place; colliding with an array is an error. Shadow cells
/// carry line 0, marking them as implicit.
fn declare_iterators(
    body: &[Stmt],
    table: &mut AllocationTable,
) -> Result<(), CodegenError> {
    for stmt in body {
        match stmt {
            Stmt::For { iter, body, .. }
            | Stmt::ForDownTo { iter, body, .. } => {
                declare_iterator(iter, table)?;
                declare_iterators(body, table)?;
            }
            Stmt::If { body, .. } => declare_iterators(body, table)?,
            Stmt::IfElse { then_body, else_body, .. } => {
                declare_iterators(then_body, table)?;
                declare_iterators(else_body, table)?;
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => {
                declare_iterators(body, table)?;
            }
            Stmt::Assign { .. } | Stmt::Read { .. } | Stmt::Write { .. } => {}
        }
    }
    Ok(())
}

fn declare_iterator(
    iter: &str,
    table: &mut AllocationTable,
) -> Result<(), CodegenError> {
    match table.get(iter).map(|s| s.kind) {
        None => {
            table.declare(iter, 0, SymbolKind::Scalar { iterator: true })?;
        }
        Some(SymbolKind::Scalar { iterator: false }) => {
            table.promote_iterator(iter);
        }
        // Two loops may share one iterator; the shadows already exist.
        Some(SymbolKind::Scalar { iterator: true }) => return Ok(()),
        Some(SymbolKind::Array { .. }) | Some(SymbolKind::Shadow) => {
            let line = table.get(iter).map_or(0, |s| s.line);
            return Err(CodegenError::DuplicateDeclaration {
                name: iter.to_owned(),
                line,
            });
        }
    }
    table.declare(&lbound_name(iter), 0, SymbolKind::Shadow)?;
    table.declare(&ubound_name(iter), 0, SymbolKind::Shadow)?;
    Ok(())
}

/// Compile to a resolved instruction list.
pub fn compile_to_instrs(
    program: &Program,
    table: AllocationTable,
) -> Result<Vec<asm::Instr>, CodegenError> {
    let table = usage::optimize(table, &program.body);
    log::debug!("allocation spans {} cells", table.next_free());
    let (instrs, labels) = Emitter::new(&table).emit_program(&program.body)?;
    Ok(asm::resolve(instrs, &labels)?)
}

/// Compile to the external instruction text.
pub fn compile(
    program: &Program,
    table: AllocationTable,
) -> Result<String, CodegenError> {
    Ok(asm::render(&compile_to_instrs(program, table)?))
}

/// Map an operator symbol to its arithmetic operation.
pub fn arith_op(symbol: &str) -> Result<ArithOp, CodegenError> {
    match symbol {
        "+" => Ok(ArithOp::Add),
        "-" => Ok(ArithOp::Sub),
        "*" => Ok(ArithOp::Mul),
        "/" => Ok(ArithOp::Div),
        "%" => Ok(ArithOp::Mod),
        other => Err(CodegenError::UnsupportedOperator(other.to_owned())),
    }
}

/// Map an operator symbol to its relational operation.
pub fn rel_op(symbol: &str) -> Result<RelOp, CodegenError> {
    match symbol {
        "<" => Ok(RelOp::Lt),
        ">" => Ok(RelOp::Gt),
        "<=" => Ok(RelOp::Le),
        ">=" => Ok(RelOp::Ge),
        "=" => Ok(RelOp::Eq),
        "!=" => Ok(RelOp::Ne),
        other => Err(CodegenError::UnsupportedOperator(other.to_owned())),
    }
}
