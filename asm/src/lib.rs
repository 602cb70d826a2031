//! Target instruction set and emission support for the register machine.
//!
//! The machine has eight unbounded non-negative integer registers
//! (`A`–`H`), a flat memory addressed through register `A`, and fourteen
//! instructions; jumps go to absolute, zero-based instruction indices.
//!
//! Emission is two-phase. Phase one builds a [`CodeBuilder`] program
//! whose jump operands are symbolic [`Label`]s, recording each label's
//! bound position in a [`LabelTable`]. Phase two, [`resolve`], is a pure
//! function that rewrites every label into its absolute index.

mod builder;
mod instr;
mod resolve;

pub use builder::{CodeBuilder, Label, LabelTable};
pub use instr::{Instr, Reg, Target};
pub use resolve::{ResolveError, render, resolve};
