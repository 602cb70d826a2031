use core::fmt;

use crate::builder::{Label, LabelTable};
use crate::instr::{Instr, Target};

/// A jump referenced a label that was never bound.
///
/// This signals a defect in the emitter, not in user input: every label
/// an emitter hands to a jump must be bound before emission finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveError {
    pub label: Label,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unresolved jump label {}", self.label)
    }
}

impl std::error::Error for ResolveError {}

/// Replace every symbolic jump operand with its absolute instruction
/// index.
///
/// Resolution is a single pass: a label's position is known the moment it
/// is bound, so no fixed-point iteration is needed. The pass is
/// idempotent — running it over an already-resolved program returns the
/// program unchanged.
pub fn resolve(
    mut instrs: Vec<Instr>,
    labels: &LabelTable,
) -> Result<Vec<Instr>, ResolveError> {
    for instr in &mut instrs {
        if let Some(target) = instr.jump_target_mut() {
            if let Target::Label(label) = *target {
                match labels.position(label) {
                    Some(pos) => *target = Target::Addr(pos as u64),
                    None => return Err(ResolveError { label }),
                }
            }
        }
    }
    Ok(instrs)
}

/// Render a resolved program in the external text format: one instruction
/// per line, newline-terminated.
pub fn render(instrs: &[Instr]) -> String {
    let mut out = String::new();
    for instr in instrs {
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}
