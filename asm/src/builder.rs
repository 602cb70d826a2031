use core::fmt;
use std::collections::HashMap;

use crate::instr::{Instr, Reg, Target};

/// A symbolic jump target.
///
/// Created by [`CodeBuilder::fresh_label`] and attached to an instruction
/// index with [`CodeBuilder::bind`]. A label may be referenced by any
/// number of jumps, before or after the position it is bound to, but it
/// must be bound exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Label → instruction-index table produced alongside an emitted program.
///
/// Several labels may share one index (co-located labels at a loop end);
/// a single label never maps to two indices.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    positions: HashMap<Label, usize>,
}

impl LabelTable {
    /// Absolute instruction index the label was bound to.
    pub fn position(&self, label: Label) -> Option<usize> {
        self.positions.get(&label).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Builds a linear instruction sequence with symbolic jump targets.
///
/// The builder owns the growing program; the current length doubles as
/// the program counter, so binding a label simply records the index the
/// next pushed instruction will occupy.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    instrs: Vec<Instr>,
    labels: LabelTable,
    next_label: u32,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions emitted so far (the current pc).
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn push(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    /// A new, unbound label.
    pub fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Bind `label` to the position of the next pushed instruction.
    pub fn bind(&mut self, label: Label) {
        let previous = self.labels.positions.insert(label, self.instrs.len());
        debug_assert!(previous.is_none(), "label {label} bound twice");
    }

    /// `JUMP label`
    pub fn jump(&mut self, label: Label) {
        self.instrs.push(Instr::Jump(Target::Label(label)));
    }

    /// `JZERO r label`
    pub fn jzero(&mut self, reg: Reg, label: Label) {
        self.instrs.push(Instr::Jzero(reg, Target::Label(label)));
    }

    /// `JODD r label`
    pub fn jodd(&mut self, reg: Reg, label: Label) {
        self.instrs.push(Instr::Jodd(reg, Target::Label(label)));
    }

    /// Finish emission, yielding the instruction list and label table for
    /// the resolver.
    pub fn finish(self) -> (Vec<Instr>, LabelTable) {
        (self.instrs, self.labels)
    }
}
