use core::fmt;

use crate::builder::Label;

/// The eight registers of the target machine.
///
/// Registers hold non-negative integers of unbounded precision. There is
/// no compare instruction and no relative addressing; memory is reached
/// only through [`Instr::Load`]/[`Instr::Store`], which indirect through
/// the value currently held in register `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl Reg {
    pub const COUNT: usize = 8;

    /// Position of the register in a machine-state array.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::A => "A",
            Reg::B => "B",
            Reg::C => "C",
            Reg::D => "D",
            Reg::E => "E",
            Reg::F => "F",
            Reg::G => "G",
            Reg::H => "H",
        };
        f.write_str(name)
    }
}

/// A jump operand.
///
/// Emission produces [`Target::Label`] placeholders; the resolver pass
/// ([`crate::resolve`]) rewrites every placeholder into the absolute,
/// zero-based instruction index it was bound to. Only fully resolved
/// programs are rendered or executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Absolute instruction index.
    Addr(u64),
    /// Symbolic placeholder, resolved after emission.
    Label(Label),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Addr(addr) => write!(f, "{addr}"),
            Target::Label(label) => write!(f, "@{label}"),
        }
    }
}

/// One instruction of the target machine.
///
/// The textual rendering (via [`Display`](fmt::Display)) is the external
/// program format: one instruction per line, operands space-separated,
/// jump operands as absolute indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// Read a number from input into a register.
    Get(Reg),
    /// Write a register to output.
    Put(Reg),
    /// `r := mem[A]`
    Load(Reg),
    /// `mem[A] := r`
    Store(Reg),
    /// `r1 := r1 + r2`
    Add(Reg, Reg),
    /// `r1 := max(r1 - r2, 0)`
    Sub(Reg, Reg),
    /// `r1 := r2`
    Copy(Reg, Reg),
    /// `r := r + 1`
    Inc(Reg),
    /// `r := max(r - 1, 0)`
    Dec(Reg),
    /// `r := r / 2` (floor)
    Half(Reg),
    /// Unconditional jump.
    Jump(Target),
    /// Jump if the register is zero.
    Jzero(Reg, Target),
    /// Jump if the register is odd.
    Jodd(Reg, Target),
    /// Stop the machine.
    Halt,
}

impl Instr {
    /// The jump operand of this instruction, if it has one.
    pub fn jump_target(&self) -> Option<Target> {
        match self {
            Instr::Jump(t) | Instr::Jzero(_, t) | Instr::Jodd(_, t) => Some(*t),
            _ => None,
        }
    }

    /// Mutable access to the jump operand, for the resolver.
    pub(crate) fn jump_target_mut(&mut self) -> Option<&mut Target> {
        match self {
            Instr::Jump(t) | Instr::Jzero(_, t) | Instr::Jodd(_, t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Get(r) => write!(f, "GET {r}"),
            Instr::Put(r) => write!(f, "PUT {r}"),
            Instr::Load(r) => write!(f, "LOAD {r}"),
            Instr::Store(r) => write!(f, "STORE {r}"),
            Instr::Add(r1, r2) => write!(f, "ADD {r1} {r2}"),
            Instr::Sub(r1, r2) => write!(f, "SUB {r1} {r2}"),
            Instr::Copy(r1, r2) => write!(f, "COPY {r1} {r2}"),
            Instr::Inc(r) => write!(f, "INC {r}"),
            Instr::Dec(r) => write!(f, "DEC {r}"),
            Instr::Half(r) => write!(f, "HALF {r}"),
            Instr::Jump(t) => write!(f, "JUMP {t}"),
            Instr::Jzero(r, t) => write!(f, "JZERO {r} {t}"),
            Instr::Jodd(r, t) => write!(f, "JODD {r} {t}"),
            Instr::Halt => f.write_str("HALT"),
        }
    }
}
