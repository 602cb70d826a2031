//! Interpreter for resolved register-machine programs.
//!
//! Registers and memory cells hold `u64` values; `SUB` and `DEC`
//! saturate at zero and `HALF` floors, matching the machine the
//! instruction text targets. Memory defaults to zero.

use core::fmt;
use std::collections::{HashMap, VecDeque};

use asm::{Instr, Reg, Target};

/// Aborts during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineError {
    /// A jump still carried a symbolic label. The program was never
    /// resolved.
    UnresolvedJump { pc: usize },
    /// `GET` with no input left.
    InputExhausted { pc: usize },
    /// The configured step limit ran out, a runaway loop.
    StepLimitExceeded,
    /// Execution ran past the last instruction without a `HALT`.
    PcOutOfRange { pc: usize },
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineError::UnresolvedJump { pc } => {
                write!(f, "unresolved jump at instruction {pc}")
            }
            MachineError::InputExhausted { pc } => {
                write!(f, "input exhausted at instruction {pc}")
            }
            MachineError::StepLimitExceeded => {
                f.write_str("step limit exceeded")
            }
            MachineError::PcOutOfRange { pc } => {
                write!(f, "program counter {pc} out of range")
            }
        }
    }
}

impl std::error::Error for MachineError {}

const DEFAULT_STEP_LIMIT: u64 = 10_000_000;

/// Machine state: eight registers, sparse memory, and queued input.
#[derive(Debug)]
pub struct Machine {
    regs: [u64; Reg::COUNT],
    memory: HashMap<u64, u64>,
    input: VecDeque<u64>,
    output: Vec<u64>,
    step_limit: u64,
}

impl Machine {
    pub fn new(input: Vec<u64>) -> Self {
        Self {
            regs: [0; Reg::COUNT],
            memory: HashMap::new(),
            input: input.into(),
            output: Vec::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn output(&self) -> &[u64] {
        &self.output
    }

    pub fn into_output(self) -> Vec<u64> {
        self.output
    }

    fn reg(&self, r: Reg) -> u64 {
        self.regs[r.index()]
    }

    fn target(&self, target: Target, pc: usize) -> Result<usize, MachineError> {
        match target {
            Target::Addr(addr) => Ok(addr as usize),
            Target::Label(_) => Err(MachineError::UnresolvedJump { pc }),
        }
    }

    /// Execute until `HALT`.
    pub fn run(&mut self, instrs: &[Instr]) -> Result<(), MachineError> {
        let mut pc = 0usize;
        let mut steps = 0u64;
        loop {
            if steps >= self.step_limit {
                return Err(MachineError::StepLimitExceeded);
            }
            steps += 1;
            let instr =
                instrs.get(pc).ok_or(MachineError::PcOutOfRange { pc })?;
            pc += 1;
            match *instr {
                Instr::Get(r) => {
                    let value = self
                        .input
                        .pop_front()
                        .ok_or(MachineError::InputExhausted { pc: pc - 1 })?;
                    self.regs[r.index()] = value;
                }
                Instr::Put(r) => self.output.push(self.reg(r)),
                Instr::Load(r) => {
                    let addr = self.reg(Reg::A);
                    self.regs[r.index()] =
                        self.memory.get(&addr).copied().unwrap_or(0);
                }
                Instr::Store(r) => {
                    let addr = self.reg(Reg::A);
                    self.memory.insert(addr, self.reg(r));
                }
                Instr::Add(r1, r2) => {
                    self.regs[r1.index()] =
                        self.reg(r1).saturating_add(self.reg(r2));
                }
                Instr::Sub(r1, r2) => {
                    self.regs[r1.index()] =
                        self.reg(r1).saturating_sub(self.reg(r2));
                }
                Instr::Copy(r1, r2) => self.regs[r1.index()] = self.reg(r2),
                Instr::Inc(r) => {
                    self.regs[r.index()] = self.reg(r).saturating_add(1);
                }
                Instr::Dec(r) => {
                    self.regs[r.index()] = self.reg(r).saturating_sub(1);
                }
                Instr::Half(r) => self.regs[r.index()] = self.reg(r) / 2,
                Instr::Jump(t) => pc = self.target(t, pc - 1)?,
                Instr::Jzero(r, t) => {
                    if self.reg(r) == 0 {
                        pc = self.target(t, pc - 1)?;
                    }
                }
                Instr::Jodd(r, t) => {
                    if self.reg(r) % 2 == 1 {
                        pc = self.target(t, pc - 1)?;
                    }
                }
                Instr::Halt => return Ok(()),
            }
        }
    }
}

/// Run a resolved program over the given input, returning its output.
pub fn run_program(
    instrs: &[Instr],
    input: Vec<u64>,
) -> Result<Vec<u64>, MachineError> {
    let mut machine = Machine::new(input);
    machine.run(instrs)?;
    Ok(machine.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asm::CodeBuilder;

    #[test]
    fn io_round_trips_through_registers() {
        let instrs = [Instr::Get(Reg::B), Instr::Put(Reg::B), Instr::Halt];
        assert_eq!(run_program(&instrs, vec![17]).unwrap(), vec![17]);
    }

    #[test]
    fn sub_and_dec_saturate_at_zero() {
        let instrs = [
            Instr::Inc(Reg::B),
            Instr::Inc(Reg::C),
            Instr::Inc(Reg::C),
            Instr::Sub(Reg::B, Reg::C),
            Instr::Put(Reg::B),
            Instr::Dec(Reg::B),
            Instr::Put(Reg::B),
            Instr::Halt,
        ];
        assert_eq!(run_program(&instrs, vec![]).unwrap(), vec![0, 0]);
    }

    #[test]
    fn half_floors() {
        let instrs = [
            Instr::Inc(Reg::B),
            Instr::Inc(Reg::B),
            Instr::Inc(Reg::B),
            Instr::Half(Reg::B),
            Instr::Put(Reg::B),
            Instr::Halt,
        ];
        assert_eq!(run_program(&instrs, vec![]).unwrap(), vec![1]);
    }

    #[test]
    fn unread_memory_is_zero() {
        let instrs = [Instr::Load(Reg::B), Instr::Put(Reg::B), Instr::Halt];
        assert_eq!(run_program(&instrs, vec![]).unwrap(), vec![0]);
    }

    #[test]
    fn store_and_load_indirect_through_a() {
        let instrs = [
            Instr::Inc(Reg::A),
            Instr::Inc(Reg::A),
            Instr::Inc(Reg::H),
            Instr::Store(Reg::H),
            Instr::Load(Reg::B),
            Instr::Put(Reg::B),
            Instr::Halt,
        ];
        assert_eq!(run_program(&instrs, vec![]).unwrap(), vec![1]);
    }

    #[test]
    fn output_accumulates_in_order() {
        let instrs = [
            Instr::Inc(Reg::B),
            Instr::Put(Reg::B),
            Instr::Inc(Reg::B),
            Instr::Put(Reg::B),
            Instr::Halt,
        ];
        let mut machine = Machine::new(vec![]);
        machine.run(&instrs).unwrap();
        assert_eq!(machine.output(), &[1, 2]);
    }

    #[test]
    fn missing_input_aborts() {
        let instrs = [Instr::Get(Reg::B), Instr::Halt];
        assert_eq!(
            run_program(&instrs, vec![]).unwrap_err(),
            MachineError::InputExhausted { pc: 0 }
        );
    }

    #[test]
    fn unresolved_jump_aborts() {
        let mut builder = CodeBuilder::new();
        let label = builder.fresh_label();
        let instrs = [Instr::Jump(Target::Label(label)), Instr::Halt];
        assert!(matches!(
            run_program(&instrs, vec![]).unwrap_err(),
            MachineError::UnresolvedJump { pc: 0 }
        ));
    }

    #[test]
    fn runaway_loop_hits_the_step_limit() {
        let instrs = [Instr::Jump(Target::Addr(0)), Instr::Halt];
        let mut machine = Machine::new(vec![]).with_step_limit(1_000);
        assert_eq!(
            machine.run(&instrs).unwrap_err(),
            MachineError::StepLimitExceeded
        );
    }

    #[test]
    fn falling_off_the_end_aborts() {
        let instrs = [Instr::Inc(Reg::B)];
        assert_eq!(
            run_program(&instrs, vec![]).unwrap_err(),
            MachineError::PcOutOfRange { pc: 1 }
        );
    }
}
