use asm::{CodeBuilder, Instr, Label, LabelTable, Reg};

use crate::error::CodegenError;
use crate::table::{AllocationTable, SymbolKind, lbound_name, ubound_name};
use parser::ast::{Condition, Expr, Ident, Index, RelOp, Stmt, Value};

/// Translates a command block into machine instructions with symbolic
/// jump targets.
///
/// Register convention:
///
/// - `A` holds the memory address for every `LOAD`/`STORE`
/// - `B` holds the first operand and every expression result
/// - `C` holds the second operand
/// - `D` accumulates products and quotients
/// - `E` tracks the running multiplier during division
/// - `F` holds the remainder, and the left operand of comparisons
/// - `G` holds the right operand of comparisons, and array scratch
/// - `H` stages values across address materialization
pub struct Emitter<'a> {
    table: &'a AllocationTable,
    code: CodeBuilder,
}

impl<'a> Emitter<'a> {
    pub fn new(table: &'a AllocationTable) -> Self {
        Self { table, code: CodeBuilder::new() }
    }

    /// Emit the whole command block followed by `HALT`.
    pub fn emit_program(
        mut self,
        body: &[Stmt],
    ) -> Result<(Vec<Instr>, LabelTable), CodegenError> {
        self.emit_block(body)?;
        self.code.push(Instr::Halt);
        Ok(self.code.finish())
    }

    fn emit_block(&mut self, body: &[Stmt]) -> Result<(), CodegenError> {
        for stmt in body {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Assign { target, expr } => {
                self.emit_expr(expr)?;
                self.place_address(target)?;
                self.code.push(Instr::Store(Reg::B));
                Ok(())
            }
            Stmt::Read { target } => {
                self.place_address(target)?;
                self.code.push(Instr::Get(Reg::H));
                self.code.push(Instr::Store(Reg::H));
                Ok(())
            }
            Stmt::Write { value } => {
                self.load_value(value, Reg::B)?;
                self.code.push(Instr::Put(Reg::B));
                Ok(())
            }
            Stmt::If { cond, body } => {
                let skip = self.code.fresh_label();
                self.emit_condition(cond, skip)?;
                self.emit_block(body)?;
                self.code.bind(skip);
                Ok(())
            }
            Stmt::IfElse { cond, then_body, else_body } => {
                let else_l = self.code.fresh_label();
                let end = self.code.fresh_label();
                self.emit_condition(cond, else_l)?;
                self.emit_block(then_body)?;
                self.code.jump(end);
                self.code.bind(else_l);
                self.emit_block(else_body)?;
                self.code.bind(end);
                Ok(())
            }
            Stmt::While { cond, body } => {
                let top = self.code.fresh_label();
                let end = self.code.fresh_label();
                self.code.bind(top);
                self.emit_condition(cond, end)?;
                self.emit_block(body)?;
                self.code.jump(top);
                self.code.bind(end);
                Ok(())
            }
            Stmt::DoWhile { body, cond } => {
                let top = self.code.fresh_label();
                let end = self.code.fresh_label();
                self.code.bind(top);
                self.emit_block(body)?;
                self.emit_condition(cond, end)?;
                self.code.jump(top);
                self.code.bind(end);
                Ok(())
            }
            Stmt::For { iter, from, to, body } => {
                self.emit_for(iter, from, to, body, true)
            }
            Stmt::ForDownTo { iter, from, to, body } => {
                self.emit_for(iter, from, to, body, false)
            }
        }
    }

    /// Counted loop over a snapshot of the bound.
    ///
    /// The bound is copied into the iterator's shadow cell before the
    /// first test, so reassigning its source inside the body cannot
    /// change the trip count. The descending loop tests for zero before
    /// decrementing; decrement saturates, so `DOWNTO 0` would otherwise
    /// never terminate.
    fn emit_for(
        &mut self,
        iter: &str,
        from: &Value,
        to: &Value,
        body: &[Stmt],
        ascending: bool,
    ) -> Result<(), CodegenError> {
        let iter_cell = self.table.resolve(iter)?.cell;
        let shadow =
            if ascending { ubound_name(iter) } else { lbound_name(iter) };
        let shadow_cell = self.table.resolve(&shadow)?.cell;

        self.load_value(from, Reg::H)?;
        self.materialize(iter_cell, Reg::A);
        self.code.push(Instr::Store(Reg::H));
        self.load_value(to, Reg::H)?;
        self.materialize(shadow_cell, Reg::A);
        self.code.push(Instr::Store(Reg::H));

        let top = self.code.fresh_label();
        let end = self.code.fresh_label();
        self.code.bind(top);
        self.materialize(iter_cell, Reg::A);
        self.code.push(Instr::Load(Reg::F));
        self.materialize(shadow_cell, Reg::A);
        self.code.push(Instr::Load(Reg::G));
        if ascending {
            // Continue while iter <= bound.
            self.code.push(Instr::Inc(Reg::G));
            self.code.push(Instr::Sub(Reg::G, Reg::F));
            self.code.jzero(Reg::G, end);
        } else {
            // Continue while iter >= bound.
            self.code.push(Instr::Inc(Reg::F));
            self.code.push(Instr::Sub(Reg::F, Reg::G));
            self.code.jzero(Reg::F, end);
        }

        self.emit_block(body)?;

        self.materialize(iter_cell, Reg::A);
        self.code.push(Instr::Load(Reg::B));
        if ascending {
            self.code.push(Instr::Inc(Reg::B));
        } else {
            self.code.jzero(Reg::B, end);
            self.code.push(Instr::Dec(Reg::B));
        }
        self.code.push(Instr::Store(Reg::B));
        self.code.jump(top);
        self.code.bind(end);
        Ok(())
    }

    /// Evaluate the condition; fall through when it holds, jump to
    /// `skip` when it does not.
    ///
    /// There is no compare instruction, so every test is a saturating
    /// subtraction followed by a zero test. Left operand lands in `F`,
    /// right in `G`.
    fn emit_condition(
        &mut self,
        cond: &Condition,
        skip: Label,
    ) -> Result<(), CodegenError> {
        self.load_value(&cond.lhs, Reg::F)?;
        self.load_value(&cond.rhs, Reg::G)?;
        match cond.op {
            RelOp::Gt => {
                self.code.push(Instr::Sub(Reg::F, Reg::G));
                self.code.jzero(Reg::F, skip);
            }
            RelOp::Lt => {
                self.code.push(Instr::Sub(Reg::G, Reg::F));
                self.code.jzero(Reg::G, skip);
            }
            RelOp::Ge => {
                self.code.push(Instr::Inc(Reg::F));
                self.code.push(Instr::Sub(Reg::F, Reg::G));
                self.code.jzero(Reg::F, skip);
            }
            RelOp::Le => {
                self.code.push(Instr::Inc(Reg::G));
                self.code.push(Instr::Sub(Reg::G, Reg::F));
                self.code.jzero(Reg::G, skip);
            }
            RelOp::Eq => {
                // rhs+1-lhs is 1 exactly when the operands are equal.
                let hold = self.code.fresh_label();
                self.code.push(Instr::Inc(Reg::G));
                self.code.push(Instr::Sub(Reg::G, Reg::F));
                self.code.jzero(Reg::G, skip);
                self.code.push(Instr::Dec(Reg::G));
                self.code.jzero(Reg::G, hold);
                self.code.jump(skip);
                self.code.bind(hold);
            }
            RelOp::Ne => {
                let hold = self.code.fresh_label();
                self.code.push(Instr::Inc(Reg::G));
                self.code.push(Instr::Sub(Reg::G, Reg::F));
                self.code.jzero(Reg::G, hold);
                self.code.push(Instr::Dec(Reg::G));
                self.code.jzero(Reg::G, skip);
                self.code.bind(hold);
            }
        }
        Ok(())
    }

    /// Evaluate an expression into `B`.
    fn emit_expr(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        match expr {
            Expr::Value(value) => self.load_value(value, Reg::B),
            Expr::Binary { lhs, op, rhs } => {
                self.load_value(lhs, Reg::B)?;
                self.load_value(rhs, Reg::C)?;
                match op {
                    parser::ArithOp::Add => {
                        self.code.push(Instr::Add(Reg::B, Reg::C));
                    }
                    parser::ArithOp::Sub => {
                        self.code.push(Instr::Sub(Reg::B, Reg::C));
                    }
                    parser::ArithOp::Mul => self.emit_mul(),
                    parser::ArithOp::Div => self.emit_divmod(true),
                    parser::ArithOp::Mod => self.emit_divmod(false),
                }
                Ok(())
            }
        }
    }

    /// `B := B * C` by binary decomposition of `C`.
    ///
    /// Doubles `B` and halves `C` each round, adding `B` into `D` on odd
    /// `C`. Cost is logarithmic in the smaller-magnitude operand's bits.
    fn emit_mul(&mut self) {
        let check = self.code.fresh_label();
        let odd = self.code.fresh_label();
        let end = self.code.fresh_label();

        self.code.push(Instr::Sub(Reg::D, Reg::D));
        self.code.bind(check);
        self.code.jzero(Reg::C, end);
        self.code.jodd(Reg::C, odd);
        self.code.push(Instr::Add(Reg::B, Reg::B));
        self.code.push(Instr::Half(Reg::C));
        self.code.jump(check);
        self.code.bind(odd);
        self.code.push(Instr::Add(Reg::D, Reg::B));
        self.code.push(Instr::Add(Reg::B, Reg::B));
        self.code.push(Instr::Half(Reg::C));
        self.code.jump(check);
        self.code.bind(end);
        self.code.push(Instr::Copy(Reg::B, Reg::D));
    }

    /// Long division of `B` by `C`.
    ///
    /// Grows the divisor to just above the dividend, then walks it back
    /// down subtracting where it fits. Quotient accumulates in `D`,
    /// remainder stays in `F`; the surfaced register is the only
    /// difference between `/` and `%`. Division by zero yields quotient
    /// zero and remainder zero.
    fn emit_divmod(&mut self, quotient: bool) {
        let grow = self.code.fresh_label();
        let dbl = self.code.fresh_label();
        let shrink = self.code.fresh_label();
        let subtract = self.code.fresh_label();
        let skip = self.code.fresh_label();
        let zero = self.code.fresh_label();
        let end = self.code.fresh_label();

        self.code.push(Instr::Sub(Reg::D, Reg::D));
        self.code.push(Instr::Sub(Reg::E, Reg::E));
        self.code.push(Instr::Inc(Reg::E));
        self.code.push(Instr::Copy(Reg::F, Reg::B));
        self.code.jzero(Reg::C, zero);

        self.code.bind(grow);
        self.code.push(Instr::Copy(Reg::H, Reg::C));
        self.code.push(Instr::Inc(Reg::H));
        self.code.push(Instr::Sub(Reg::H, Reg::F));
        self.code.jzero(Reg::H, dbl);
        self.code.jump(shrink);
        self.code.bind(dbl);
        self.code.push(Instr::Add(Reg::C, Reg::C));
        self.code.push(Instr::Add(Reg::E, Reg::E));
        self.code.jump(grow);

        self.code.bind(shrink);
        self.code.push(Instr::Copy(Reg::H, Reg::C));
        self.code.push(Instr::Sub(Reg::H, Reg::F));
        self.code.jzero(Reg::H, subtract);
        self.code.jump(skip);
        self.code.bind(subtract);
        self.code.push(Instr::Sub(Reg::F, Reg::C));
        self.code.push(Instr::Add(Reg::D, Reg::E));
        self.code.bind(skip);
        self.code.push(Instr::Half(Reg::C));
        self.code.push(Instr::Half(Reg::E));
        self.code.jzero(Reg::E, end);
        self.code.jump(shrink);

        self.code.bind(zero);
        self.code.push(Instr::Sub(Reg::F, Reg::F));
        self.code.bind(end);
        let result = if quotient { Reg::D } else { Reg::F };
        self.code.push(Instr::Copy(Reg::B, result));
    }

    /// Load a value into `target`, clobbering `A`, `G`, and `H`.
    fn load_value(
        &mut self,
        value: &Value,
        target: Reg,
    ) -> Result<(), CodegenError> {
        match value {
            Value::Literal(v) => {
                self.materialize(*v, target);
                Ok(())
            }
            Value::Ident(ident) => {
                self.place_address(ident)?;
                self.code.push(Instr::Load(target));
                Ok(())
            }
        }
    }

    /// Leave the address of a storage location in `A`.
    ///
    /// A literal subscript is range-checked and folded into the address
    /// at compile time; a variable subscript is computed at run time
    /// through `G` and `H`, unchecked.
    fn place_address(&mut self, ident: &Ident) -> Result<(), CodegenError> {
        match ident {
            Ident::Scalar(name) => {
                let cell = self.table.resolve(name)?.cell;
                self.materialize(cell, Reg::A);
                Ok(())
            }
            Ident::Element { array, index } => {
                let symbol = self.table.resolve(array)?;
                let SymbolKind::Array { from, to } = symbol.kind else {
                    return Err(CodegenError::UnboundVariable {
                        name: array.clone(),
                    });
                };
                let base = symbol.cell;
                match index {
                    Index::Literal(i) => {
                        if *i < from || *i > to {
                            return Err(CodegenError::IndexOutOfRange {
                                array: array.clone(),
                                index: *i,
                                from,
                                to,
                            });
                        }
                        let cell = base + 1 + (i - from);
                        self.materialize(cell, Reg::A);
                        Ok(())
                    }
                    Index::Variable(pid) => {
                        let idx_cell = self.table.resolve(pid)?.cell;
                        self.materialize(idx_cell, Reg::A);
                        self.code.push(Instr::Load(Reg::G));
                        self.materialize(from, Reg::H);
                        self.code.push(Instr::Sub(Reg::G, Reg::H));
                        self.materialize(base + 1, Reg::H);
                        self.code.push(Instr::Add(Reg::G, Reg::H));
                        self.code.push(Instr::Copy(Reg::A, Reg::G));
                        Ok(())
                    }
                }
            }
        }
    }

    /// Set `reg` to a constant.
    fn materialize(&mut self, value: u64, reg: Reg) {
        self.code.push(Instr::Sub(reg, reg));
        self.append_constant(value, reg);
    }

    /// Add a constant to a zeroed `reg`.
    ///
    /// Small constants are unary increments; from ten upward the binary
    /// expansion is cheaper, doubling and incrementing from the most
    /// significant bit down.
    fn append_constant(&mut self, value: u64, reg: Reg) {
        if value == 0 {
            return;
        }
        if value < 10 {
            for _ in 0..value {
                self.code.push(Instr::Inc(reg));
            }
            return;
        }
        let bits = u64::from(64 - value.leading_zeros());
        for i in (0..bits).rev() {
            if i + 1 < bits {
                self.code.push(Instr::Add(reg, reg));
            }
            if (value >> i) & 1 == 1 {
                self.code.push(Instr::Inc(reg));
            }
        }
    }
}
