use std::ops::ControlFlow;

use bitvec::prelude::*;
use tracing::{debug, error, trace};

use crate::context::Context;
use crate::cpu::Fault;
use crate::instructions;

/// Instruction handler. Receives the opcode word and the auxiliary value it
/// was installed with; advances the PC itself.
pub type Handler = fn(&mut Context<'_>, u16, u32) -> Result<(), Fault>;

#[derive(Clone, Copy)]
struct Entry {
    handler: Handler,
    data: u32,
}

const ILLEGAL: Entry = Entry {
    handler: illegal,
    data: 0,
};

fn illegal(ctx: &mut Context<'_>, _op: u16, _data: u32) -> Result<(), Fault> {
    Err(ctx.illegal())
}

/// Opcode dispatch table: one slot per 16-bit opcode.
pub struct ExecUnit {
    table: Box<[Entry]>,
    installed: BitVec,
}

impl Default for ExecUnit {
    fn default() -> Self {
        Self::mc68000()
    }
}

impl ExecUnit {
    /// A table in which every opcode is illegal.
    pub fn new() -> Self {
        Self {
            table: vec![ILLEGAL; 0x10000].into_boxed_slice(),
            installed: bitvec![0; 0x10000],
        }
    }

    /// A table with the MC68000 instruction set installed.
    pub fn mc68000() -> Self {
        let mut unit = Self::new();
        instructions::install(&mut unit);
        unit
    }

    /// Installs `handler` at every opcode `base | m` where `m` ranges over
    /// all subsets of `mask`. Later installs override earlier ones.
    pub fn set_instruction(&mut self, base: u16, mask: u16, handler: Handler, data: u32) {
        for op in pattern(base, mask) {
            if self.installed[op] {
                debug!("replacing handler at {:#06x}", op);
            }
            self.table[op] = Entry { handler, data };
            self.installed.set(op, true);
        }
    }

    /// Built-in installation: every slot touched must still be free.
    pub(crate) fn install(&mut self, base: u16, mask: u16, handler: Handler, data: u32) {
        for op in pattern(base, mask) {
            debug_assert!(!self.installed[op], "opcode {:#06x} installed twice", op);
            self.table[op] = Entry { handler, data };
            self.installed.set(op, true);
        }
    }

    pub fn is_installed(&self, opcode: u16) -> bool {
        self.installed[opcode as usize]
    }

    /// Number of opcodes with a handler other than the illegal default.
    pub fn installed_count(&self) -> usize {
        self.installed.count_ones()
    }

    /// Executes one instruction. Breaks with the exit status when a handler
    /// requested an exit.
    pub fn step(&self, ctx: &mut Context<'_>) -> Result<ControlFlow<i32>, Fault> {
        ctx.sync_function_codes();
        ctx.handle_interrupts()?;
        let pc = ctx.regs.pc;
        let op = ctx.fetch_word(0)?;
        ctx.set_opcode(op);
        trace!("{:#08x}: {:04x}", pc, op);
        let entry = self.table[op as usize];
        (entry.handler)(ctx, op, entry.data)?;
        match ctx.take_exit() {
            Some(status) => Ok(ControlFlow::Break(status)),
            None => Ok(ControlFlow::Continue(())),
        }
    }

    /// Runs until a handler requests an exit.
    pub fn run(&self, ctx: &mut Context<'_>) -> Result<i32, Fault> {
        loop {
            if let ControlFlow::Break(status) = self.step(ctx)? {
                return Ok(status);
            }
        }
    }

    /// Like `run`, but reports a fault and turns it into an exit status.
    pub fn start(&self, ctx: &mut Context<'_>) -> i32 {
        match self.run(ctx) {
            Ok(status) => status,
            Err(fault) => Self::report(ctx, &fault),
        }
    }

    /// Logs a fault with the opcode, PC and function code it stopped at and
    /// returns the exit status for it.
    pub fn report(ctx: &Context<'_>, fault: &Fault) -> i32 {
        error!(
            opcode = ctx.opcode(),
            pc = ctx.regs.pc,
            fc = %ctx.program_fc(),
            "{}",
            fault
        );
        fault.exit_status()
    }
}

/// Opcodes matching `base` on the bits outside `mask`.
fn pattern(base: u16, mask: u16) -> impl Iterator<Item = usize> {
    let base = base & !mask;
    let mut next = Some(0u16);
    std::iter::from_fn(move || {
        let m = next?;
        let n = m.wrapping_sub(mask) & mask;
        next = (n != 0).then_some(n);
        Some((base | m) as usize)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{AddressSpace, FunctionCode, Ram};
    use pretty_assertions::assert_eq;

    fn marker(ctx: &mut Context<'_>, _op: u16, data: u32) -> Result<(), Fault> {
        ctx.regs.d[0] = data;
        ctx.regs.advance_pc(2);
        Ok(())
    }

    fn run_one(unit: &ExecUnit, op: u16) -> Result<u32, Fault> {
        let mut ram = Ram::new(0x100);
        ram.put_word(FunctionCode::SupervisorProgram, 0x10, op).unwrap();
        let mut ctx = Context::new(&mut ram);
        ctx.regs.pc = 0x10;
        ctx.regs.d[0] = 0xFFFF_FFFF;
        assert_eq!(unit.step(&mut ctx)?, ControlFlow::Continue(()));
        Ok(ctx.regs.d[0])
    }

    #[test]
    fn empty_table_is_illegal() {
        let unit = ExecUnit::new();
        assert_eq!(
            run_one(&unit, 0x4E71),
            Err(Fault::IllegalInstruction {
                opcode: 0x4E71,
                pc: 0x10
            })
        );
        assert_eq!(unit.installed_count(), 0);
    }

    #[test]
    fn pattern_covers_every_subset_of_mask() {
        let mut unit = ExecUnit::new();
        unit.set_instruction(0x5040, 0x0E07, marker, 7);
        assert_eq!(unit.installed_count(), 64);
        for op in [0x5040, 0x5240, 0x5E40, 0x5041, 0x5047, 0x5E47] {
            assert_eq!(run_one(&unit, op), Ok(7), "{op:#06x}");
        }
        assert!(run_one(&unit, 0x5048).is_err());
        assert!(run_one(&unit, 0x5140).is_err());
    }

    #[test]
    fn later_install_overrides() {
        let mut unit = ExecUnit::new();
        unit.set_instruction(0x7000, 0x0EFF, marker, 1);
        unit.set_instruction(0x7200, 0x00FF, marker, 2);
        assert_eq!(run_one(&unit, 0x7005), Ok(1));
        assert_eq!(run_one(&unit, 0x7205), Ok(2));
    }

    #[test]
    fn zero_mask_installs_single_opcode() {
        let mut unit = ExecUnit::new();
        unit.set_instruction(0x4E75, 0, marker, 3);
        assert_eq!(unit.installed_count(), 1);
        assert!(unit.is_installed(0x4E75));
    }

    #[test]
    fn report_matches_start() {
        let mut ram = Ram::new(0x100);
        ram.put_word(FunctionCode::SupervisorProgram, 0x10, 0x4AFC).unwrap();
        let unit = ExecUnit::new();
        let mut ctx = Context::new(&mut ram);
        ctx.regs.pc = 0x10;
        let fault = unit.step(&mut ctx).unwrap_err();
        assert_eq!(ctx.opcode(), 0x4AFC);
        assert_eq!(ExecUnit::report(&ctx, &fault), 128 + 4);
        assert_eq!(unit.start(&mut ctx), 128 + 4);
    }
}
