#![allow(dead_code)]

use std::ops::ControlFlow;

use vm68k::{AddressSpace, Context, ExecUnit, FunctionCode, MemoryMap, Ram};

pub const CODE: u32 = 0x1000;
pub const STACK: u32 = 0x8000;
pub const SD: FunctionCode = FunctionCode::SupervisorData;

/// 64 KiB of RAM behind a 24-bit memory map.
pub fn memory() -> MemoryMap {
    let mut map = MemoryMap::new(24);
    map.map(0, 0x10000, Ram::new(0x10000));
    map
}

/// Writes opcode words at `CODE`.
pub fn load(mem: &mut MemoryMap, words: &[u16]) {
    for (i, w) in words.iter().enumerate() {
        mem.put_word(SD, CODE + 2 * i as u32, *w).unwrap();
    }
}

/// A context with the PC at `CODE` and the supervisor stack at `STACK`.
pub fn context(mem: &mut MemoryMap) -> Context<'_> {
    let mut ctx = Context::new(mem);
    ctx.regs.pc = CODE;
    ctx.regs.a[7] = STACK;
    ctx
}

pub fn steps(unit: &ExecUnit, ctx: &mut Context<'_>, n: usize) {
    for _ in 0..n {
        assert_eq!(unit.step(ctx), Ok(ControlFlow::Continue(())));
    }
}
