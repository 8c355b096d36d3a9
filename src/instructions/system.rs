//! Status register access and other system control instructions.

use tracing::debug;

use super::{install_ea, operand, reg0};
use crate::addressing::EaClass;
use crate::condition::Ccr;
use crate::context::Context;
use crate::cpu::Fault;
use crate::exec::ExecUnit;
use crate::size::{ByteSize, LongWordSize, OperandSize, WordSize};

const OR: u32 = 0;
const AND: u32 = 1;
const EOR: u32 = 2;

pub(super) fn install(unit: &mut ExecUnit) {
    for (base, kind) in [(0x0000, OR), (0x0200, AND), (0x0A00, EOR)] {
        unit.install(base | 0x003C, 0, logical_to_ccr, kind);
        unit.install(base | 0x007C, 0, logical_to_sr, kind);
    }
    install_ea(unit, 0x40C0, 0, EaClass::DATA_ALTERABLE, move_from_sr, 0);
    install_ea(unit, 0x44C0, 0, EaClass::DATA, move_to_ccr, 0);
    install_ea(unit, 0x46C0, 0, EaClass::DATA, move_to_sr, 0);
    unit.install(0x4E60, 0x000F, move_usp, 0);
    unit.install(0x4E70, 0, reset, 0);
    unit.install(0x4E73, 0, return_from_exception, 0);
}

fn apply(kind: u32, value: u16, operand: u16) -> u16 {
    match kind {
        OR => value | operand,
        AND => value & operand,
        _ => value ^ operand,
    }
}

/// ORI, ANDI and EORI to CCR.
fn logical_to_ccr(ctx: &mut Context<'_>, _: u16, kind: u32) -> Result<(), Fault> {
    let imm = ctx.fetch::<ByteSize>(2)? as u16;
    let ccr = apply(kind, ctx.regs.cc.ccr().bits() as u16, imm);
    ctx.regs.cc.set_ccr(Ccr::from_bits_truncate(ccr as u8));
    ctx.regs.advance_pc(4);
    Ok(())
}

/// ORI, ANDI and EORI to SR. Privileged.
fn logical_to_sr(ctx: &mut Context<'_>, _: u16, kind: u32) -> Result<(), Fault> {
    ctx.require_supervisor()?;
    let imm = ctx.fetch::<WordSize>(2)? as u16;
    let sr = apply(kind, ctx.sr(), imm);
    ctx.regs.advance_pc(4);
    ctx.set_sr(sr);
    Ok(())
}

/// MOVE SR,`<ea>`. Not privileged on the MC68000.
fn move_from_sr(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let ea = operand::<WordSize>(ctx, op, 2)?;
    let sr = ctx.sr() as u32;
    ea.put(ctx, sr)?;
    ea.finish(ctx);
    ctx.regs.advance_pc(2 + ea.extension_size());
    Ok(())
}

/// MOVE `<ea>`,CCR
fn move_to_ccr(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let ea = operand::<WordSize>(ctx, op, 2)?;
    let value = ea.get(ctx)?;
    ea.finish(ctx);
    ctx.regs.cc.set_ccr(Ccr::from_bits_truncate(value as u8));
    ctx.regs.advance_pc(2 + ea.extension_size());
    Ok(())
}

/// MOVE `<ea>`,SR. Privileged; may leave supervisor state.
fn move_to_sr(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    ctx.require_supervisor()?;
    let ea = operand::<WordSize>(ctx, op, 2)?;
    let value = ea.get(ctx)?;
    ea.finish(ctx);
    ctx.regs.advance_pc(2 + ea.extension_size());
    ctx.set_sr(WordSize::uvalue(value) as u16);
    Ok(())
}

/// MOVE An,USP (bit 3 clear) and MOVE USP,An. Privileged.
fn move_usp(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    ctx.require_supervisor()?;
    let reg = reg0(op);
    if op & 0x0008 != 0 {
        ctx.regs.a[reg] = ctx.regs.usp();
    } else {
        let value = ctx.regs.a[reg];
        ctx.regs.set_usp(value);
    }
    ctx.regs.advance_pc(2);
    Ok(())
}

/// RESET asserts the external reset line; there are no devices on it here.
fn reset(ctx: &mut Context<'_>, _: u16, _: u32) -> Result<(), Fault> {
    ctx.require_supervisor()?;
    debug!("reset at {:#08x}", ctx.regs.pc);
    ctx.regs.advance_pc(2);
    Ok(())
}

/// RTE: pops SR and PC from the supervisor stack.
fn return_from_exception(ctx: &mut Context<'_>, _: u16, _: u32) -> Result<(), Fault> {
    ctx.require_supervisor()?;
    let sr = ctx.pop::<WordSize>()?;
    let pc = ctx.pop::<LongWordSize>()?;
    ctx.regs.pc = pc;
    ctx.set_sr(sr as u16);
    Ok(())
}
