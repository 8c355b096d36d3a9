//! Program control.

use super::{install_ea, operand, reg0};
use crate::addressing::EaClass;
use crate::condition::{Ccr, Condition};
use crate::context::Context;
use crate::cpu::{Fault, TRAPV_VECTOR, TRAP_VECTOR_BASE};
use crate::exec::ExecUnit;
use crate::size::{LongWordSize, OperandSize, WordSize};

pub(super) fn install(unit: &mut ExecUnit) {
    // Condition 1 (false) encodes BSR.
    unit.install(0x6100, 0x00FF, branch_to_subroutine, 0);
    for condition in (0..16u16).filter(|&c| c != 1) {
        unit.install(0x6000 | condition << 8, 0x00FF, branch, 0);
    }
    unit.install(0x50C8, 0x0F07, decrement_and_branch, 0);

    install_ea(unit, 0x4EC0, 0, EaClass::CONTROL, jump, 0);
    install_ea(unit, 0x4E80, 0, EaClass::CONTROL, jump_to_subroutine, 0);
    unit.install(0x4E75, 0, return_from_subroutine, 0);
    unit.install(0x4E77, 0, return_and_restore, 0);

    unit.install(0x4E40, 0x000F, trap, 0);
    unit.install(0x4E76, 0, trap_on_overflow, 0);
    unit.install(0x4E71, 0, no_operation, 0);
}

/// Branch displacement and instruction length. A zero 8-bit displacement
/// selects a 16-bit extension word.
fn displacement(ctx: &mut Context<'_>, op: u16) -> Result<(u32, u32), Fault> {
    match op as u8 as i8 {
        0 => Ok((ctx.fetch_word(2)? as i16 as u32, 4)),
        disp => Ok((disp as u32, 2)),
    }
}

/// Bcc and BRA. The target is relative to the word after the opcode.
fn branch(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let (disp, len) = displacement(ctx, op)?;
    if Condition::from_opcode(op).test(&ctx.regs.cc) {
        ctx.regs.pc = ctx.regs.pc.wrapping_add(2).wrapping_add(disp);
    } else {
        ctx.regs.advance_pc(len);
    }
    Ok(())
}

/// BSR
fn branch_to_subroutine(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let (disp, len) = displacement(ctx, op)?;
    let pc = ctx.regs.pc;
    ctx.push::<LongWordSize>(pc.wrapping_add(len))?;
    ctx.regs.pc = pc.wrapping_add(2).wrapping_add(disp);
    Ok(())
}

/// DBcc `Dn,d16`: falls through when the condition holds or the low word
/// of the counter reaches -1, branches otherwise.
fn decrement_and_branch(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    if Condition::from_opcode(op).test(&ctx.regs.cc) {
        ctx.regs.advance_pc(4);
        return Ok(());
    }
    let reg = reg0(op);
    let count = (ctx.regs.d[reg] as u16).wrapping_sub(1);
    WordSize::put(&mut ctx.regs.d[reg], count as u32);
    if count == 0xFFFF {
        ctx.regs.advance_pc(4);
    } else {
        let disp = ctx.fetch_word(2)? as i16 as u32;
        ctx.regs.pc = ctx.regs.pc.wrapping_add(2).wrapping_add(disp);
    }
    Ok(())
}

/// JMP `<ea>`
fn jump(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let ea = operand::<LongWordSize>(ctx, op, 2)?;
    ctx.regs.pc = ea.address(ctx)?;
    Ok(())
}

/// JSR `<ea>`
fn jump_to_subroutine(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let ea = operand::<LongWordSize>(ctx, op, 2)?;
    let target = ea.address(ctx)?;
    let next = ctx.regs.pc.wrapping_add(2 + ea.extension_size());
    ctx.push::<LongWordSize>(next)?;
    ctx.regs.pc = target;
    Ok(())
}

/// RTS
fn return_from_subroutine(ctx: &mut Context<'_>, _: u16, _: u32) -> Result<(), Fault> {
    ctx.regs.pc = ctx.pop::<LongWordSize>()?;
    Ok(())
}

/// RTR: restores the condition codes, then returns.
fn return_and_restore(ctx: &mut Context<'_>, _: u16, _: u32) -> Result<(), Fault> {
    let ccr = ctx.pop::<WordSize>()?;
    let pc = ctx.pop::<LongWordSize>()?;
    ctx.regs.cc.set_ccr(Ccr::from_bits_truncate(ccr as u8));
    ctx.regs.pc = pc;
    Ok(())
}

/// TRAP `#n`, vectors 32 to 47.
fn trap(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let next = ctx.regs.pc.wrapping_add(2);
    ctx.exception(TRAP_VECTOR_BASE + (op & 0xF) as u8, next)
}

/// TRAPV
fn trap_on_overflow(ctx: &mut Context<'_>, _: u16, _: u32) -> Result<(), Fault> {
    let next = ctx.regs.pc.wrapping_add(2);
    if ctx.regs.cc.vs() {
        ctx.exception(TRAPV_VECTOR, next)
    } else {
        ctx.regs.pc = next;
        Ok(())
    }
}

/// NOP
fn no_operation(ctx: &mut Context<'_>, _: u16, _: u32) -> Result<(), Fault> {
    ctx.regs.advance_pc(2);
    Ok(())
}
