//! Data movement.

use super::{install_ea, operand, reg0, reg9};
use crate::addressing::{EaClass, Mode};
use crate::condition::Condition;
use crate::context::Context;
use crate::cpu::Fault;
use crate::exec::{ExecUnit, Handler};
use crate::size::{ByteSize, LongWordSize, OperandSize, WordSize};

pub(super) fn install(unit: &mut ExecUnit) {
    let moves: [(u16, Handler, Option<Handler>); 3] = [
        (0x1000, move_::<ByteSize>, None),
        (0x3000, move_::<WordSize>, Some(move_address::<WordSize>)),
        (0x2000, move_::<LongWordSize>, Some(move_address::<LongWordSize>)),
    ];
    for (base, handler, to_address) in moves {
        let source = if to_address.is_none() {
            EaClass::DATA
        } else {
            EaClass::ALL
        };
        for (dbits, dmask) in EaClass::DATA_ALTERABLE.destination_patterns() {
            install_ea(unit, base | dbits, dmask, source, handler, 0);
        }
        if let Some(to_address) = to_address {
            install_ea(unit, base | 0x0040, 0x0E00, source, to_address, 0);
        }
    }
    unit.install(0x7000, 0x0EFF, move_quick, 0);

    let to_memory = EaClass::CONTROL.intersection(EaClass::ALTERABLE) | EaClass::PRE_DECREMENT;
    let from_memory = EaClass::CONTROL | EaClass::POST_INCREMENT;
    install_ea(unit, 0x4880, 0, to_memory, store_multiple::<WordSize>, 0);
    install_ea(unit, 0x48C0, 0, to_memory, store_multiple::<LongWordSize>, 0);
    install_ea(unit, 0x4C80, 0, from_memory, load_multiple::<WordSize>, 0);
    install_ea(unit, 0x4CC0, 0, from_memory, load_multiple::<LongWordSize>, 0);

    install_ea(unit, 0x41C0, 0x0E00, EaClass::CONTROL, load_effective_address, 0);
    install_ea(unit, 0x4840, 0, EaClass::CONTROL, push_effective_address, 0);

    unit.install(0xC140, 0x0E07, exchange, 0);
    unit.install(0xC148, 0x0E07, exchange, 0);
    unit.install(0xC188, 0x0E07, exchange, 0);
    unit.install(0x4840, 0x0007, swap, 0);
    unit.install(0x4880, 0x0007, extend, 0);
    unit.install(0x48C0, 0x0007, extend, 0);
    unit.install(0x4E50, 0x0007, link, 0);
    unit.install(0x4E58, 0x0007, unlink, 0);

    install_ea(unit, 0x50C0, 0x0F00, EaClass::DATA_ALTERABLE, set_conditionally, 0);
    install_ea(unit, 0x4AC0, 0, EaClass::DATA_ALTERABLE, test_and_set, 0);
}

/// MOVE `<ea>,<ea>`. The source is finished before the destination is
/// resolved.
fn move_<S: OperandSize>(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let src = operand::<S>(ctx, op, 2)?;
    let value = src.get(ctx)?;
    src.finish(ctx);
    let field = (op >> 3) & 0o70 | (op >> 9) & 0o7;
    let dst = operand::<S>(ctx, field, 2 + src.extension_size())?;
    dst.put(ctx, value)?;
    dst.finish(ctx);
    ctx.regs.cc.set_cc(S::svalue(value));
    ctx.regs.advance_pc(2 + src.extension_size() + dst.extension_size());
    Ok(())
}

/// MOVEA `<ea>,An`
fn move_address<S: OperandSize>(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let src = operand::<S>(ctx, op, 2)?;
    let value = src.get(ctx)?;
    src.finish(ctx);
    ctx.regs.a[reg9(op)] = S::svalue(value) as u32;
    ctx.regs.advance_pc(2 + src.extension_size());
    Ok(())
}

/// MOVEQ `#d8,Dn`
fn move_quick(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let value = op as u8 as i8 as i32;
    ctx.regs.d[reg9(op)] = value as u32;
    ctx.regs.cc.set_cc(value);
    ctx.regs.advance_pc(2);
    Ok(())
}

/// MOVEM registers to memory. With pre-decrement the register mask is
/// reversed (bit 0 is A7) and the registers are stored from A7 down to D0.
fn store_multiple<S: OperandSize>(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let mask = ctx.fetch_word(2)?;
    let ea = operand::<S>(ctx, op, 4)?;
    let size = S::value_size();
    if let Mode::PreDecrement(r) = ea.mode() {
        let mut address = ctx.regs.a[r];
        for i in (0..16).filter(|&i| mask & (1 << i) != 0) {
            address = address.wrapping_sub(size);
            let value = ctx.regs.get(15 - i);
            ctx.write::<S>(address, value)?;
        }
        ctx.regs.a[r] = address;
    } else {
        let mut address = ea.address(ctx)?;
        for i in (0..16).filter(|&i| mask & (1 << i) != 0) {
            let value = ctx.regs.get(i);
            ctx.write::<S>(address, value)?;
            address = address.wrapping_add(size);
        }
    }
    ctx.regs.advance_pc(4 + ea.extension_size());
    Ok(())
}

/// MOVEM memory to registers. Words are sign-extended to the full register.
fn load_multiple<S: OperandSize>(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let mask = ctx.fetch_word(2)?;
    let ea = operand::<S>(ctx, op, 4)?;
    let size = S::value_size();
    let program = matches!(ea.mode(), Mode::PcDisplacement | Mode::PcIndexed);
    let mut address = match ea.mode() {
        Mode::PostIncrement(r) => ctx.regs.a[r],
        _ => ea.address(ctx)?,
    };
    for i in (0..16).filter(|&i| mask & (1 << i) != 0) {
        let value = if program {
            ctx.read_program::<S>(address)?
        } else {
            ctx.read::<S>(address)?
        };
        ctx.regs.set(i, S::svalue(value) as u32);
        address = address.wrapping_add(size);
    }
    if let Mode::PostIncrement(r) = ea.mode() {
        ctx.regs.a[r] = address;
    }
    ctx.regs.advance_pc(4 + ea.extension_size());
    Ok(())
}

/// LEA `<ea>,An`
fn load_effective_address(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let ea = operand::<LongWordSize>(ctx, op, 2)?;
    ctx.regs.a[reg9(op)] = ea.address(ctx)?;
    ctx.regs.advance_pc(2 + ea.extension_size());
    Ok(())
}

/// PEA `<ea>`
fn push_effective_address(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let ea = operand::<LongWordSize>(ctx, op, 2)?;
    let address = ea.address(ctx)?;
    ctx.push::<LongWordSize>(address)?;
    ctx.regs.advance_pc(2 + ea.extension_size());
    Ok(())
}

/// EXG between two data registers, two address registers, or a data and
/// an address register.
fn exchange(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let (x, y) = match (op >> 3) & 0x1F {
        0x08 => (reg9(op), reg0(op)),
        0x09 => (reg9(op) + 8, reg0(op) + 8),
        _ => (reg9(op), reg0(op) + 8),
    };
    let (vx, vy) = (ctx.regs.get(x), ctx.regs.get(y));
    ctx.regs.set(x, vy);
    ctx.regs.set(y, vx);
    ctx.regs.advance_pc(2);
    Ok(())
}

fn swap(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let reg = reg0(op);
    let value = ctx.regs.d[reg].rotate_left(16);
    ctx.regs.d[reg] = value;
    ctx.regs.cc.set_cc(value as i32);
    ctx.regs.advance_pc(2);
    Ok(())
}

/// EXT.W (byte to word) and EXT.L (word to long).
fn extend(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let reg = reg0(op);
    let value = if op & 0x0040 != 0 {
        let value = WordSize::svalue(ctx.regs.d[reg]);
        ctx.regs.d[reg] = value as u32;
        value
    } else {
        let value = ByteSize::svalue(ctx.regs.d[reg]);
        WordSize::put(&mut ctx.regs.d[reg], value as u32);
        value
    };
    ctx.regs.cc.set_cc(value);
    ctx.regs.advance_pc(2);
    Ok(())
}

/// LINK `An,#d16`
fn link(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let reg = reg0(op);
    let disp = ctx.fetch_word(2)? as i16;
    let fp = ctx.regs.a[7].wrapping_sub(4);
    // LINK A7 stores the already decremented stack pointer
    let saved = if reg == 7 { fp } else { ctx.regs.a[reg] };
    ctx.write::<LongWordSize>(fp, saved)?;
    ctx.regs.a[reg] = fp;
    ctx.regs.a[7] = fp.wrapping_add(disp as u32);
    ctx.regs.advance_pc(4);
    Ok(())
}

/// UNLK `An`
fn unlink(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let reg = reg0(op);
    ctx.regs.a[7] = ctx.regs.a[reg];
    let value = ctx.pop::<LongWordSize>()?;
    ctx.regs.a[reg] = value;
    ctx.regs.advance_pc(2);
    Ok(())
}

/// Scc `<ea>`
fn set_conditionally(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let ea = operand::<ByteSize>(ctx, op, 2)?;
    let value = if Condition::from_opcode(op).test(&ctx.regs.cc) {
        0xFF
    } else {
        0
    };
    ea.put(ctx, value)?;
    ea.finish(ctx);
    ctx.regs.advance_pc(2 + ea.extension_size());
    Ok(())
}

/// TAS `<ea>`
fn test_and_set(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let ea = operand::<ByteSize>(ctx, op, 2)?;
    let value = ea.get(ctx)?;
    ctx.regs.cc.set_cc(ByteSize::svalue(value));
    ea.put(ctx, value | 0x80)?;
    ea.finish(ctx);
    ctx.regs.advance_pc(2 + ea.extension_size());
    Ok(())
}
