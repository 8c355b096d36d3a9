//! Packed decimal arithmetic. V is left clear; the MC68000 leaves it
//! undefined.

use super::{install_ea, operand, reg0, reg9, set_extended_flags};
use crate::addressing::{EaClass, EffectiveAddress, Mode};
use crate::context::Context;
use crate::cpu::Fault;
use crate::exec::ExecUnit;
use crate::size::{ByteSize, OperandSize};

const ABCD: u32 = 0;
const SBCD: u32 = 1;

pub(super) fn install(unit: &mut ExecUnit) {
    for (base, kind) in [(0xC100, ABCD), (0x8100, SBCD)] {
        unit.install(base, 0x0E07, decimal, kind);
        unit.install(base | 0x0008, 0x0E07, decimal, kind);
    }
    install_ea(unit, 0x4800, 0, EaClass::DATA_ALTERABLE, negate_decimal, 0);
}

fn add_decimal(dest: u32, src: u32, x: u32) -> (u32, bool) {
    let mut r = (src & 0x0F) + (dest & 0x0F) + x;
    if r > 9 {
        r += 6;
    }
    r += (src & 0xF0) + (dest & 0xF0);
    let carry = r > 0x99;
    if carry {
        r -= 0xA0;
    }
    (r & 0xFF, carry)
}

fn sub_decimal(dest: u32, src: u32, x: u32) -> (u32, bool) {
    let mut r = (dest & 0x0F).wrapping_sub(src & 0x0F).wrapping_sub(x);
    if r > 9 {
        r = r.wrapping_sub(6);
    }
    r = r.wrapping_add(dest & 0xF0).wrapping_sub(src & 0xF0);
    let carry = r > 0x99;
    if carry {
        r = r.wrapping_add(0xA0);
    }
    (r & 0xFF, carry)
}

/// ABCD and SBCD, `Dy,Dx` and `-(Ay),-(Ax)`.
fn decimal(ctx: &mut Context<'_>, op: u16, kind: u32) -> Result<(), Fault> {
    let (src, dst) = if op & 0x0008 != 0 {
        (Mode::PreDecrement(reg0(op)), Mode::PreDecrement(reg9(op)))
    } else {
        (Mode::DataRegister(reg0(op)), Mode::DataRegister(reg9(op)))
    };
    let src = EffectiveAddress::<ByteSize>::new(src, 2);
    let dst = EffectiveAddress::<ByteSize>::new(dst, 2);
    let s = src.get(ctx)?;
    src.finish(ctx);
    let d = dst.get(ctx)?;
    let x = ctx.regs.cc.x() as u32;
    let (r, carry) = if kind == ABCD {
        add_decimal(d, s, x)
    } else {
        sub_decimal(d, s, x)
    };
    dst.put(ctx, r)?;
    dst.finish(ctx);
    set_extended_flags(ctx, ByteSize::msb(r), r == 0, false, carry);
    ctx.regs.advance_pc(2);
    Ok(())
}

/// NBCD `<ea>`: `0 - <ea> - X` in decimal.
fn negate_decimal(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let dst = operand::<ByteSize>(ctx, op, 2)?;
    let d = dst.get(ctx)?;
    let x = ctx.regs.cc.x() as u32;
    let (r, carry) = sub_decimal(0, d, x);
    dst.put(ctx, r)?;
    dst.finish(ctx);
    set_extended_flags(ctx, ByteSize::msb(r), r == 0, false, carry);
    ctx.regs.advance_pc(2 + dst.extension_size());
    Ok(())
}
