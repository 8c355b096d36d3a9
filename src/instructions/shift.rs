//! Shifts and rotates, register and memory forms.

use super::{install_ea, operand, reg0, reg9, sized};
use crate::addressing::EaClass;
use crate::condition::Ccr;
use crate::context::Context;
use crate::cpu::Fault;
use crate::exec::ExecUnit;
use crate::size::{ByteSize, LongWordSize, OperandSize, WordSize};

// Operation type as encoded in the opcode.
const ARITHMETIC: u16 = 0;
const LOGICAL: u16 = 1;
const ROTATE_EXTEND: u16 = 2;
const ROTATE: u16 = 3;

pub(super) fn install(unit: &mut ExecUnit) {
    let handlers = sized(
        shift_register::<ByteSize>,
        shift_register::<WordSize>,
        shift_register::<LongWordSize>,
    );
    for (size, handler) in handlers {
        for kind in [ARITHMETIC, LOGICAL, ROTATE_EXTEND, ROTATE] {
            for left in [0, 0x0100] {
                for count_in_register in [0, 0x0020] {
                    let base = 0xE000 | left | size | count_in_register | kind << 3;
                    unit.install(base, 0x0E07, handler, 0);
                }
            }
        }
    }
    for kind in [ARITHMETIC, LOGICAL, ROTATE_EXTEND, ROTATE] {
        for left in [0, 0x0100] {
            let base = 0xE0C0 | kind << 9 | left;
            install_ea(unit, base, 0, EaClass::MEMORY_ALTERABLE, shift_memory, 0);
        }
    }
}

/// `<op> #n,Dy` (count 1..=8) and `<op> Dx,Dy` (count mod 64).
fn shift_register<S: OperandSize>(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let count = if op & 0x0020 != 0 {
        ctx.regs.d[reg9(op)] % 64
    } else {
        match reg9(op) {
            0 => 8,
            n => n as u32,
        }
    };
    let reg = reg0(op);
    let value = S::get(ctx.regs.d[reg]);
    let result = shift::<S>(ctx, (op >> 3) & 3, op & 0x0100 != 0, value, count);
    S::put(&mut ctx.regs.d[reg], result);
    ctx.regs.advance_pc(2);
    Ok(())
}

/// `<op> <ea>`: a word shifted by one.
fn shift_memory(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let ea = operand::<WordSize>(ctx, op, 2)?;
    let value = ea.get(ctx)?;
    let result = shift::<WordSize>(ctx, (op >> 9) & 3, op & 0x0100 != 0, value, 1);
    ea.put(ctx, result)?;
    ea.finish(ctx);
    ctx.regs.advance_pc(2 + ea.extension_size());
    Ok(())
}

fn shift<S: OperandSize>(ctx: &mut Context<'_>, kind: u16, left: bool, value: u32, count: u32) -> u32 {
    if kind == ROTATE_EXTEND {
        return rotate_extend::<S>(ctx, left, value, count);
    }
    let cc = &mut ctx.regs.cc;
    if count == 0 {
        cc.set_cc(S::svalue(value));
        return value;
    }
    let bits = S::BITS;
    let result = match (kind, left) {
        (ARITHMETIC | LOGICAL, true) => {
            if count >= bits {
                0
            } else {
                S::uvalue(value << count)
            }
        }
        (ARITHMETIC, false) => S::uvalue((S::svalue(value) >> count.min(31)) as u32),
        (LOGICAL, false) => {
            if count >= bits {
                0
            } else {
                value >> count
            }
        }
        (_, true) => rotate_left::<S>(value, count % bits),
        (_, false) => rotate_left::<S>(value, (bits - count % bits) % bits),
    };
    let (r, v) = (S::svalue(result), S::svalue(value));
    match (kind, left) {
        (ARITHMETIC, true) => cc.set_cc_asl::<S>(r, v, count),
        (ARITHMETIC, false) => cc.set_cc_asr::<S>(r, v, count),
        (LOGICAL, true) => cc.set_cc_lsl::<S>(r, v, count),
        (LOGICAL, false) => cc.set_cc_lsr::<S>(r, v, count),
        (_, true) => cc.set_cc_rol(r),
        (_, false) => cc.set_cc_ror(r),
    }
    result
}

fn rotate_left<S: OperandSize>(value: u32, count: u32) -> u32 {
    if count == 0 {
        value
    } else {
        S::uvalue(value << count | value >> (S::BITS - count))
    }
}

/// ROXL and ROXR rotate through X, one bit at a time. With a zero count C
/// takes the value of X.
fn rotate_extend<S: OperandSize>(ctx: &mut Context<'_>, left: bool, value: u32, count: u32) -> u32 {
    let mut x = ctx.regs.cc.x();
    let mut result = value;
    for _ in 0..count % (S::BITS + 1) {
        if left {
            let out = S::msb(result);
            result = S::uvalue(result << 1 | x as u32);
            x = out;
        } else {
            let out = result & 1 != 0;
            result = result >> 1 | (x as u32) << (S::BITS - 1);
            x = out;
        }
    }
    let mut ccr = Ccr::empty();
    ccr.set(Ccr::X, x);
    ccr.set(Ccr::N, S::msb(result));
    ccr.set(Ccr::Z, result == 0);
    ccr.set(Ccr::C, x);
    ctx.regs.cc.set_ccr(ccr);
    result
}
