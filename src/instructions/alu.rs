//! Integer arithmetic and logical operations.

use super::{byte_class, install_ea, operand, reg0, reg9, set_extended_flags, sized};
use crate::addressing::{EaClass, EffectiveAddress, Mode};
use crate::condition::Ccr;
use crate::context::Context;
use crate::cpu::{Fault, CHK_VECTOR, ZERO_DIVIDE_VECTOR};
use crate::exec::ExecUnit;
use crate::size::{ByteSize, LongWordSize, OperandSize, WordSize};

// Two-operand operation selectors, passed as handler data.
const ADD: u32 = 0;
const SUB: u32 = 1;
const AND: u32 = 2;
const OR: u32 = 3;
const EOR: u32 = 4;
const CMP: u32 = 5;

// Single-operand operation selectors.
const NEG: u32 = 0;
const NEGX: u32 = 1;
const CLR: u32 = 2;
const NOT: u32 = 3;
const TST: u32 = 4;

pub(super) fn install(unit: &mut ExecUnit) {
    for (base, kind, source) in [
        (0xD000, ADD, EaClass::ALL),
        (0x9000, SUB, EaClass::ALL),
        (0xC000, AND, EaClass::DATA),
        (0x8000, OR, EaClass::DATA),
        (0xB000, CMP, EaClass::ALL),
    ] {
        let handlers = sized(
            to_register::<ByteSize>,
            to_register::<WordSize>,
            to_register::<LongWordSize>,
        );
        for (size, handler) in handlers {
            install_ea(unit, base | size, 0x0E00, byte_class(size, source), handler, kind);
        }
        if kind == CMP {
            continue;
        }
        let handlers = sized(
            to_memory::<ByteSize>,
            to_memory::<WordSize>,
            to_memory::<LongWordSize>,
        );
        for (size, handler) in handlers {
            install_ea(unit, base | 0x0100 | size, 0x0E00, EaClass::MEMORY_ALTERABLE, handler, kind);
        }
    }
    // EOR only exists in the register-to-<ea> direction.
    let handlers = sized(
        to_memory::<ByteSize>,
        to_memory::<WordSize>,
        to_memory::<LongWordSize>,
    );
    for (size, handler) in handlers {
        install_ea(unit, 0xB100 | size, 0x0E00, EaClass::DATA_ALTERABLE, handler, EOR);
    }

    for (base, kind) in [
        (0x0000, OR),
        (0x0200, AND),
        (0x0400, SUB),
        (0x0600, ADD),
        (0x0A00, EOR),
        (0x0C00, CMP),
    ] {
        let handlers = sized(
            immediate::<ByteSize>,
            immediate::<WordSize>,
            immediate::<LongWordSize>,
        );
        for (size, handler) in handlers {
            install_ea(unit, base | size, 0, EaClass::DATA_ALTERABLE, handler, kind);
        }
    }

    for (base, kind) in [(0x5000, ADD), (0x5100, SUB)] {
        let handlers = sized(quick::<ByteSize>, quick::<WordSize>, quick::<LongWordSize>);
        for (size, handler) in handlers {
            install_ea(unit, base | size, 0x0E00, byte_class(size, EaClass::ALTERABLE), handler, kind);
        }
    }

    for (base, kind) in [(0xD0C0, ADD), (0x90C0, SUB), (0xB0C0, CMP)] {
        install_ea(unit, base, 0x0E00, EaClass::ALL, address::<WordSize>, kind);
        install_ea(unit, base | 0x0100, 0x0E00, EaClass::ALL, address::<LongWordSize>, kind);
    }

    for (base, kind) in [(0xD100, ADD), (0x9100, SUB)] {
        let handlers = sized(
            extended::<ByteSize>,
            extended::<WordSize>,
            extended::<LongWordSize>,
        );
        for (size, handler) in handlers {
            unit.install(base | size, 0x0E07, handler, kind);
            unit.install(base | size | 0x0008, 0x0E07, handler, kind);
        }
    }

    let handlers = sized(
        compare_memory::<ByteSize>,
        compare_memory::<WordSize>,
        compare_memory::<LongWordSize>,
    );
    for (size, handler) in handlers {
        unit.install(0xB108 | size, 0x0E07, handler, CMP);
    }

    for (base, kind) in [
        (0x4000, NEGX),
        (0x4200, CLR),
        (0x4400, NEG),
        (0x4600, NOT),
        (0x4A00, TST),
    ] {
        let handlers = sized(unary::<ByteSize>, unary::<WordSize>, unary::<LongWordSize>);
        for (size, handler) in handlers {
            install_ea(unit, base | size, 0, EaClass::DATA_ALTERABLE, handler, kind);
        }
    }

    install_ea(unit, 0xC0C0, 0x0E00, EaClass::DATA, multiply, 0);
    install_ea(unit, 0xC1C0, 0x0E00, EaClass::DATA, multiply, 1);
    install_ea(unit, 0x80C0, 0x0E00, EaClass::DATA, divide, 0);
    install_ea(unit, 0x81C0, 0x0E00, EaClass::DATA, divide, 1);
    install_ea(unit, 0x4180, 0x0E00, EaClass::DATA, check, 0);
}

/// Computes `dest <op> src` and sets the condition codes. Returns `None`
/// for comparisons, which write nothing back.
fn compute<S: OperandSize>(ctx: &mut Context<'_>, kind: u32, dest: u32, src: u32) -> Option<u32> {
    let result = S::uvalue(match kind {
        ADD => dest.wrapping_add(src),
        SUB | CMP => dest.wrapping_sub(src),
        AND => dest & src,
        OR => dest | src,
        _ => dest ^ src,
    });
    let (r, d, s) = (S::svalue(result), S::svalue(dest), S::svalue(src));
    let cc = &mut ctx.regs.cc;
    match kind {
        ADD => cc.set_cc_as_add(r, d, s),
        SUB => cc.set_cc_sub(r, d, s),
        CMP => {
            cc.set_cc_cmp(r, d, s);
            return None;
        }
        _ => cc.set_cc(r),
    }
    Some(result)
}

/// `<op> <ea>,Dn`
fn to_register<S: OperandSize>(ctx: &mut Context<'_>, op: u16, kind: u32) -> Result<(), Fault> {
    let src = operand::<S>(ctx, op, 2)?;
    let s = src.get(ctx)?;
    src.finish(ctx);
    let reg = reg9(op);
    let d = S::get(ctx.regs.d[reg]);
    if let Some(r) = compute::<S>(ctx, kind, d, s) {
        S::put(&mut ctx.regs.d[reg], r);
    }
    ctx.regs.advance_pc(2 + src.extension_size());
    Ok(())
}

/// `<op> Dn,<ea>`
fn to_memory<S: OperandSize>(ctx: &mut Context<'_>, op: u16, kind: u32) -> Result<(), Fault> {
    let dst = operand::<S>(ctx, op, 2)?;
    let s = S::get(ctx.regs.d[reg9(op)]);
    let d = dst.get(ctx)?;
    if let Some(r) = compute::<S>(ctx, kind, d, s) {
        dst.put(ctx, r)?;
    }
    dst.finish(ctx);
    ctx.regs.advance_pc(2 + dst.extension_size());
    Ok(())
}

/// `<op>I #imm,<ea>`
fn immediate<S: OperandSize>(ctx: &mut Context<'_>, op: u16, kind: u32) -> Result<(), Fault> {
    let s = ctx.fetch::<S>(2)?;
    let len = 2 + S::aligned_value_size();
    let dst = operand::<S>(ctx, op, len)?;
    let d = dst.get(ctx)?;
    if let Some(r) = compute::<S>(ctx, kind, d, s) {
        dst.put(ctx, r)?;
    }
    dst.finish(ctx);
    ctx.regs.advance_pc(len + dst.extension_size());
    Ok(())
}

/// ADDQ and SUBQ. On an address register the whole register is affected
/// and the condition codes are not.
fn quick<S: OperandSize>(ctx: &mut Context<'_>, op: u16, kind: u32) -> Result<(), Fault> {
    let value = match reg9(op) {
        0 => 8,
        n => n as u32,
    };
    let dst = operand::<S>(ctx, op, 2)?;
    if let Mode::AddressRegister(r) = dst.mode() {
        let a = ctx.regs.a[r];
        ctx.regs.a[r] = if kind == ADD {
            a.wrapping_add(value)
        } else {
            a.wrapping_sub(value)
        };
    } else {
        let d = dst.get(ctx)?;
        if let Some(r) = compute::<S>(ctx, kind, d, value) {
            dst.put(ctx, r)?;
        }
        dst.finish(ctx);
    }
    ctx.regs.advance_pc(2 + dst.extension_size());
    Ok(())
}

/// ADDA, SUBA and CMPA: the source is sign-extended and the operation is
/// always 32 bits wide.
fn address<S: OperandSize>(ctx: &mut Context<'_>, op: u16, kind: u32) -> Result<(), Fault> {
    let src = operand::<S>(ctx, op, 2)?;
    let s = S::svalue(src.get(ctx)?) as u32;
    src.finish(ctx);
    let reg = reg9(op);
    let a = ctx.regs.a[reg];
    match kind {
        ADD => ctx.regs.a[reg] = a.wrapping_add(s),
        SUB => ctx.regs.a[reg] = a.wrapping_sub(s),
        _ => {
            let r = a.wrapping_sub(s);
            ctx.regs.cc.set_cc_cmp(r as i32, a as i32, s as i32);
        }
    }
    ctx.regs.advance_pc(2 + src.extension_size());
    Ok(())
}

/// ADDX and SUBX, register (`Dy,Dx`) and memory (`-(Ay),-(Ax)`) forms.
fn extended<S: OperandSize>(ctx: &mut Context<'_>, op: u16, kind: u32) -> Result<(), Fault> {
    let (src, dst) = if op & 0x0008 != 0 {
        (Mode::PreDecrement(reg0(op)), Mode::PreDecrement(reg9(op)))
    } else {
        (Mode::DataRegister(reg0(op)), Mode::DataRegister(reg9(op)))
    };
    let src = EffectiveAddress::<S>::new(src, 2);
    let dst = EffectiveAddress::<S>::new(dst, 2);
    let s = src.get(ctx)?;
    src.finish(ctx);
    let d = dst.get(ctx)?;
    let x = ctx.regs.cc.x() as u32;
    let (r, carry, overflow) = if kind == ADD {
        let r = S::uvalue(d.wrapping_add(s).wrapping_add(x));
        (r, S::msb((s & d) | (!r & (s | d))), S::msb((s ^ r) & (d ^ r)))
    } else {
        let r = S::uvalue(d.wrapping_sub(s).wrapping_sub(x));
        (r, S::msb((s & !d) | (r & !d) | (s & r)), S::msb((s ^ d) & (r ^ d)))
    };
    dst.put(ctx, r)?;
    dst.finish(ctx);
    set_extended_flags(ctx, S::msb(r), r == 0, overflow, carry);
    ctx.regs.advance_pc(2);
    Ok(())
}

/// CMPM `(Ay)+,(Ax)+`
fn compare_memory<S: OperandSize>(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let src = EffectiveAddress::<S>::new(Mode::PostIncrement(reg0(op)), 2);
    let s = src.get(ctx)?;
    src.finish(ctx);
    let dst = EffectiveAddress::<S>::new(Mode::PostIncrement(reg9(op)), 2);
    let d = dst.get(ctx)?;
    dst.finish(ctx);
    compute::<S>(ctx, CMP, d, s);
    ctx.regs.advance_pc(2);
    Ok(())
}

/// NEG, NEGX, CLR, NOT and TST.
fn unary<S: OperandSize>(ctx: &mut Context<'_>, op: u16, kind: u32) -> Result<(), Fault> {
    let dst = operand::<S>(ctx, op, 2)?;
    let d = dst.get(ctx)?;
    let result = match kind {
        NEG => {
            let r = S::uvalue(0u32.wrapping_sub(d));
            ctx.regs.cc.set_cc_sub(S::svalue(r), 0, S::svalue(d));
            Some(r)
        }
        NEGX => {
            let x = ctx.regs.cc.x() as u32;
            let r = S::uvalue(0u32.wrapping_sub(d).wrapping_sub(x));
            set_extended_flags(ctx, S::msb(r), r == 0, S::msb(d & r), S::msb(d | r));
            Some(r)
        }
        CLR => {
            ctx.regs.cc.set_cc(0);
            Some(0)
        }
        NOT => {
            let r = S::uvalue(!d);
            ctx.regs.cc.set_cc(S::svalue(r));
            Some(r)
        }
        _ => {
            ctx.regs.cc.set_cc(S::svalue(d));
            None
        }
    };
    if let Some(r) = result {
        dst.put(ctx, r)?;
    }
    dst.finish(ctx);
    ctx.regs.advance_pc(2 + dst.extension_size());
    Ok(())
}

/// MULU (`signed == 0`) and MULS: 16 x 16 -> 32 bits.
fn multiply(ctx: &mut Context<'_>, op: u16, signed: u32) -> Result<(), Fault> {
    let src = operand::<WordSize>(ctx, op, 2)?;
    let s = src.get(ctx)?;
    src.finish(ctx);
    let reg = reg9(op);
    let d = WordSize::get(ctx.regs.d[reg]);
    let r = if signed != 0 {
        (WordSize::svalue(d) * WordSize::svalue(s)) as u32
    } else {
        d * s
    };
    ctx.regs.d[reg] = r;
    ctx.regs.cc.set_cc(r as i32);
    ctx.regs.advance_pc(2 + src.extension_size());
    Ok(())
}

/// DIVU (`signed == 0`) and DIVS: 32 / 16 -> 16-bit remainder:quotient.
/// On overflow the destination is left alone and V is set.
fn divide(ctx: &mut Context<'_>, op: u16, signed: u32) -> Result<(), Fault> {
    let src = operand::<WordSize>(ctx, op, 2)?;
    let s = src.get(ctx)?;
    src.finish(ctx);
    let len = 2 + src.extension_size();
    if s == 0 {
        let next = ctx.regs.pc.wrapping_add(len);
        return ctx.exception(ZERO_DIVIDE_VECTOR, next);
    }
    let reg = reg9(op);
    let dividend = ctx.regs.d[reg];
    let result = if signed != 0 {
        let dividend = dividend as i32 as i64;
        let divisor = WordSize::svalue(s) as i64;
        i16::try_from(dividend / divisor)
            .ok()
            .map(|q| (q as u16, (dividend % divisor) as u16))
    } else {
        u16::try_from(dividend / s)
            .ok()
            .map(|q| (q, (dividend % s) as u16))
    };
    match result {
        Some((quotient, remainder)) => {
            ctx.regs.d[reg] = (remainder as u32) << 16 | quotient as u32;
            ctx.regs.cc.set_cc(quotient as i16 as i32);
        }
        None => {
            let (n, z) = (ctx.regs.cc.mi(), ctx.regs.cc.eq());
            ctx.regs.cc.set_flags(n, z, true, false);
        }
    }
    ctx.regs.advance_pc(len);
    Ok(())
}

/// CHK `<ea>,Dn`: traps when Dn.W is negative or above the bound.
fn check(ctx: &mut Context<'_>, op: u16, _: u32) -> Result<(), Fault> {
    let src = operand::<WordSize>(ctx, op, 2)?;
    let bound = WordSize::svalue(src.get(ctx)?);
    src.finish(ctx);
    let len = 2 + src.extension_size();
    let value = WordSize::svalue(ctx.regs.d[reg9(op)]);
    if value < 0 || value > bound {
        let mut ccr = ctx.regs.cc.ccr();
        ccr.set(Ccr::N, value < 0);
        ctx.regs.cc.set_ccr(ccr);
        let next = ctx.regs.pc.wrapping_add(len);
        return ctx.exception(CHK_VECTOR, next);
    }
    ctx.regs.advance_pc(len);
    Ok(())
}
