//! BTST, BCHG, BCLR and BSET with register or immediate bit numbers.

use super::{install_ea, reg9};
use crate::addressing::{EaClass, EffectiveAddress, Mode};
use crate::context::Context;
use crate::cpu::Fault;
use crate::exec::ExecUnit;
use crate::size::{ByteSize, LongWordSize, OperandSize, WordSize};

const BTST: u32 = 0;
const BCHG: u32 = 1;
const BCLR: u32 = 2;
const BSET: u32 = 3;

pub(super) fn install(unit: &mut ExecUnit) {
    // BTST #n may not target an immediate; BTST Dn may.
    install_ea(unit, 0x0800, 0, EaClass::DATA - EaClass::IMMEDIATE, bit_operation, BTST);
    install_ea(unit, 0x0100, 0x0E00, EaClass::DATA, bit_operation, BTST);
    for (kind, bits) in [(BCHG, 0x0040), (BCLR, 0x0080), (BSET, 0x00C0)] {
        install_ea(unit, 0x0800 | bits, 0, EaClass::DATA_ALTERABLE, bit_operation, kind);
        install_ea(unit, 0x0100 | bits, 0x0E00, EaClass::DATA_ALTERABLE, bit_operation, kind);
    }
}

/// Data registers are tested as long words (bit number mod 32), memory as
/// bytes (bit number mod 8).
fn bit_operation(ctx: &mut Context<'_>, op: u16, kind: u32) -> Result<(), Fault> {
    let (bit, offset) = if op & 0x0100 != 0 {
        (ctx.regs.d[reg9(op)], 2)
    } else {
        (ctx.fetch::<WordSize>(2)? & 0xFF, 4)
    };
    let field = op & 0o77;
    let len = match Mode::from_field(field) {
        Some(Mode::DataRegister(_)) => modify::<LongWordSize>(ctx, field, offset, bit, kind)?,
        _ => modify::<ByteSize>(ctx, field, offset, bit, kind)?,
    };
    ctx.regs.advance_pc(len);
    Ok(())
}

fn modify<S: OperandSize>(
    ctx: &mut Context<'_>,
    field: u16,
    offset: u32,
    bit: u32,
    kind: u32,
) -> Result<u32, Fault> {
    let ea = EffectiveAddress::<S>::from_field(field, offset).ok_or_else(|| ctx.illegal())?;
    let mask = 1u32 << (bit % S::BITS);
    let value = ea.get(ctx)?;
    ctx.regs.cc.set_z(value & mask == 0);
    let result = match kind {
        BCHG => Some(value ^ mask),
        BCLR => Some(value & !mask),
        BSET => Some(value | mask),
        _ => None,
    };
    if let Some(r) = result {
        ea.put(ctx, r)?;
    }
    ea.finish(ctx);
    Ok(offset + ea.extension_size())
}
