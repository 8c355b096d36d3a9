//! MC68000 instruction handlers.
//!
//! Every handler decodes its operands from the opcode, resolves them with
//! `EffectiveAddress` resolvers chained at `2 + extension sizes`, and then
//! either advances the PC past the instruction or transfers control.

mod alu;
mod bcd;
mod bits;
mod data;
mod flow;
mod shift;
mod system;

use crate::addressing::{EaClass, EffectiveAddress};
use crate::condition::Ccr;
use crate::context::Context;
use crate::cpu::Fault;
use crate::exec::{ExecUnit, Handler};
use crate::size::OperandSize;

/// Installs the whole MC68000 instruction set. Opcodes left out (MOVEP,
/// STOP, ILLEGAL, lines A and F) stay on the illegal default.
pub(crate) fn install(unit: &mut ExecUnit) {
    data::install(unit);
    alu::install(unit);
    bcd::install(unit);
    bits::install(unit);
    shift::install(unit);
    flow::install(unit);
    system::install(unit);
}

/// Register number in bits 0..2.
fn reg0(op: u16) -> usize {
    (op & 7) as usize
}

/// Register number in bits 9..11.
fn reg9(op: u16) -> usize {
    ((op >> 9) & 7) as usize
}

/// Resolver for the 6-bit EA field in the low bits of `field`.
fn operand<S: OperandSize>(
    ctx: &Context<'_>,
    field: u16,
    offset: u32,
) -> Result<EffectiveAddress<S>, Fault> {
    EffectiveAddress::from_field(field & 0o77, offset).ok_or_else(|| ctx.illegal())
}

/// Installs `handler` at `base` for every addressing mode in `class`.
/// `mask` covers additional don't-care bits outside the EA field.
fn install_ea(unit: &mut ExecUnit, base: u16, mask: u16, class: EaClass, handler: Handler, data: u32) {
    for (bits, ea_mask) in class.patterns() {
        unit.install(base | bits, mask | ea_mask, handler, data);
    }
}

/// Handler instances keyed by the standard size field in bits 6..7.
fn sized(byte: Handler, word: Handler, long: Handler) -> [(u16, Handler); 3] {
    [(0x0000, byte), (0x0040, word), (0x0080, long)]
}

/// Byte operations cannot address an address register directly.
fn byte_class(size_bits: u16, class: EaClass) -> EaClass {
    if size_bits == 0 {
        class - EaClass::ADDRESS_REGISTER
    } else {
        class
    }
}

/// Flag update shared by ADDX, SUBX, NEGX and the BCD instructions: Z is
/// only ever cleared, and X follows C.
fn set_extended_flags(ctx: &mut Context<'_>, n: bool, zero: bool, v: bool, c: bool) {
    let z = zero && ctx.regs.cc.eq();
    let mut ccr = Ccr::empty();
    ccr.set(Ccr::N, n);
    ccr.set(Ccr::Z, z);
    ccr.set(Ccr::V, v);
    ccr.set(Ccr::C, c);
    ccr.set(Ccr::X, c);
    ctx.regs.cc.set_ccr(ccr);
}
