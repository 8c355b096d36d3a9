use std::marker::PhantomData;

use bitflags::bitflags;

use crate::context::Context;
use crate::cpu::Fault;
use crate::size::{LongWordSize, OperandSize};

/// The twelve MC68000 addressing modes. Register numbers are 0..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    DataRegister(usize),
    AddressRegister(usize),
    Indirect(usize),
    PostIncrement(usize),
    PreDecrement(usize),
    Displacement(usize),
    Indexed(usize),
    AbsoluteShort,
    AbsoluteLong,
    PcDisplacement,
    PcIndexed,
    Immediate,
}

impl Mode {
    pub fn decode(mode: u16, reg: u16) -> Option<Self> {
        let r = (reg & 7) as usize;
        Some(match mode & 7 {
            0 => Self::DataRegister(r),
            1 => Self::AddressRegister(r),
            2 => Self::Indirect(r),
            3 => Self::PostIncrement(r),
            4 => Self::PreDecrement(r),
            5 => Self::Displacement(r),
            6 => Self::Indexed(r),
            _ => match r {
                0 => Self::AbsoluteShort,
                1 => Self::AbsoluteLong,
                2 => Self::PcDisplacement,
                3 => Self::PcIndexed,
                4 => Self::Immediate,
                _ => return None,
            },
        })
    }

    /// Decodes the standard 6-bit `mode:reg` field in the low bits of `field`.
    pub fn from_field(field: u16) -> Option<Self> {
        Self::decode(field >> 3, field)
    }

    pub fn class(self) -> EaClass {
        match self {
            Self::DataRegister(_) => EaClass::DATA_REGISTER,
            Self::AddressRegister(_) => EaClass::ADDRESS_REGISTER,
            Self::Indirect(_) => EaClass::INDIRECT,
            Self::PostIncrement(_) => EaClass::POST_INCREMENT,
            Self::PreDecrement(_) => EaClass::PRE_DECREMENT,
            Self::Displacement(_) => EaClass::DISPLACEMENT,
            Self::Indexed(_) => EaClass::INDEXED,
            Self::AbsoluteShort => EaClass::ABSOLUTE_SHORT,
            Self::AbsoluteLong => EaClass::ABSOLUTE_LONG,
            Self::PcDisplacement => EaClass::PC_DISPLACEMENT,
            Self::PcIndexed => EaClass::PC_INDEXED,
            Self::Immediate => EaClass::IMMEDIATE,
        }
    }
}

bitflags! {
    /// Sets of addressing modes, used to install a handler only at the
    /// opcodes whose effective-address field is legal for it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EaClass: u16 {
        const DATA_REGISTER = 1 << 0;
        const ADDRESS_REGISTER = 1 << 1;
        const INDIRECT = 1 << 2;
        const POST_INCREMENT = 1 << 3;
        const PRE_DECREMENT = 1 << 4;
        const DISPLACEMENT = 1 << 5;
        const INDEXED = 1 << 6;
        const ABSOLUTE_SHORT = 1 << 7;
        const ABSOLUTE_LONG = 1 << 8;
        const PC_DISPLACEMENT = 1 << 9;
        const PC_INDEXED = 1 << 10;
        const IMMEDIATE = 1 << 11;

        const ALL = 0x0FFF;
        const DATA = Self::ALL.bits() & !Self::ADDRESS_REGISTER.bits();
        const MEMORY = Self::DATA.bits() & !Self::DATA_REGISTER.bits();
        const CONTROL = Self::INDIRECT.bits()
            | Self::DISPLACEMENT.bits()
            | Self::INDEXED.bits()
            | Self::ABSOLUTE_SHORT.bits()
            | Self::ABSOLUTE_LONG.bits()
            | Self::PC_DISPLACEMENT.bits()
            | Self::PC_INDEXED.bits();
        const ALTERABLE = Self::ALL.bits()
            & !(Self::PC_DISPLACEMENT.bits() | Self::PC_INDEXED.bits() | Self::IMMEDIATE.bits());
        const DATA_ALTERABLE = Self::DATA.bits() & Self::ALTERABLE.bits();
        const MEMORY_ALTERABLE = Self::MEMORY.bits() & Self::ALTERABLE.bits();
    }
}

/// `(class, ea field bits, don't-care mask)` for each mode.
const MODE_PATTERNS: [(EaClass, u16, u16); 12] = [
    (EaClass::DATA_REGISTER, 0o00, 0o7),
    (EaClass::ADDRESS_REGISTER, 0o10, 0o7),
    (EaClass::INDIRECT, 0o20, 0o7),
    (EaClass::POST_INCREMENT, 0o30, 0o7),
    (EaClass::PRE_DECREMENT, 0o40, 0o7),
    (EaClass::DISPLACEMENT, 0o50, 0o7),
    (EaClass::INDEXED, 0o60, 0o7),
    (EaClass::ABSOLUTE_SHORT, 0o70, 0),
    (EaClass::ABSOLUTE_LONG, 0o71, 0),
    (EaClass::PC_DISPLACEMENT, 0o72, 0),
    (EaClass::PC_INDEXED, 0o73, 0),
    (EaClass::IMMEDIATE, 0o74, 0),
];

impl EaClass {
    /// Opcode patterns `(bits, mask)` of the source-position EA field
    /// (bits 0..5) for every mode in the class.
    pub fn patterns(self) -> impl Iterator<Item = (u16, u16)> {
        MODE_PATTERNS
            .iter()
            .filter(move |(class, _, _)| self.contains(*class))
            .map(|&(_, bits, mask)| (bits, mask))
    }

    /// Same as `patterns` for the swapped `reg:mode` destination field of
    /// MOVE (bits 6..11).
    pub fn destination_patterns(self) -> impl Iterator<Item = (u16, u16)> {
        self.patterns().map(|(bits, mask)| {
            let mode = bits >> 3;
            let reg = bits & 7;
            ((reg << 9) | (mode << 6), mask << 9)
        })
    }
}

/// An operand resolver: one addressing mode bound to an operand size and to
/// the byte offset of its extension words from the opcode.
///
/// Extension words are read relative to the instruction's PC, which stays
/// put until the handler advances it. Register side effects of
/// post-increment and pre-decrement only happen in `finish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveAddress<S> {
    mode: Mode,
    offset: u32,
    _size: PhantomData<S>,
}

impl<S: OperandSize> EffectiveAddress<S> {
    pub fn new(mode: Mode, offset: u32) -> Self {
        Self {
            mode,
            offset,
            _size: PhantomData,
        }
    }

    pub fn from_field(field: u16, offset: u32) -> Option<Self> {
        Mode::from_field(field).map(|mode| Self::new(mode, offset))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Bytes of extension words this operand consumes.
    pub fn extension_size(&self) -> u32 {
        match self.mode {
            Mode::Displacement(_)
            | Mode::Indexed(_)
            | Mode::AbsoluteShort
            | Mode::PcDisplacement
            | Mode::PcIndexed => 2,
            Mode::AbsoluteLong => 4,
            Mode::Immediate => {
                if S::BITS == 32 {
                    4
                } else {
                    2
                }
            }
            _ => 0,
        }
    }

    /// Effective address of a memory operand.
    pub fn address(&self, ctx: &mut Context<'_>) -> Result<u32, Fault> {
        let address = match self.mode {
            Mode::Indirect(r) | Mode::PostIncrement(r) => ctx.regs.a[r],
            Mode::PreDecrement(r) => ctx.regs.a[r].wrapping_sub(step::<S>(r)),
            Mode::Displacement(r) => {
                let base = ctx.regs.a[r];
                let disp = ctx.fetch_word(self.offset)? as i16;
                base.wrapping_add(disp as u32)
            }
            Mode::Indexed(r) => {
                let base = ctx.regs.a[r];
                index(ctx, base, self.offset)?
            }
            Mode::AbsoluteShort => ctx.fetch_word(self.offset)? as i16 as u32,
            Mode::AbsoluteLong => ctx.fetch::<LongWordSize>(self.offset)?,
            Mode::PcDisplacement => {
                let base = ctx.regs.pc.wrapping_add(self.offset);
                let disp = ctx.fetch_word(self.offset)? as i16;
                base.wrapping_add(disp as u32)
            }
            Mode::PcIndexed => {
                let base = ctx.regs.pc.wrapping_add(self.offset);
                index(ctx, base, self.offset)?
            }
            Mode::DataRegister(_) | Mode::AddressRegister(_) | Mode::Immediate => {
                return Err(ctx.illegal());
            }
        };
        Ok(address)
    }

    pub fn get(&self, ctx: &mut Context<'_>) -> Result<u32, Fault> {
        match self.mode {
            Mode::DataRegister(r) => Ok(S::get(ctx.regs.d[r])),
            Mode::AddressRegister(r) => Ok(S::get(ctx.regs.a[r])),
            Mode::Immediate => Ok(ctx.fetch::<S>(self.offset)?),
            Mode::PcDisplacement | Mode::PcIndexed => {
                let address = self.address(ctx)?;
                Ok(ctx.read_program::<S>(address)?)
            }
            _ => {
                let address = self.address(ctx)?;
                Ok(ctx.read::<S>(address)?)
            }
        }
    }

    /// Writes the operand. An address register always receives the value
    /// sign-extended to 32 bits.
    pub fn put(&self, ctx: &mut Context<'_>, value: u32) -> Result<(), Fault> {
        match self.mode {
            Mode::DataRegister(r) => S::put(&mut ctx.regs.d[r], value),
            Mode::AddressRegister(r) => ctx.regs.a[r] = S::svalue(value) as u32,
            Mode::Immediate | Mode::PcDisplacement | Mode::PcIndexed => {
                return Err(ctx.illegal());
            }
            _ => {
                let address = self.address(ctx)?;
                ctx.write::<S>(address, value)?;
            }
        }
        Ok(())
    }

    /// Applies post-increment or pre-decrement to the address register.
    pub fn finish(&self, ctx: &mut Context<'_>) {
        match self.mode {
            Mode::PostIncrement(r) => ctx.regs.a[r] = ctx.regs.a[r].wrapping_add(step::<S>(r)),
            Mode::PreDecrement(r) => ctx.regs.a[r] = ctx.regs.a[r].wrapping_sub(step::<S>(r)),
            _ => {}
        }
    }
}

/// A7 moves by the aligned size so the stack stays word aligned.
fn step<S: OperandSize>(reg: usize) -> u32 {
    if reg == 7 {
        S::aligned_value_size()
    } else {
        S::value_size()
    }
}

/// `base + d8 + Xn` from a brief extension word.
fn index(ctx: &mut Context<'_>, base: u32, offset: u32) -> Result<u32, Fault> {
    let ext = ctx.fetch_word(offset)?;
    let disp = ext as u8 as i8 as i32;
    let xn = ctx.regs.get((ext >> 12) as usize);
    let xn = if ext & 0x0800 != 0 {
        xn as i32
    } else {
        xn as u16 as i16 as i32
    };
    Ok(base.wrapping_add(disp as u32).wrapping_add(xn as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{AddressSpace, FunctionCode, Ram};
    use crate::size::{ByteSize, WordSize};
    use pretty_assertions::assert_eq;

    const SD: FunctionCode = FunctionCode::SupervisorData;

    #[test]
    fn decode_rejects_reserved_modes() {
        assert_eq!(Mode::from_field(0o74), Some(Mode::Immediate));
        assert_eq!(Mode::from_field(0o75), None);
        assert_eq!(Mode::from_field(0o37), Some(Mode::PostIncrement(7)));
    }

    #[test]
    fn class_patterns() {
        assert_eq!(EaClass::ALL.patterns().count(), 12);
        assert_eq!(EaClass::DATA_ALTERABLE.patterns().count(), 8);
        assert_eq!(EaClass::CONTROL.patterns().count(), 7);
        let dest: Vec<_> = EaClass::DATA_REGISTER
            .union(EaClass::ABSOLUTE_LONG)
            .destination_patterns()
            .collect();
        assert_eq!(dest, vec![(0, 0x0E00), (0x03C0, 0)]);
    }

    #[test]
    fn post_increment_steps() {
        let mut ram = Ram::new(0x100);
        let mut ctx = Context::new(&mut ram);
        ctx.regs.a[7] = 0x40;
        ctx.regs.a[0] = 0x40;
        EffectiveAddress::<ByteSize>::new(Mode::PostIncrement(7), 2).finish(&mut ctx);
        EffectiveAddress::<ByteSize>::new(Mode::PostIncrement(0), 2).finish(&mut ctx);
        assert_eq!(ctx.regs.a[7], 0x42);
        assert_eq!(ctx.regs.a[0], 0x41);
        EffectiveAddress::<LongWordSize>::new(Mode::PreDecrement(0), 2).finish(&mut ctx);
        assert_eq!(ctx.regs.a[0], 0x3D);
    }

    #[test]
    fn pre_decrement_address_is_stable_until_finish() {
        let mut ram = Ram::new(0x100);
        let mut ctx = Context::new(&mut ram);
        ctx.regs.a[1] = 0x40;
        let ea = EffectiveAddress::<WordSize>::new(Mode::PreDecrement(1), 2);
        ea.put(&mut ctx, 0x1234).unwrap();
        assert_eq!(ea.get(&mut ctx).unwrap(), 0x1234);
        assert_eq!(ctx.regs.a[1], 0x40);
        ea.finish(&mut ctx);
        assert_eq!(ctx.regs.a[1], 0x3E);
        assert_eq!(ctx.mem.get_word(SD, 0x3E).unwrap(), 0x1234);
    }

    #[test]
    fn indexed_with_word_index() {
        let mut ram = Ram::new(0x100);
        // extension word: D3.W, displacement 8
        ram.put_word(SD, 0x12, 0x3008).unwrap();
        let mut ctx = Context::new(&mut ram);
        ctx.regs.pc = 0x10;
        ctx.regs.a[0] = 0x2000;
        ctx.regs.d[3] = 0xFFFF_0004;
        let ea = EffectiveAddress::<WordSize>::new(Mode::Indexed(0), 2);
        assert_eq!(ea.address(&mut ctx).unwrap(), 0x200C);
        assert_eq!(ea.extension_size(), 2);
    }

    #[test]
    fn indexed_with_long_address_index_and_negative_displacement() {
        let mut ram = Ram::new(0x100);
        // A2.L, displacement -2
        ram.put_word(SD, 0x12, 0xA8FE).unwrap();
        let mut ctx = Context::new(&mut ram);
        ctx.regs.pc = 0x10;
        ctx.regs.a[0] = 0x2000;
        ctx.regs.a[2] = 0x0001_0000;
        let ea = EffectiveAddress::<WordSize>::new(Mode::Indexed(0), 2);
        assert_eq!(ea.address(&mut ctx).unwrap(), 0x0001_1FFE);
    }

    #[test]
    fn pc_relative_and_immediate() {
        let mut ram = Ram::new(0x100);
        ram.put_word(SD, 0x22, 0x0010).unwrap();
        ram.put_word(SD, 0x34, 0xBEEF).unwrap();
        ram.put_long(SD, 0x24, 0x89AB_CDEF).unwrap();
        let mut ctx = Context::new(&mut ram);
        ctx.regs.pc = 0x20;
        let pc_rel = EffectiveAddress::<WordSize>::new(Mode::PcDisplacement, 2);
        assert_eq!(pc_rel.address(&mut ctx).unwrap(), 0x32);
        let imm = EffectiveAddress::<LongWordSize>::new(Mode::Immediate, 4);
        assert_eq!(imm.get(&mut ctx).unwrap(), 0x89AB_CDEF);
        assert_eq!(imm.extension_size(), 4);
        let imm = EffectiveAddress::<ByteSize>::new(Mode::Immediate, 2);
        assert_eq!(imm.get(&mut ctx).unwrap(), 0x10);
        assert!(pc_rel.put(&mut ctx, 0).is_err());
    }

    #[test]
    fn address_register_put_sign_extends() {
        let mut ram = Ram::new(0x10);
        let mut ctx = Context::new(&mut ram);
        EffectiveAddress::<WordSize>::new(Mode::AddressRegister(2), 2)
            .put(&mut ctx, 0x8000)
            .unwrap();
        assert_eq!(ctx.regs.a[2], 0xFFFF_8000);
    }
}
