use std::fmt::Debug;

use crate::memory::{AddressSpace, BusError, FunctionCode};

/// Operand size policy. All values travel as `u32`; a size only decides how
/// many low bits of that word are significant.
pub trait OperandSize: Copy + Default + Debug + Send + Sync + 'static {
    const BITS: u32;
    const SUFFIX: &'static str;

    fn value_bit() -> u32 {
        Self::BITS
    }

    fn value_size() -> u32 {
        Self::BITS / 8
    }

    /// Size used for stack-pointer and PC arithmetic; bytes occupy a word.
    fn aligned_value_size() -> u32 {
        (Self::value_size() + 1) & !1
    }

    fn value_mask() -> u32 {
        u32::MAX >> (32 - Self::BITS)
    }

    fn uvalue(value: u32) -> u32 {
        value & Self::value_mask()
    }

    /// Two's-complement sign extension from `value_bit()` bits.
    fn svalue(value: u32) -> i32 {
        let shift = 32 - Self::BITS;
        ((value << shift) as i32) >> shift
    }

    fn msb(value: u32) -> bool {
        value & (1 << (Self::BITS - 1)) != 0
    }

    /// Reads the low part of a register.
    fn get(reg: u32) -> u32 {
        Self::uvalue(reg)
    }

    /// Replaces the low part of a register, preserving the upper bits.
    fn put(reg: &mut u32, value: u32) {
        let mask = Self::value_mask();
        *reg = (*reg & !mask) | (value & mask);
    }

    fn read<M: AddressSpace + ?Sized>(
        mem: &mut M,
        fc: FunctionCode,
        address: u32,
    ) -> Result<u32, BusError>;

    fn write<M: AddressSpace + ?Sized>(
        mem: &mut M,
        fc: FunctionCode,
        address: u32,
        value: u32,
    ) -> Result<(), BusError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WordSize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LongWordSize;

impl OperandSize for ByteSize {
    const BITS: u32 = 8;
    const SUFFIX: &'static str = "b";

    fn read<M: AddressSpace + ?Sized>(
        mem: &mut M,
        fc: FunctionCode,
        address: u32,
    ) -> Result<u32, BusError> {
        Ok(mem.get_byte(fc, address)? as u32)
    }

    fn write<M: AddressSpace + ?Sized>(
        mem: &mut M,
        fc: FunctionCode,
        address: u32,
        value: u32,
    ) -> Result<(), BusError> {
        mem.put_byte(fc, address, value as u8)
    }
}

impl OperandSize for WordSize {
    const BITS: u32 = 16;
    const SUFFIX: &'static str = "w";

    fn read<M: AddressSpace + ?Sized>(
        mem: &mut M,
        fc: FunctionCode,
        address: u32,
    ) -> Result<u32, BusError> {
        Ok(mem.get_word(fc, address)? as u32)
    }

    fn write<M: AddressSpace + ?Sized>(
        mem: &mut M,
        fc: FunctionCode,
        address: u32,
        value: u32,
    ) -> Result<(), BusError> {
        mem.put_word(fc, address, value as u16)
    }
}

impl OperandSize for LongWordSize {
    const BITS: u32 = 32;
    const SUFFIX: &'static str = "l";

    fn read<M: AddressSpace + ?Sized>(
        mem: &mut M,
        fc: FunctionCode,
        address: u32,
    ) -> Result<u32, BusError> {
        mem.get_long(fc, address)
    }

    fn write<M: AddressSpace + ?Sized>(
        mem: &mut M,
        fc: FunctionCode,
        address: u32,
        value: u32,
    ) -> Result<(), BusError> {
        mem.put_long(fc, address, value)
    }
}
