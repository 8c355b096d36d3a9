use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Function code carried by every bus access (FC2..FC0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionCode {
    UserData = 1,
    UserProgram = 2,
    SupervisorData = 5,
    SupervisorProgram = 6,
}

impl FunctionCode {
    pub fn from_flags(supervisor: bool, program: bool) -> Self {
        match (supervisor, program) {
            (false, false) => Self::UserData,
            (false, true) => Self::UserProgram,
            (true, false) => Self::SupervisorData,
            (true, true) => Self::SupervisorProgram,
        }
    }

    pub fn is_supervisor(self) -> bool {
        matches!(self, Self::SupervisorData | Self::SupervisorProgram)
    }

    pub fn is_program(self) -> bool {
        matches!(self, Self::UserProgram | Self::SupervisorProgram)
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserData => "user data",
            Self::UserProgram => "user program",
            Self::SupervisorData => "supervisor data",
            Self::SupervisorProgram => "supervisor program",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessKind {
    Read,
    Write,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("bus error: {kind} at {address:#08x} ({function_code})")]
pub struct BusError {
    pub address: u32,
    pub function_code: FunctionCode,
    pub kind: AccessKind,
}

impl BusError {
    pub fn new(address: u32, function_code: FunctionCode, kind: AccessKind) -> Self {
        Self {
            address,
            function_code,
            kind,
        }
    }
}

/// Byte-addressed, big-endian view of the emulated bus.
///
/// Word and long accesses are not alignment checked. Implementors only need
/// the byte and word primitives; long and bulk accesses are composed from
/// them unless a region has a faster path.
pub trait AddressSpace {
    fn get_byte(&mut self, fc: FunctionCode, address: u32) -> Result<u8, BusError>;
    fn get_word(&mut self, fc: FunctionCode, address: u32) -> Result<u16, BusError>;
    fn put_byte(&mut self, fc: FunctionCode, address: u32, value: u8) -> Result<(), BusError>;
    fn put_word(&mut self, fc: FunctionCode, address: u32, value: u16) -> Result<(), BusError>;

    fn get_long(&mut self, fc: FunctionCode, address: u32) -> Result<u32, BusError> {
        let hi = self.get_word(fc, address)? as u32;
        let lo = self.get_word(fc, address.wrapping_add(2))? as u32;
        Ok(hi << 16 | lo)
    }

    fn put_long(&mut self, fc: FunctionCode, address: u32, value: u32) -> Result<(), BusError> {
        self.put_word(fc, address, (value >> 16) as u16)?;
        self.put_word(fc, address.wrapping_add(2), value as u16)
    }

    fn read(&mut self, fc: FunctionCode, address: u32, buf: &mut [u8]) -> Result<(), BusError> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.get_byte(fc, address.wrapping_add(i as u32))?;
        }
        Ok(())
    }

    fn write(&mut self, fc: FunctionCode, address: u32, data: &[u8]) -> Result<(), BusError> {
        for (i, &b) in data.iter().enumerate() {
            self.put_byte(fc, address.wrapping_add(i as u32), b)?;
        }
        Ok(())
    }

    /// Reads a NUL-terminated byte string (terminator excluded).
    fn get_string(&mut self, fc: FunctionCode, address: u32) -> Result<Vec<u8>, BusError> {
        let mut out = Vec::new();
        let mut addr = address;
        loop {
            match self.get_byte(fc, addr)? {
                0 => return Ok(out),
                b => out.push(b),
            }
            addr = addr.wrapping_add(1);
        }
    }

    /// Writes `data` followed by a NUL terminator.
    fn put_string(&mut self, fc: FunctionCode, address: u32, data: &[u8]) -> Result<(), BusError> {
        self.write(fc, address, data)?;
        self.put_byte(fc, address.wrapping_add(data.len() as u32), 0)
    }
}

pub const PAGE_SHIFT: u32 = 13;
pub const PAGE_SIZE: u32 = 1 << PAGE_SHIFT;

/// Routes accesses to regions by 8 KiB page after masking the address to the
/// external bus width. Unmapped pages raise bus errors.
pub struct MemoryMap {
    address_mask: u32,
    pages: Vec<Option<usize>>,
    regions: Vec<Box<dyn AddressSpace + Send>>,
}

impl MemoryMap {
    pub fn new(address_bits: u32) -> Self {
        let address_bits = address_bits.clamp(PAGE_SHIFT, 32);
        let address_mask = u32::MAX >> (32 - address_bits);
        let page_count = ((address_mask as u64 + 1) >> PAGE_SHIFT) as usize;
        Self {
            address_mask,
            pages: vec![None; page_count],
            regions: Vec::new(),
        }
    }

    pub fn address_mask(&self) -> u32 {
        self.address_mask
    }

    /// Maps `region` over every page touching `[start, start + len)`.
    /// Later mappings replace earlier ones page by page.
    pub fn map<R>(&mut self, start: u32, len: u32, region: R)
    where
        R: AddressSpace + Send + 'static,
    {
        let index = self.regions.len();
        self.regions.push(Box::new(region));
        for page in self.page_range(start, len) {
            self.pages[page] = Some(index);
        }
    }

    pub fn unmap(&mut self, start: u32, len: u32) {
        for page in self.page_range(start, len) {
            self.pages[page] = None;
        }
    }

    /// Pages touching `[start, start + len)`. A range running past the top
    /// of the bus is clamped to the last page.
    fn page_range(&self, start: u32, len: u32) -> Range<usize> {
        if len == 0 {
            return 0..0;
        }
        let start = start & self.address_mask;
        let end = start as u64 + len as u64 - 1;
        if end > self.address_mask as u64 {
            warn!(
                "range {:#08x}+{:#x} runs past the {:#08x} bus limit, clamped",
                start, len, self.address_mask
            );
        }
        let last = end.min(self.address_mask as u64) as u32;
        (start >> PAGE_SHIFT) as usize..(last >> PAGE_SHIFT) as usize + 1
    }

    pub fn is_mapped(&self, address: u32) -> bool {
        self.pages[((address & self.address_mask) >> PAGE_SHIFT) as usize].is_some()
    }

    fn region(
        &mut self,
        fc: FunctionCode,
        address: u32,
        kind: AccessKind,
    ) -> Result<(&mut (dyn AddressSpace + Send + 'static), u32), BusError> {
        let address = address & self.address_mask;
        match self.pages[(address >> PAGE_SHIFT) as usize] {
            Some(index) => Ok((self.regions[index].as_mut(), address)),
            None => Err(BusError::new(address, fc, kind)),
        }
    }

    fn same_page(&self, address: u32) -> bool {
        let a = address & self.address_mask;
        let b = address.wrapping_add(1) & self.address_mask;
        a >> PAGE_SHIFT == b >> PAGE_SHIFT
    }
}

impl AddressSpace for MemoryMap {
    fn get_byte(&mut self, fc: FunctionCode, address: u32) -> Result<u8, BusError> {
        let (region, address) = self.region(fc, address, AccessKind::Read)?;
        region.get_byte(fc, address)
    }

    fn get_word(&mut self, fc: FunctionCode, address: u32) -> Result<u16, BusError> {
        if !self.same_page(address) {
            let hi = self.get_byte(fc, address)?;
            let lo = self.get_byte(fc, address.wrapping_add(1))?;
            return Ok(u16::from_be_bytes([hi, lo]));
        }
        let (region, address) = self.region(fc, address, AccessKind::Read)?;
        region.get_word(fc, address)
    }

    fn put_byte(&mut self, fc: FunctionCode, address: u32, value: u8) -> Result<(), BusError> {
        let (region, address) = self.region(fc, address, AccessKind::Write)?;
        region.put_byte(fc, address, value)
    }

    fn put_word(&mut self, fc: FunctionCode, address: u32, value: u16) -> Result<(), BusError> {
        if !self.same_page(address) {
            let [hi, lo] = value.to_be_bytes();
            self.put_byte(fc, address, hi)?;
            return self.put_byte(fc, address.wrapping_add(1), lo);
        }
        let (region, address) = self.region(fc, address, AccessKind::Write)?;
        region.put_word(fc, address, value)
    }
}

/// Main memory.
#[derive(Clone, Serialize, Deserialize)]
pub struct Ram {
    pub mem: Vec<u8>,
    pub base: u32,
    /// Bytes from `base` that only supervisor function codes may write.
    pub supervisor_area: u32,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Self {
            mem: vec![0; size],
            base: 0,
            supervisor_area: 0,
        }
    }

    pub fn with_base(base: u32, size: usize) -> Self {
        Self {
            base,
            ..Self::new(size)
        }
    }

    fn offset(
        &self,
        fc: FunctionCode,
        address: u32,
        len: usize,
        kind: AccessKind,
    ) -> Result<usize, BusError> {
        let off = address.wrapping_sub(self.base) as usize;
        if off.checked_add(len).map_or(true, |end| end > self.mem.len()) {
            return Err(BusError::new(address, fc, kind));
        }
        if kind == AccessKind::Write && !fc.is_supervisor() && (off as u32) < self.supervisor_area {
            return Err(BusError::new(address, fc, kind));
        }
        Ok(off)
    }
}

impl AddressSpace for Ram {
    fn get_byte(&mut self, fc: FunctionCode, address: u32) -> Result<u8, BusError> {
        let off = self.offset(fc, address, 1, AccessKind::Read)?;
        Ok(self.mem[off])
    }

    fn get_word(&mut self, fc: FunctionCode, address: u32) -> Result<u16, BusError> {
        let off = self.offset(fc, address, 2, AccessKind::Read)?;
        Ok(u16::from_be_bytes([self.mem[off], self.mem[off + 1]]))
    }

    fn get_long(&mut self, fc: FunctionCode, address: u32) -> Result<u32, BusError> {
        let off = self.offset(fc, address, 4, AccessKind::Read)?;
        Ok(u32::from_be_bytes([
            self.mem[off],
            self.mem[off + 1],
            self.mem[off + 2],
            self.mem[off + 3],
        ]))
    }

    fn put_byte(&mut self, fc: FunctionCode, address: u32, value: u8) -> Result<(), BusError> {
        let off = self.offset(fc, address, 1, AccessKind::Write)?;
        self.mem[off] = value;
        Ok(())
    }

    fn put_word(&mut self, fc: FunctionCode, address: u32, value: u16) -> Result<(), BusError> {
        let off = self.offset(fc, address, 2, AccessKind::Write)?;
        self.mem[off..off + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn put_long(&mut self, fc: FunctionCode, address: u32, value: u32) -> Result<(), BusError> {
        let off = self.offset(fc, address, 4, AccessKind::Write)?;
        self.mem[off..off + 4].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

/// Read-only image. A data-only ROM (font ROM, for instance) also refuses
/// program-space reads.
#[derive(Clone, Serialize, Deserialize)]
pub struct Rom {
    pub data: Vec<u8>,
    pub base: u32,
    pub data_only: bool,
}

impl Rom {
    pub fn new(base: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            base,
            data_only: false,
        }
    }

    pub fn data_only(base: u32, data: Vec<u8>) -> Self {
        Self {
            data_only: true,
            ..Self::new(base, data)
        }
    }

    fn offset(&self, fc: FunctionCode, address: u32, len: usize) -> Result<usize, BusError> {
        let off = address.wrapping_sub(self.base) as usize;
        let in_range = off.checked_add(len).map_or(false, |end| end <= self.data.len());
        if !in_range || (self.data_only && fc.is_program()) {
            return Err(BusError::new(address, fc, AccessKind::Read));
        }
        Ok(off)
    }
}

impl AddressSpace for Rom {
    fn get_byte(&mut self, fc: FunctionCode, address: u32) -> Result<u8, BusError> {
        let off = self.offset(fc, address, 1)?;
        Ok(self.data[off])
    }

    fn get_word(&mut self, fc: FunctionCode, address: u32) -> Result<u16, BusError> {
        let off = self.offset(fc, address, 2)?;
        Ok(u16::from_be_bytes([self.data[off], self.data[off + 1]]))
    }

    fn put_byte(&mut self, fc: FunctionCode, address: u32, _value: u8) -> Result<(), BusError> {
        Err(BusError::new(address, fc, AccessKind::Write))
    }

    fn put_word(&mut self, fc: FunctionCode, address: u32, _value: u16) -> Result<(), BusError> {
        Err(BusError::new(address, fc, AccessKind::Write))
    }
}
