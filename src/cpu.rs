use serde::{Deserialize, Serialize};

use crate::condition::{Ccr, ConditionCodes};
use crate::memory::BusError;

pub const SR_SUPERVISOR: u16 = 1 << 13;
pub const SR_INTERRUPT_MASK: u16 = 0x0700;
const SR_IMPLEMENTED: u16 = SR_SUPERVISOR | SR_INTERRUPT_MASK | 0x1F;

/// Exception vectors processed in place by the CPU.
pub const ZERO_DIVIDE_VECTOR: u8 = 5;
pub const CHK_VECTOR: u8 = 6;
pub const TRAPV_VECTOR: u8 = 7;
pub const TRAP_VECTOR_BASE: u8 = 32;

/// MC68000 register file.
///
/// `a[7]` always holds the live stack pointer; the other one of USP/SSP is
/// kept in its shadow slot and swapped when the supervisor state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub d: [u32; 8],
    pub a: [u32; 8],
    pub pc: u32,
    pub cc: ConditionCodes,
    usp: u32,
    ssp: u32,
    supervisor: bool,
    interrupt_mask: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            d: [0; 8],
            a: [0; 8],
            pc: 0,
            cc: ConditionCodes::default(),
            usp: 0,
            ssp: 0,
            supervisor: true,
            interrupt_mask: 7,
        }
    }
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn supervisor_state(&self) -> bool {
        self.supervisor
    }

    pub fn set_supervisor_state(&mut self, supervisor: bool) {
        if supervisor == self.supervisor {
            return;
        }
        if supervisor {
            self.usp = self.a[7];
            self.a[7] = self.ssp;
        } else {
            self.ssp = self.a[7];
            self.a[7] = self.usp;
        }
        self.supervisor = supervisor;
    }

    pub fn usp(&self) -> u32 {
        if self.supervisor {
            self.usp
        } else {
            self.a[7]
        }
    }

    pub fn set_usp(&mut self, value: u32) {
        if self.supervisor {
            self.usp = value;
        } else {
            self.a[7] = value;
        }
    }

    pub fn ssp(&self) -> u32 {
        if self.supervisor {
            self.a[7]
        } else {
            self.ssp
        }
    }

    pub fn set_ssp(&mut self, value: u32) {
        if self.supervisor {
            self.a[7] = value;
        } else {
            self.ssp = value;
        }
    }

    pub fn interrupt_mask(&self) -> u8 {
        self.interrupt_mask
    }

    pub fn set_interrupt_mask(&mut self, level: u8) {
        self.interrupt_mask = level & 7;
    }

    /// Status register with the flags materialised.
    pub fn sr(&self) -> u16 {
        let mut sr = self.cc.ccr().bits() as u16 | (self.interrupt_mask as u16) << 8;
        if self.supervisor {
            sr |= SR_SUPERVISOR;
        }
        sr
    }

    pub fn set_sr(&mut self, value: u16) {
        let value = value & SR_IMPLEMENTED;
        self.cc.set_ccr(Ccr::from_bits_truncate(value as u8));
        self.interrupt_mask = ((value & SR_INTERRUPT_MASK) >> 8) as u8;
        self.set_supervisor_state(value & SR_SUPERVISOR != 0);
    }

    pub fn advance_pc(&mut self, bytes: u32) {
        self.pc = self.pc.wrapping_add(bytes);
    }

    /// Register by the 4-bit number used in index and MOVEM encodings:
    /// 0..=7 are data registers, 8..=15 address registers.
    pub fn get(&self, reg: usize) -> u32 {
        if reg < 8 {
            self.d[reg]
        } else {
            self.a[reg - 8]
        }
    }

    pub fn set(&mut self, reg: usize, value: u32) {
        if reg < 8 {
            self.d[reg] = value;
        } else {
            self.a[reg - 8] = value;
        }
    }
}

/// CPU exceptions that stop the guest. Vectored exceptions (TRAP, CHK,
/// division by zero, interrupts) are processed in place and never surface.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("illegal instruction {opcode:#06x} at {pc:#08x}")]
    IllegalInstruction { opcode: u16, pc: u32 },
    #[error("privilege violation by {opcode:#06x} at {pc:#08x}")]
    PrivilegeViolation { opcode: u16, pc: u32 },
    #[error(transparent)]
    Bus(#[from] BusError),
}

impl Fault {
    /// MC68000 exception vector number.
    pub fn vector(&self) -> u8 {
        match self {
            Self::Bus(_) => 2,
            Self::IllegalInstruction { .. } => 4,
            Self::PrivilegeViolation { .. } => 8,
        }
    }

    pub fn exit_status(&self) -> i32 {
        128 + self.vector() as i32
    }
}
