use tracing::debug;

use crate::cpu::{Fault, Registers};
use crate::memory::{AddressSpace, BusError, FunctionCode};
use crate::size::{LongWordSize, OperandSize, WordSize};

/// Execution state of one guest program: the register file, the address
/// space it runs in, and pending interrupt and exit requests.
pub struct Context<'a> {
    pub regs: Registers,
    pub mem: &'a mut dyn AddressSpace,
    program_fc: FunctionCode,
    data_fc: FunctionCode,
    opcode: u16,
    pending: [Option<u8>; 8],
    interrupt_pending: bool,
    exit_status: Option<i32>,
}

impl<'a> Context<'a> {
    pub fn new(mem: &'a mut dyn AddressSpace) -> Self {
        let mut ctx = Self {
            regs: Registers::new(),
            mem,
            program_fc: FunctionCode::SupervisorProgram,
            data_fc: FunctionCode::SupervisorData,
            opcode: 0,
            pending: [None; 8],
            interrupt_pending: false,
            exit_status: None,
        };
        ctx.sync_function_codes();
        ctx
    }

    pub fn supervisor_state(&self) -> bool {
        self.regs.supervisor_state()
    }

    pub fn set_supervisor_state(&mut self, supervisor: bool) {
        self.regs.set_supervisor_state(supervisor);
        self.sync_function_codes();
    }

    pub fn sr(&self) -> u16 {
        self.regs.sr()
    }

    pub fn set_sr(&mut self, value: u16) {
        self.regs.set_sr(value);
        self.sync_function_codes();
    }

    /// Refreshes the cached function codes after `regs` was changed directly.
    pub fn sync_function_codes(&mut self) {
        let supervisor = self.regs.supervisor_state();
        self.program_fc = FunctionCode::from_flags(supervisor, true);
        self.data_fc = FunctionCode::from_flags(supervisor, false);
    }

    pub fn program_fc(&self) -> FunctionCode {
        self.program_fc
    }

    pub fn data_fc(&self) -> FunctionCode {
        self.data_fc
    }

    /// Opcode of the instruction being executed.
    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub(crate) fn set_opcode(&mut self, opcode: u16) {
        self.opcode = opcode;
    }

    /// Reads the instruction-stream word at `pc + offset`.
    pub fn fetch_word(&mut self, offset: u32) -> Result<u16, BusError> {
        let address = self.regs.pc.wrapping_add(offset);
        self.mem.get_word(self.program_fc, address)
    }

    /// Reads an immediate operand at `pc + offset`. Byte immediates occupy
    /// the low half of a word.
    pub fn fetch<S: OperandSize>(&mut self, offset: u32) -> Result<u32, BusError> {
        let address = self.regs.pc.wrapping_add(offset);
        if S::BITS == 32 {
            self.mem.get_long(self.program_fc, address)
        } else {
            Ok(S::uvalue(self.mem.get_word(self.program_fc, address)? as u32))
        }
    }

    pub fn read<S: OperandSize>(&mut self, address: u32) -> Result<u32, BusError> {
        S::read(&mut *self.mem, self.data_fc, address)
    }

    pub fn write<S: OperandSize>(&mut self, address: u32, value: u32) -> Result<(), BusError> {
        S::write(&mut *self.mem, self.data_fc, address, value)
    }

    pub fn read_program<S: OperandSize>(&mut self, address: u32) -> Result<u32, BusError> {
        S::read(&mut *self.mem, self.program_fc, address)
    }

    pub fn push<S: OperandSize>(&mut self, value: u32) -> Result<(), BusError> {
        let sp = self.regs.a[7].wrapping_sub(S::aligned_value_size());
        S::write(&mut *self.mem, self.data_fc, sp, value)?;
        self.regs.a[7] = sp;
        Ok(())
    }

    pub fn pop<S: OperandSize>(&mut self) -> Result<u32, BusError> {
        let sp = self.regs.a[7];
        let value = S::read(&mut *self.mem, self.data_fc, sp)?;
        self.regs.a[7] = sp.wrapping_add(S::aligned_value_size());
        Ok(value)
    }

    /// Vectored exception processing: enter supervisor state, stack the
    /// return address and the old SR, and continue at the vector's handler.
    pub fn exception(&mut self, vector: u8, return_address: u32) -> Result<(), Fault> {
        let sr = self.regs.sr();
        self.set_supervisor_state(true);
        self.push::<LongWordSize>(return_address)?;
        self.push::<WordSize>(sr as u32)?;
        let handler = self
            .mem
            .get_long(FunctionCode::SupervisorData, vector as u32 * 4)?;
        debug!(
            vector,
            "exception from {:#08x} to {:#08x}", return_address, handler
        );
        self.regs.pc = handler;
        Ok(())
    }

    /// Requests an interrupt at `level` (1..=7). The vector is taken as the
    /// autovector or device vector the collaborator supplies.
    pub fn interrupt(&mut self, level: u8, vector: u8) {
        let level = (level & 7) as usize;
        if level == 0 {
            return;
        }
        self.pending[level] = Some(vector);
        self.interrupt_pending = true;
    }

    pub fn interrupt_pending(&self) -> bool {
        self.interrupt_pending
    }

    /// Accepts the highest pending interrupt above the mask. Level 7 cannot
    /// be masked.
    pub(crate) fn handle_interrupts(&mut self) -> Result<(), Fault> {
        if !self.interrupt_pending {
            return Ok(());
        }
        let mask = self.regs.interrupt_mask();
        if let Some(level) = (1..8u8).rev().find(|&l| self.pending[l as usize].is_some()) {
            if level > mask || level == 7 {
                if let Some(vector) = self.pending[level as usize].take() {
                    debug!(level, vector, "interrupt accepted");
                    let pc = self.regs.pc;
                    self.exception(vector, pc)?;
                    self.regs.set_interrupt_mask(level);
                }
            }
        }
        self.interrupt_pending = self.pending.iter().any(Option::is_some);
        Ok(())
    }

    /// Asks the run loop to stop after the current instruction.
    pub fn request_exit(&mut self, status: i32) {
        self.exit_status = Some(status);
    }

    pub(crate) fn take_exit(&mut self) -> Option<i32> {
        self.exit_status.take()
    }

    pub fn illegal(&self) -> Fault {
        Fault::IllegalInstruction {
            opcode: self.opcode,
            pc: self.regs.pc,
        }
    }

    pub fn require_supervisor(&self) -> Result<(), Fault> {
        if self.supervisor_state() {
            Ok(())
        } else {
            Err(Fault::PrivilegeViolation {
                opcode: self.opcode,
                pc: self.regs.pc,
            })
        }
    }
}
