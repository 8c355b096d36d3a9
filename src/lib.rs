pub mod addressing;
pub mod condition;
pub mod config;
pub mod context;
pub mod cpu;
pub mod exec;
mod instructions;
pub mod memory;
pub mod size;

pub use addressing::{EaClass, EffectiveAddress, Mode};
pub use condition::{Ccr, Condition, ConditionCodes};
pub use config::VmConfig;
pub use context::Context;
pub use cpu::{Fault, Registers};
pub use exec::{ExecUnit, Handler};
pub use memory::{AccessKind, AddressSpace, BusError, FunctionCode, MemoryMap, Ram, Rom};
pub use size::{ByteSize, LongWordSize, OperandSize, WordSize};
