use serde::{Deserialize, Serialize};

use crate::memory::{MemoryMap, Ram};

/// Memory layout of a virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Main RAM in bytes, mapped at address 0.
    pub memory_size: u32,
    /// Width of the external address bus.
    pub address_bits: u32,
    /// Bytes at the bottom of RAM that user function codes may not write.
    pub supervisor_area: u32,
    /// Initial stack pointer; the top of RAM when unset.
    pub stack_top: Option<u32>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            memory_size: 4 * 1024 * 1024,
            address_bits: 24,
            supervisor_area: 0,
            stack_top: None,
        }
    }
}

impl VmConfig {
    pub fn stack_top(&self) -> u32 {
        self.stack_top.unwrap_or(self.memory_size)
    }

    pub fn memory_map(&self) -> MemoryMap {
        let mut map = MemoryMap::new(self.address_bits);
        let mut ram = Ram::new(self.memory_size as usize);
        ram.supervisor_area = self.supervisor_area;
        map.map(0, self.memory_size, ram);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{AddressSpace, FunctionCode};
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: VmConfig = serde_json::from_str(r#"{ "memory_size": 65536 }"#).unwrap();
        assert_eq!(cfg.memory_size, 0x10000);
        assert_eq!(cfg.address_bits, 24);
        assert_eq!(cfg.stack_top(), 0x10000);
    }

    #[test]
    fn memory_map_protects_supervisor_area() {
        let cfg = VmConfig {
            memory_size: 0x4000,
            supervisor_area: 0x400,
            ..VmConfig::default()
        };
        let mut map = cfg.memory_map();
        assert!(map.put_word(FunctionCode::UserData, 0x100, 1).is_err());
        map.put_word(FunctionCode::SupervisorData, 0x100, 1).unwrap();
        map.put_word(FunctionCode::UserData, 0x400, 2).unwrap();
        assert!(map.get_word(FunctionCode::UserData, 0x4000).is_err());
    }
}
