use core::ptr::{read_volatile, write_volatile};

use crate::command::Space;

/// Data address of I/O register 0 on AVR parts.
pub const AVR_IO_OFFSET: usize = 0x20;

/// Byte-wide access to the registers of a platform.
///
/// Reads take `&mut self` because reading a status or FIFO register can
/// change it. Callers must not cache a read.
pub trait RegisterFile {
    fn read8(&mut self, space: Space, address: u8) -> u8;

    fn write8(&mut self, space: Space, address: u8, value: u8);
}

impl<T: RegisterFile + ?Sized> RegisterFile for &mut T {
    fn read8(&mut self, space: Space, address: u8) -> u8 {
        T::read8(self, space, address)
    }

    fn write8(&mut self, space: Space, address: u8, value: u8) {
        T::write8(self, space, address, value)
    }
}

/// Registers reached through volatile loads and stores at `base + address`.
///
/// No bounds checking is done. An address the platform does not decode has
/// whatever effect the hardware gives it. Single-byte volatile accesses are
/// indivisible, so the same registers can be touched from an interrupt
/// handler without tearing.
#[derive(Debug)]
pub struct MemoryMappedRegisters {
    io_base: usize,
    mem_base: usize,
}

impl MemoryMappedRegisters {
    /// # Safety
    /// Every address in `io_base..io_base + 256` and `mem_base..mem_base + 256`
    /// must be valid for volatile byte reads and writes for as long as the
    /// returned value is used.
    pub const unsafe fn new(io_base: usize, mem_base: usize) -> MemoryMappedRegisters {
        MemoryMappedRegisters { io_base, mem_base }
    }

    /// AVR data space layout: I/O register `n` sits at data address `n + 0x20`,
    /// extended registers are addressed directly.
    ///
    /// # Safety
    /// Must only be used on an AVR target, see [`MemoryMappedRegisters::new`].
    pub const unsafe fn avr() -> MemoryMappedRegisters {
        MemoryMappedRegisters {
            io_base: AVR_IO_OFFSET,
            mem_base: 0,
        }
    }

    fn pointer(&self, space: Space, address: u8) -> *mut u8 {
        let base = match space {
            Space::Io => self.io_base,
            Space::Memory => self.mem_base,
        };
        (base + address as usize) as *mut u8
    }
}

impl RegisterFile for MemoryMappedRegisters {
    fn read8(&mut self, space: Space, address: u8) -> u8 {
        // SAFETY: the constructor's contract covers every byte address
        unsafe { read_volatile(self.pointer(space, address)) }
    }

    fn write8(&mut self, space: Space, address: u8, value: u8) {
        // SAFETY: as above
        unsafe { write_volatile(self.pointer(space, address), value) }
    }
}

/// Plain storage standing in for hardware: two independent 256-byte banks.
#[derive(Debug, Clone)]
pub struct SimulatedRegisters {
    io: [u8; 256],
    memory: [u8; 256],
}

impl Default for SimulatedRegisters {
    fn default() -> Self {
        SimulatedRegisters {
            io: [0; 256],
            memory: [0; 256],
        }
    }
}

impl SimulatedRegisters {
    pub fn new() -> SimulatedRegisters {
        Self::default()
    }

    /// Inspect a register without going through the protocol.
    pub fn peek(&self, space: Space, address: u8) -> u8 {
        self.bank(space)[address as usize]
    }

    pub fn poke(&mut self, space: Space, address: u8, value: u8) {
        self.bank_mut(space)[address as usize] = value;
    }

    fn bank(&self, space: Space) -> &[u8; 256] {
        match space {
            Space::Io => &self.io,
            Space::Memory => &self.memory,
        }
    }

    fn bank_mut(&mut self, space: Space) -> &mut [u8; 256] {
        match space {
            Space::Io => &mut self.io,
            Space::Memory => &mut self.memory,
        }
    }
}

impl RegisterFile for SimulatedRegisters {
    fn read8(&mut self, space: Space, address: u8) -> u8 {
        self.peek(space, address)
    }

    fn write8(&mut self, space: Space, address: u8, value: u8) {
        self.poke(space, address, value)
    }
}
