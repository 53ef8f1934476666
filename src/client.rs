//! Host side of the protocol.

use crate::{
    channel::ByteChannel,
    command::{COUNT_MAX, Command, CommandHeader, Space, TransferCount},
};

/// A named location in one of the two address spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub space: Space,
    pub address: u8,
}

impl Register {
    pub const fn io(address: u8) -> Register {
        Register {
            space: Space::Io,
            address,
        }
    }

    pub const fn memory(address: u8) -> Register {
        Register {
            space: Space::Memory,
            address,
        }
    }
}

/// Drives a remote [`RegisterProxy`](crate::RegisterProxy) over a channel.
///
/// Transfers longer than one command can carry are sent as back-to-back
/// bursts to the same register, which the device cannot tell apart from a
/// single burst.
#[derive(Debug)]
pub struct ProxyClient<C> {
    channel: C,
}

impl<C: ByteChannel> ProxyClient<C> {
    pub fn new(channel: C) -> ProxyClient<C> {
        ProxyClient { channel }
    }

    pub fn release(self) -> C {
        self.channel
    }

    /// Fill `buf` with successive samples of `register`.
    pub fn read(&mut self, register: Register, buf: &mut [u8]) -> Result<(), C::Error> {
        for chunk in buf.chunks_mut(COUNT_MAX as usize) {
            self.send_header(Command::read(register.space), chunk.len(), register.address)?;
            for b in chunk.iter_mut() {
                *b = self.channel.recv_byte()?;
            }
        }
        Ok(())
    }

    /// Write every byte of `data` to `register`, in order.
    pub fn write(&mut self, register: Register, data: &[u8]) -> Result<(), C::Error> {
        for chunk in data.chunks(COUNT_MAX as usize) {
            self.send_header(Command::write(register.space), chunk.len(), register.address)?;
            for b in chunk {
                self.channel.send_byte(*b)?;
            }
        }
        Ok(())
    }

    pub fn read_byte(&mut self, register: Register) -> Result<u8, C::Error> {
        let mut b = [0; 1];
        self.read(register, &mut b)?;
        Ok(b[0])
    }

    pub fn write_byte(&mut self, register: Register, value: u8) -> Result<(), C::Error> {
        self.write(register, &[value])
    }

    /// Read, transform, write back. Returns the value written.
    pub fn modify<F>(&mut self, register: Register, f: F) -> Result<u8, C::Error>
    where
        F: FnOnce(u8) -> u8,
    {
        let value = f(self.read_byte(register)?);
        self.write_byte(register, value)?;
        Ok(value)
    }

    pub fn set_bits(&mut self, register: Register, mask: u8) -> Result<u8, C::Error> {
        self.modify(register, |v| v | mask)
    }

    pub fn clear_bits(&mut self, register: Register, mask: u8) -> Result<u8, C::Error> {
        self.modify(register, |v| v & !mask)
    }

    /// Poll `register` until one of the bits in `mask` is set.
    ///
    /// Polls forever if none ever is.
    pub fn wait_for(&mut self, register: Register, mask: u8) -> Result<u8, C::Error> {
        loop {
            let value = self.read_byte(register)?;
            if value & mask != 0 {
                return Ok(value);
            }
        }
    }

    fn send_header(&mut self, command: Command, count: usize, address: u8) -> Result<(), C::Error> {
        let header = CommandHeader::new(command, TransferCount::clamped(count), address);
        log::trace!("sending {:?}", header);
        for b in header.bytes().iter() {
            self.channel.send_byte(*b)?;
        }
        Ok(())
    }
}
