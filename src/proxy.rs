//! Device side of the protocol.
//!
//! The proxy has one state, waiting for a header byte. Each command is
//! decoded, its whole burst is carried out, and only then is the next header
//! byte read. Nothing survives from one command to the next.

use core::convert::Infallible;

use crate::{
    Decode,
    channel::ByteChannel,
    command::{Command, CommandHeader, Header, MAX_HEADER_LEN, Space},
    registers::RegisterFile,
};

#[derive(Debug)]
pub struct RegisterProxy<C, R> {
    channel: C,
    registers: R,
}

impl<C: ByteChannel, R: RegisterFile> RegisterProxy<C, R> {
    pub fn new(channel: C, registers: R) -> RegisterProxy<C, R> {
        RegisterProxy { channel, registers }
    }

    /// Serve commands until the channel fails. Never returns otherwise.
    pub fn run(&mut self) -> Result<Infallible, C::Error> {
        loop {
            self.serve()?;
        }
    }

    /// Decode one command and carry out its burst.
    pub fn serve(&mut self) -> Result<CommandHeader, C::Error> {
        let cmd = self.recv_header()?;
        log::debug!(
            "{:?} x{} @ {:#04x}",
            cmd.command,
            cmd.count.get(),
            cmd.address
        );
        self.execute(cmd)?;
        Ok(cmd)
    }

    /// Read exactly the bytes of one command header off the channel.
    pub fn recv_header(&mut self) -> Result<CommandHeader, C::Error> {
        loop {
            let mut buf = [0; MAX_HEADER_LEN];
            buf[0] = self.channel.recv_byte()?;
            let len = Header::from(buf[0]).encoded_len();
            for b in &mut buf[1..len] {
                *b = self.channel.recv_byte()?;
            }
            match CommandHeader::decode(&buf[0..len]) {
                Ok(cmd) => return Ok(cmd),
                // Unreachable with a full header in hand. Drop it and wait for
                // the next header byte without consuming anything else.
                Err(e) => log::warn!("dropping header {:02x?}: {:?}", &buf[0..len], e),
            }
        }
    }

    /// Perform `count` transfers against the command's single address.
    pub fn execute(&mut self, cmd: CommandHeader) -> Result<(), C::Error> {
        let space = cmd.command.space();
        let count = cmd.count.get();
        match cmd.command {
            Command::ReadIo8 | Command::ReadMem8 => self.read_burst(space, cmd.address, count),
            Command::WriteIo8 | Command::WriteMem8 => self.write_burst(space, cmd.address, count),
        }
    }

    fn read_burst(&mut self, space: Space, address: u8, count: u16) -> Result<(), C::Error> {
        for _ in 0..count {
            let value = self.registers.read8(space, address);
            log::trace!("{:?}[{:#04x}] -> {:#04x}", space, address, value);
            self.channel.send_byte(value)?;
        }
        Ok(())
    }

    fn write_burst(&mut self, space: Space, address: u8, count: u16) -> Result<(), C::Error> {
        for _ in 0..count {
            let value = self.channel.recv_byte()?;
            log::trace!("{:?}[{:#04x}] <- {:#04x}", space, address, value);
            self.registers.write8(space, address, value);
        }
        Ok(())
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn registers(&self) -> &R {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.registers
    }

    pub fn release(self) -> (C, R) {
        (self.channel, self.registers)
    }
}
