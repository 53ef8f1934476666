#![cfg_attr(not(test), no_std)]

//! Remote register file over a byte-oriented serial link.
//!
//! A device running [`RegisterProxy`] lets a host peek and poke 8-bit
//! registers in the I/O and memory address spaces with a compact binary
//! command. The host side of the same wire format lives in [`ProxyClient`].
//!
//! ```text
//!  7   6   5   4               0
//! ┌───────┬───┬─────────────────┐ ┌────────────┐ ┌─────────┐ ┌─────────────┐
//! │  cmd  │ S │   count bits    │ │ count low  │ │ address │ │ payload ... │
//! └───────┴───┴─────────────────┘ └────────────┘ └─────────┘ └─────────────┘
//!                                  only if S = 0
//! ```

pub mod atmega32u4;
pub mod channel;
pub mod client;
pub mod command;
pub mod proxy;
pub mod registers;

pub trait Encode {
    type Error;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a>
where
    Self: Sized,
{
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub use channel::{ByteChannel, ChannelError, IoChannel, SerialChannel};
pub use client::{ProxyClient, Register};
pub use command::{
    Command, CommandHeader, EncodeError, Header, HeaderError, Space, TransferCount,
};
pub use proxy::RegisterProxy;
pub use registers::{MemoryMappedRegisters, RegisterFile, SimulatedRegisters};
