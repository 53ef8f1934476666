use bilge::prelude::*;

use crate::{Decode, Encode};

/// Largest count that fits in the header byte alone.
pub const SMALL_COUNT_MAX: u16 = 0x1F;
/// Largest count the extended (13-bit) form can carry.
pub const COUNT_MAX: u16 = 0x1FFF;
/// Header byte, count extension byte, address byte.
pub const MAX_HEADER_LEN: usize = 3;

/// The two address spaces a register can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    Io,
    Memory,
}

/// Command selector in the top two bits of the header byte.
///
/// All four encodings are assigned, so decoding a selector can never fail.
#[bitsize(2)]
#[derive(FromBits, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ReadIo8 = 0b00,
    ReadMem8 = 0b01,
    WriteIo8 = 0b10,
    WriteMem8 = 0b11,
}

impl Command {
    pub fn read(space: Space) -> Command {
        match space {
            Space::Io => Command::ReadIo8,
            Space::Memory => Command::ReadMem8,
        }
    }

    pub fn write(space: Space) -> Command {
        match space {
            Space::Io => Command::WriteIo8,
            Space::Memory => Command::WriteMem8,
        }
    }

    pub fn space(&self) -> Space {
        match self {
            Command::ReadIo8 | Command::WriteIo8 => Space::Io,
            Command::ReadMem8 | Command::WriteMem8 => Space::Memory,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Command::WriteIo8 | Command::WriteMem8)
    }
}

/// The first byte of every command.
///
/// With `small_count` set the count bits are the whole count (0-31). With it
/// clear they are the high five bits of a 13-bit count whose low byte follows.
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq)]
pub struct Header {
    pub count_bits: u5,
    pub small_count: bool,
    pub command: Command,
}

impl Header {
    /// Bytes taken by the full command header this byte starts, address included.
    pub fn encoded_len(&self) -> usize {
        if self.small_count() { 2 } else { 3 }
    }
}

/// Number of byte transfers in one burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TransferCount(u16);

impl TransferCount {
    pub const ZERO: TransferCount = TransferCount(0);
    pub const MAX: TransferCount = TransferCount(COUNT_MAX);

    pub const fn new(count: u16) -> Option<TransferCount> {
        if count <= COUNT_MAX {
            Some(TransferCount(count))
        } else {
            None
        }
    }

    /// Saturates at [`COUNT_MAX`].
    pub fn clamped(count: usize) -> TransferCount {
        TransferCount(count.min(COUNT_MAX as usize) as u16)
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    /// Whether the count fits the header-only encoding.
    pub const fn is_small(self) -> bool {
        self.0 <= SMALL_COUNT_MAX
    }
}

impl From<TransferCount> for usize {
    fn from(value: TransferCount) -> Self {
        value.0 as usize
    }
}

/// A fully resolved command: what to do, how many times, and where.
///
/// The address is one byte on the wire and stays one byte here. Every
/// transfer in the burst targets this same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub command: Command,
    pub count: TransferCount,
    pub address: u8,
}

impl CommandHeader {
    pub fn new(command: Command, count: TransferCount, address: u8) -> CommandHeader {
        CommandHeader {
            command,
            count,
            address,
        }
    }

    pub fn encoded_len(&self) -> usize {
        self.header().encoded_len()
    }

    /// Header byte for this command, choosing the small form whenever it fits.
    pub fn header(&self) -> Header {
        let count = self.count.get();
        if self.count.is_small() {
            Header::new(u5::new(count as u8), true, self.command)
        } else {
            Header::new(u5::new((count >> 8) as u8), false, self.command)
        }
    }

    /// Encoded header as an owned, fixed-capacity buffer.
    pub fn bytes(&self) -> heapless::Vec<u8, MAX_HEADER_LEN> {
        let header = self.header();
        let (buf, len) = if header.small_count() {
            ([u8::from(header), self.address, 0], 2)
        } else {
            ([u8::from(header), self.count.get() as u8, self.address], 3)
        };
        let mut v = heapless::Vec::from_array(buf);
        v.truncate(len);
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    Empty,
    Incomplete { expected: usize, found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    BufferTooSmall { expected: usize, found: usize },
}

impl Encode for CommandHeader {
    type Error = EncodeError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let bytes = self.bytes();
        let len = bytes.len();
        if buffer.len() < len {
            return Err(EncodeError::BufferTooSmall {
                expected: len,
                found: buffer.len(),
            });
        }
        buffer[0..len].copy_from_slice(&bytes);
        Ok(len)
    }
}

impl<'a> Decode<'a> for CommandHeader {
    type Error = HeaderError;

    /// Decodes the header at the front of `data`, ignoring anything after it.
    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let first = *data.first().ok_or(HeaderError::Empty)?;
        let header = Header::from(first);
        let expected = header.encoded_len();
        if data.len() < expected {
            return Err(HeaderError::Incomplete {
                expected,
                found: data.len(),
            });
        }

        let high = u16::from(header.count_bits().value());
        let count = if header.small_count() {
            high
        } else {
            (high << 8) | u16::from(data[1])
        };

        Ok(CommandHeader {
            command: header.command(),
            count: TransferCount(count),
            address: data[expected - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn selector_mapping() {
        assert_eq!(Command::ReadIo8, Header::from(0x00).command());
        assert_eq!(Command::ReadMem8, Header::from(0x40).command());
        assert_eq!(Command::WriteIo8, Header::from(0x80).command());
        assert_eq!(Command::WriteMem8, Header::from(0xC0).command());
        // Lower bits do not leak into the selector
        assert_eq!(Command::ReadIo8, Header::from(0x3F).command());
        assert_eq!(Command::WriteMem8, Header::from(0xFF).command());
    }

    #[test]
    fn header_bit_layout() {
        for h in 0..=u8::MAX {
            let header = Header::from(h);
            assert_eq!(h & 0x20 != 0, header.small_count());
            assert_eq!(h >> 6, u2::from(header.command()).value());
            assert_eq!(h & 0x1F, header.count_bits().value());
            assert_eq!(h, u8::from(header));
        }
    }

    #[test]
    fn command_space_and_direction() {
        assert_eq!(Space::Io, Command::ReadIo8.space());
        assert_eq!(Space::Io, Command::WriteIo8.space());
        assert_eq!(Space::Memory, Command::ReadMem8.space());
        assert_eq!(Space::Memory, Command::WriteMem8.space());
        assert!(!Command::ReadIo8.is_write());
        assert!(Command::WriteMem8.is_write());
        assert_eq!(Command::WriteIo8, Command::write(Space::Io));
        assert_eq!(Command::ReadMem8, Command::read(Space::Memory));
    }

    #[test]
    fn small_count_zero() {
        let cmd = CommandHeader::decode(&[0x20, 0x07]).unwrap();
        assert_eq!(TransferCount::ZERO, cmd.count);
        assert_eq!(Command::ReadIo8, cmd.command);
        assert_eq!(0x07, cmd.address);
    }

    #[test]
    fn extended_count_boundary() {
        let cmd = CommandHeader::decode(&[0x00, 0x20, 0x07]).unwrap();
        assert_eq!(32, cmd.count.get());
        assert_eq!(0x07, cmd.address);
        assert_eq!(3, cmd.encoded_len());
    }

    #[test]
    fn write_io_small_scenario() {
        let cmd = CommandHeader::decode(&[0xA5, 0x10, 0xFF]).unwrap();
        assert_eq!(Command::WriteIo8, cmd.command);
        assert_eq!(5, cmd.count.get());
        assert_eq!(16, cmd.address);
    }

    #[test]
    fn largest_extended_count() {
        let cmd = CommandHeader::decode(&[0xDF, 0xFF, 0x42]).unwrap();
        assert_eq!(Command::WriteMem8, cmd.command);
        assert_eq!(TransferCount::MAX, cmd.count);
        assert_eq!(0x42, cmd.address);
    }

    #[test]
    fn decode_short_input() {
        assert_eq!(Err(HeaderError::Empty), CommandHeader::decode(&[]));
        assert_eq!(
            Err(HeaderError::Incomplete {
                expected: 2,
                found: 1
            }),
            CommandHeader::decode(&[0x21])
        );
        assert_eq!(
            Err(HeaderError::Incomplete {
                expected: 3,
                found: 2
            }),
            CommandHeader::decode(&[0x01, 0x00])
        );
    }

    #[test]
    fn encode_picks_small_form() {
        let cmd = CommandHeader::new(Command::ReadMem8, TransferCount::new(31).unwrap(), 0xE8);
        assert_eq!(&[0x7F, 0xE8], cmd.bytes().as_slice());
    }

    #[test]
    fn encode_picks_extended_form() {
        let cmd = CommandHeader::new(Command::WriteIo8, TransferCount::new(300).unwrap(), 0x0B);
        assert_eq!(&[0x81, 0x2C, 0x0B], cmd.bytes().as_slice());
    }

    #[test]
    fn encode_buffer_too_small() {
        let cmd = CommandHeader::new(Command::WriteIo8, TransferCount::new(300).unwrap(), 0x0B);
        let mut buf = [0; 2];
        assert_eq!(
            Err(EncodeError::BufferTooSmall {
                expected: 3,
                found: 2
            }),
            cmd.encode(&mut buf)
        );
        let mut buf = [0; 8];
        assert_eq!(Ok(3), cmd.encode(&mut buf));
        assert_eq!(&[0x81, 0x2C, 0x0B], &buf[0..3]);
    }

    #[test]
    fn transfer_count_limits() {
        assert_eq!(None, TransferCount::new(8192));
        assert_eq!(Some(8191), TransferCount::new(8191).map(TransferCount::get));
        assert_eq!(TransferCount::MAX, TransferCount::clamped(100_000));
        assert!(TransferCount::new(31).unwrap().is_small());
        assert!(!TransferCount::new(32).unwrap().is_small());
        assert_eq!(300usize, usize::from(TransferCount::new(300).unwrap()));
    }

    proptest! {
        #[test]
        fn small_headers_take_count_from_header(h in any::<u8>(), addr in any::<u8>(), trailing in any::<u8>()) {
            let h = h | 0x20;
            let cmd = CommandHeader::decode(&[h, addr, trailing]).unwrap();
            prop_assert_eq!(u16::from(h & 0x1F), cmd.count.get());
            prop_assert_eq!(addr, cmd.address);
            prop_assert_eq!(2, cmd.encoded_len());
        }

        #[test]
        fn extended_headers_take_low_byte(h in any::<u8>(), lo in any::<u8>(), addr in any::<u8>()) {
            let h = h & !0x20;
            let cmd = CommandHeader::decode(&[h, lo, addr]).unwrap();
            prop_assert_eq!((u16::from(h & 0x1F) << 8) | u16::from(lo), cmd.count.get());
            prop_assert_eq!(addr, cmd.address);
        }

        #[test]
        fn encoding_is_canonical(count in 0..=COUNT_MAX, addr in any::<u8>(), sel in 0u8..4) {
            let command = Header::from(sel << 6).command();
            let cmd = CommandHeader::new(command, TransferCount::new(count).unwrap(), addr);
            let bytes = cmd.bytes();
            prop_assert_eq!(if count <= SMALL_COUNT_MAX { 2 } else { 3 }, bytes.len());
            prop_assert_eq!(Ok(cmd), CommandHeader::decode(&bytes));
        }
    }
}
