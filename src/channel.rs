use core::fmt::Debug;

use embedded_hal_nb::serial;
use embedded_io::{Read, ReadExactError, Write};

/// Blocking, ordered byte transport between host and device.
///
/// `recv_byte` does not return until a byte has arrived. There is no timeout:
/// a peer that stops sending leaves the caller waiting.
pub trait ByteChannel {
    type Error: Debug;

    fn recv_byte(&mut self) -> Result<u8, Self::Error>;

    /// Hands one byte to the link. It must not be held back waiting for more.
    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error>;
}

impl<T: ByteChannel + ?Sized> ByteChannel for &mut T {
    type Error = T::Error;

    fn recv_byte(&mut self) -> Result<u8, Self::Error> {
        T::recv_byte(self)
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        T::send_byte(self, byte)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError<WriteError, ReadError> {
    Write(WriteError),
    Read(ReadError),
    /// The reader reached the end of its input.
    Closed,
}

/// Channel over the two halves of a non-blocking serial peripheral.
///
/// `WouldBlock` is spun on until the peripheral is ready, which turns the
/// `nb` interface into the blocking one the protocol expects.
#[derive(Debug)]
pub struct SerialChannel<Tx: serial::Write, Rx: serial::Read> {
    tx: Tx,
    rx: Rx,
}

impl<Tx: serial::Write, Rx: serial::Read> SerialChannel<Tx, Rx> {
    pub fn new(tx: Tx, rx: Rx) -> SerialChannel<Tx, Rx> {
        SerialChannel { tx, rx }
    }

    pub fn split(self) -> (Tx, Rx) {
        (self.tx, self.rx)
    }
}

impl<Tx: serial::Write, Rx: serial::Read> ByteChannel for SerialChannel<Tx, Rx> {
    type Error = ChannelError<Tx::Error, Rx::Error>;

    fn recv_byte(&mut self) -> Result<u8, Self::Error> {
        nb::block!(self.rx.read()).map_err(ChannelError::Read)
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        nb::block!(self.tx.write(byte)).map_err(ChannelError::Write)
    }
}

/// Channel over blocking `embedded-io` streams, e.g. a USB CDC class or a
/// host-side serial port.
///
/// Every sent byte is flushed so buffered writers cannot batch a burst.
#[derive(Debug)]
pub struct IoChannel<R: Read, W: Write> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> IoChannel<R, W> {
    pub fn new(reader: R, writer: W) -> IoChannel<R, W> {
        IoChannel { reader, writer }
    }

    pub fn split(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: Read, W: Write> ByteChannel for IoChannel<R, W> {
    type Error = ChannelError<W::Error, R::Error>;

    fn recv_byte(&mut self) -> Result<u8, Self::Error> {
        let mut b = [0; 1];
        self.reader.read_exact(&mut b).map_err(|e| match e {
            ReadExactError::UnexpectedEof => ChannelError::Closed,
            ReadExactError::Other(e) => ChannelError::Read(e),
        })?;
        Ok(b[0])
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.writer.write_all(&[byte]).map_err(ChannelError::Write)?;
        self.writer.flush().map_err(ChannelError::Write)
    }
}


#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use embedded_hal_nb::serial::{ErrorKind, ErrorType};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct UartError;

    impl serial::Error for UartError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Overrun
        }
    }

    /// Receive half that reports `WouldBlock` before every byte.
    #[derive(Debug)]
    struct SlowRx {
        data: VecDeque<u8>,
        ready: bool,
        polls: usize,
    }

    impl ErrorType for SlowRx {
        type Error = UartError;
    }

    impl serial::Read for SlowRx {
        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            self.polls += 1;
            if !self.ready {
                self.ready = true;
                return Err(nb::Error::WouldBlock);
            }
            self.ready = false;
            self.data.pop_front().ok_or(nb::Error::Other(UartError))
        }
    }

    #[derive(Debug, Default)]
    struct TxBuffer {
        data: Vec<u8>,
        busy: bool,
    }

    impl ErrorType for TxBuffer {
        type Error = UartError;
    }

    impl serial::Write for TxBuffer {
        fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
            // Alternate between busy and accepting, like a one-byte holding register
            self.busy = !self.busy;
            if self.busy {
                return Err(nb::Error::WouldBlock);
            }
            self.data.push(word);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn serial_channel_waits_out_would_block() {
        let rx = SlowRx {
            data: VecDeque::from([0x21, 0x0B]),
            ready: false,
            polls: 0,
        };
        let mut ch = SerialChannel::new(TxBuffer::default(), rx);
        assert_eq!(Ok(0x21), ch.recv_byte());
        assert_eq!(Ok(0x0B), ch.recv_byte());
        ch.send_byte(0xAA).unwrap();
        ch.send_byte(0x55).unwrap();

        let (tx, rx) = ch.split();
        assert_eq!(4, rx.polls);
        assert_eq!(vec![0xAA, 0x55], tx.data);
    }

    #[test]
    fn serial_channel_reports_read_error() {
        let rx = SlowRx {
            data: VecDeque::new(),
            ready: true,
            polls: 0,
        };
        let mut ch = SerialChannel::new(TxBuffer::default(), rx);
        assert_eq!(Err(ChannelError::Read(UartError)), ch.recv_byte());
    }

    #[test]
    fn io_channel_reads_and_writes_bytes() {
        let input = [0x61u8, 0x10];
        let mut out = [0u8; 4];
        {
            let mut ch = IoChannel::new(&input[..], &mut out[..]);
            assert!(matches!(ch.recv_byte(), Ok(0x61)));
            assert!(matches!(ch.recv_byte(), Ok(0x10)));
            assert!(matches!(ch.recv_byte(), Err(ChannelError::Closed)));
            ch.send_byte(0x01).unwrap();
            ch.send_byte(0x02).unwrap();

            // Reader drained, writer advanced past the two sent bytes
            let (reader, writer) = ch.split();
            assert!(reader.is_empty());
            assert_eq!(2, writer.len());
        }
        assert_eq!([0x01, 0x02, 0, 0], out);
    }

    #[test]
    fn io_channel_reports_full_writer() {
        let input: [u8; 0] = [];
        let mut out = [0u8; 1];
        let mut ch = IoChannel::new(&input[..], &mut out[..]);
        ch.send_byte(0x01).unwrap();
        assert!(matches!(ch.send_byte(0x02), Err(ChannelError::Write(_))));
    }

    fn pull<C: ByteChannel>(mut ch: C) -> Result<u8, C::Error> {
        ch.recv_byte()
    }

    #[test]
    fn scripted_channel_runs_dry() {
        let mut ch = script::ScriptedChannel::new(&[1]);
        assert_eq!(Ok(1), pull(&mut ch));
        assert_eq!(Err(script::Exhausted), pull(&mut ch));
        ch.push(&[2]);
        assert_eq!(Ok(2), ch.recv_byte());
    }
}
