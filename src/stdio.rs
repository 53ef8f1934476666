//! Serial halves over std streams, for running the proxy as a host process.

use std::io::{self, Read as _, Write as _};

use embedded_hal_nb::serial::{self, ErrorKind, ErrorType, Read, Write};
use register_proxy::ChannelError;

#[derive(Debug)]
pub enum StdioError {
    Eof,
    Io(io::Error),
}

impl serial::Error for StdioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl From<io::Error> for StdioError {
    fn from(value: io::Error) -> Self {
        StdioError::Io(value)
    }
}

#[derive(Debug)]
pub struct StreamRx<R>(pub R);

impl<R: io::Read> ErrorType for StreamRx<R> {
    type Error = StdioError;
}

impl<R: io::Read> Read for StreamRx<R> {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let mut b = [0; 1];
        match self.0.read(&mut b) {
            Ok(0) => Err(nb::Error::Other(StdioError::Eof)),
            Ok(_) => Ok(b[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(nb::Error::WouldBlock),
            Err(e) => Err(nb::Error::Other(e.into())),
        }
    }
}

#[derive(Debug)]
pub struct StreamTx<W>(pub W);

impl<W: io::Write> ErrorType for StreamTx<W> {
    type Error = StdioError;
}

impl<W: io::Write> Write for StreamTx<W> {
    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        // Flush every byte so a host pipelining commands sees it immediately
        self.0.write_all(&[word]).map_err(StdioError::from)?;
        self.0.flush().map_err(StdioError::from)?;
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.0.flush().map_err(StdioError::from)?;
        Ok(())
    }
}

/// Process exit code for the error that ended the dispatch loop.
pub fn exit_code(error: &ChannelError<StdioError, StdioError>) -> i32 {
    match error {
        ChannelError::Read(StdioError::Eof) | ChannelError::Closed => {
            log::info!("host closed the channel");
            0
        }
        ChannelError::Read(StdioError::Io(e)) => {
            log::warn!("reading stdin failed: {}", e);
            1
        }
        ChannelError::Write(StdioError::Io(e)) => {
            log::warn!("writing stdout failed: {}", e);
            1
        }
        ChannelError::Write(StdioError::Eof) => {
            log::warn!("stdout closed");
            1
        }
    }
}
