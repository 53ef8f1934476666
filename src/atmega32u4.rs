//! Registers of the ATmega32U4 used to drive its USB controller remotely.
//!
//! I/O registers are given by I/O address (data address minus 0x20), the rest
//! by data address, matching how the proxy addresses each space. Bit constants
//! are bit positions, as in the datasheet.

use crate::{
    channel::ByteChannel,
    client::{ProxyClient, Register},
};

pub const PORTD: Register = Register::io(0x0B);
pub const PLLCSR: Register = Register::io(0x29);

pub const UHWCON: Register = Register::memory(0xD7);
pub const USBCON: Register = Register::memory(0xD8);
pub const UDCON: Register = Register::memory(0xE0);
pub const UDINT: Register = Register::memory(0xE1);
pub const UDADDR: Register = Register::memory(0xE3);
pub const UEINTX: Register = Register::memory(0xE8);
pub const UENUM: Register = Register::memory(0xE9);
pub const UERST: Register = Register::memory(0xEA);
pub const UECONX: Register = Register::memory(0xEB);
pub const UECFG0X: Register = Register::memory(0xEC);
pub const UECFG1X: Register = Register::memory(0xED);
/// Endpoint FIFO. Successive reads return successive bytes.
pub const UEDATX: Register = Register::memory(0xF1);

/// PORTD pin driving the on-board LED.
pub const LED: u8 = 6;

// PLLCSR
pub const PLLP2: u8 = 4;
pub const PLLP1: u8 = 3;
pub const PLLP0: u8 = 2;
pub const PLLE: u8 = 1;
pub const PLOCK: u8 = 0;

// UDCON
pub const LSM: u8 = 2;
pub const RMWKUP: u8 = 1;
pub const DETACH: u8 = 0;

// UDINT
pub const UPRSMI: u8 = 6;
pub const EORSMI: u8 = 5;
pub const WAKEUPI: u8 = 4;
pub const EORSTI: u8 = 3;
pub const SOFI: u8 = 2;
pub const SUSPI: u8 = 0;

// UDADDR
pub const ADDEN: u8 = 7;

// UECFG0X
pub const EPTYPE1: u8 = 7;
pub const EPTYPE0: u8 = 6;
pub const EPDIR: u8 = 0;

// UECFG1X
pub const EPSIZE2: u8 = 6;
pub const EPSIZE1: u8 = 5;
pub const EPSIZE0: u8 = 4;
pub const EPBK1: u8 = 3;
pub const EPBK0: u8 = 2;
pub const ALLOC: u8 = 1;

// UECONX
pub const STALLRQ: u8 = 5;
pub const STALLRQC: u8 = 4;
pub const RSTDT: u8 = 3;
pub const EPEN: u8 = 0;

// UEINTX
pub const FIFOCON: u8 = 7;
pub const NAKINI: u8 = 6;
pub const RWAL: u8 = 5;
pub const NAKOUTI: u8 = 4;
pub const RXSTPI: u8 = 3;
pub const RXOUTI: u8 = 2;
pub const STALLEDI: u8 = 1;
pub const TXINI: u8 = 0;

// UHWCON
pub const UIMOD: u8 = 7;
pub const UIDE: u8 = 6;
pub const UVCONE: u8 = 4;
pub const UVREGE: u8 = 0;

// USBCON
pub const USBE: u8 = 7;
pub const HOST: u8 = 6;
pub const FRZCLK: u8 = 5;
pub const OTGPADE: u8 = 4;
pub const IDTE: u8 = 1;
pub const VBUSTE: u8 = 0;

/// EPTYPE1:0 field of UECFG0X, already shifted into place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointType {
    Control = 0b0000_0000,
    Isochronous = 0b0100_0000,
    Bulk = 0b1000_0000,
    Interrupt = 0b1100_0000,
}

/// EPSIZE2:0 field of UECFG1X, already shifted into place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSize {
    Bytes8 = 0b0000_0000,
    Bytes16 = 0b0001_0000,
    Bytes32 = 0b0010_0000,
    Bytes64 = 0b0011_0000,
    Bytes128 = 0b0100_0000,
    Bytes256 = 0b0101_0000,
}

impl EndpointSize {
    pub fn from_bytes(bytes: u16) -> Option<EndpointSize> {
        match bytes {
            8 => Some(EndpointSize::Bytes8),
            16 => Some(EndpointSize::Bytes16),
            32 => Some(EndpointSize::Bytes32),
            64 => Some(EndpointSize::Bytes64),
            128 => Some(EndpointSize::Bytes128),
            256 => Some(EndpointSize::Bytes256),
            _ => None,
        }
    }
}

/// USB device controller of a remote ATmega32U4, driven register by register.
#[derive(Debug)]
pub struct UsbController<C> {
    client: ProxyClient<C>,
}

impl<C: ByteChannel> UsbController<C> {
    pub fn new(client: ProxyClient<C>) -> UsbController<C> {
        UsbController { client }
    }

    pub fn client(&mut self) -> &mut ProxyClient<C> {
        &mut self.client
    }

    pub fn release(self) -> ProxyClient<C> {
        self.client
    }

    /// Power up the pad regulator and PLL, leaving the USB clock frozen.
    /// Returns once the PLL reports lock.
    pub fn init(&mut self) -> Result<(), C::Error> {
        // Device mode, pad regulator on
        self.client.write_byte(UHWCON, (1 << UIMOD) | (1 << UVREGE))?;
        self.client.write_byte(USBCON, (1 << USBE) | (1 << FRZCLK))?;
        // 16 MHz crystal: PLL input prescaler /2
        self.client
            .write_byte(PLLCSR, (1 << PLLP2) | (1 << PLLP0) | (1 << PLLE))?;
        self.client.wait_for(PLLCSR, 1 << PLOCK)?;
        log::debug!("PLL locked");
        Ok(())
    }

    /// Enable the controller and VBUS pad, unfreezing the clock.
    pub fn enable(&mut self) -> Result<(), C::Error> {
        self.client.write_byte(USBCON, (1 << USBE) | (1 << OTGPADE))
    }

    pub fn disable(&mut self) -> Result<(), C::Error> {
        self.client.write_byte(USBCON, 0x00)
    }

    pub fn attach(&mut self) -> Result<(), C::Error> {
        self.client.write_byte(UDCON, 0x00)
    }

    pub fn detach(&mut self) -> Result<(), C::Error> {
        self.client.write_byte(UDCON, 1 << DETACH)?;
        self.led_off()
    }

    /// Select, enable and configure endpoint `number` with a single bank.
    pub fn setup_endpoint(
        &mut self,
        number: u8,
        kind: EndpointType,
        size: EndpointSize,
    ) -> Result<(), C::Error> {
        self.client.write_byte(UENUM, number)?;
        self.client.write_byte(UECONX, 1 << EPEN)?;
        self.client.write_byte(UECFG0X, kind as u8)?;
        self.client.write_byte(UECFG1X, size as u8 | (1 << ALLOC))
    }

    /// Drain `buf.len()` bytes from the selected endpoint's FIFO.
    pub fn read_packet(&mut self, buf: &mut [u8]) -> Result<(), C::Error> {
        self.client.read(UEDATX, buf)
    }

    /// Poll an interrupt register until a flag in `mask` is raised.
    pub fn wait_for_interrupt(&mut self, register: Register, mask: u8) -> Result<u8, C::Error> {
        self.client.wait_for(register, mask)
    }

    pub fn led_on(&mut self) -> Result<(), C::Error> {
        self.client.set_bits(PORTD, 1 << LED).map(|_| ())
    }

    pub fn led_off(&mut self) -> Result<(), C::Error> {
        self.client.clear_bits(PORTD, 1 << LED).map(|_| ())
    }
}
