//! External collaborators of the protocol engine.
//!
//! The engine only ever needs "send bytes / receive a byte / wait a while /
//! drive the wake line", so those four capabilities are traits. Production
//! implementations sit on [`rppal`]; tests swap in the scripted doubles from
//! the `mock` module.

use crate::error::Error;
use rppal::gpio::{Gpio, OutputPin};
use rppal::uart::{Parity, Uart};
use std::time::Duration;

/// Byte-oriented duplex serial channel to the modem.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error>;
    /// Blocks until the next byte arrives.
    fn read_byte(&mut self) -> Result<u8, Error>;
    /// Non-destructive check for pending inbound bytes.
    fn has_input(&mut self) -> Result<bool, Error>;
}

/// Software delay primitive. All protocol timing is expressed through this,
/// which is what lets the retry/backoff state machines run against a
/// simulated clock in tests.
pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

/// The modem DTR sleep line. Held low the modem stays awake; released the
/// modem may enter its software sleep mode.
pub trait WakeLine {
    /// Drives the line active (DTR low).
    fn wake(&mut self);
    /// Releases the line (DTR high).
    fn release(&mut self);
}

/// UART transport over `rppal`.
pub struct UartTransport {
    uart: Uart,
}

impl UartTransport {
    pub fn new(path: &str, baud_rate: u32) -> Result<Self, Error> {
        let mut uart = Uart::with_path(path, baud_rate, Parity::None, 8, 1)?;
        uart.set_read_mode(0, Duration::from_millis(100))?;
        Ok(UartTransport { uart })
    }
}

impl Transport for UartTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut sent = 0;
        while sent < bytes.len() {
            sent += self.uart.write(&bytes[sent..])?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, Error> {
        let mut buffer: [u8; 1] = [0];
        loop {
            if self.uart.read(&mut buffer)? > 0 {
                return Ok(buffer[0]);
            }
        }
    }

    fn has_input(&mut self) -> Result<bool, Error> {
        Ok(self.uart.input_len()? > 0)
    }
}

/// Wall-clock delays for production use.
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// DTR wake line on a GPIO pin. Starts released (modem allowed to sleep).
pub struct DtrLine {
    pin: OutputPin,
}

impl DtrLine {
    pub fn new(bcm_pin: u8) -> Result<Self, Error> {
        let mut pin = Gpio::new()?.get(bcm_pin)?.into_output();
        pin.set_high();
        Ok(DtrLine { pin })
    }
}

impl WakeLine for DtrLine {
    fn wake(&mut self) {
        self.pin.set_low();
    }

    fn release(&mut self) {
        self.pin.set_high();
    }
}
