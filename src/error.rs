use embedded_hal::{digital, spi};
use thiserror::Error;

/// An error emitted due to problems with the MAX6675.
#[derive(Debug, Error)]
pub enum Max6675Error {
    #[error("Couldn't open or configure the SPI device. See std::io::Error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
    #[error("A GPIO line driving the MAX6675 failed: {0:?}")]
    Pin(digital::ErrorKind),
    #[error("The serial bus transfer from the MAX6675 failed: {0:?}")]
    Bus(spi::ErrorKind),
    #[error("The MAX6675 detected an open circuit (bit D2 was high). Please check the thermocouple connection and try again.")]
    OpenCircuit,
    #[error("The device didn't identify as a MAX6675 (bit D1 was high). Check the wiring and bus settings.")]
    UnknownChip,
    #[error("A serial clock of {0} Hz is outside the MAX6675's 1 Hz to 4.3 MHz range.")]
    InvalidClock(u32),
    #[error("A conversion time of {0} ms is shorter than the MAX6675's 220 ms conversion.")]
    InvalidConversionTime(u32),
}

impl Max6675Error {
    /// Whether this error came out of decoding a sample rather than out of the hardware plumbing.
    pub fn is_sensor_fault(&self) -> bool {
        matches!(self, Self::OpenCircuit | Self::UnknownChip)
    }
}

pub(crate) fn pin_error<E: digital::Error>(e: E) -> Max6675Error {
    Max6675Error::Pin(e.kind())
}

pub(crate) fn bus_error<E: spi::Error>(e: E) -> Max6675Error {
    Max6675Error::Bus(e.kind())
}
