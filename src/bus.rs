//! The hardware serial peripheral a [`Max6675`](crate::Max6675) can read through.
//!
//! A [`SerialBus`] is lent to one handle and claimed only between
//! [`SerialBus::begin`] and [`SerialBus::end`], so other devices on the same bus
//! are free to use it between acquisitions.

use embedded_hal::spi::{self, SpiBus, MODE_0};

/// How the MAX6675 wants the bus driven: clock idles low, MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSettings {
    pub clock_hz: u32,
    pub mode: spi::Mode,
    pub msb_first: bool,
}

impl BusSettings {
    /// Mode 0, MSB first, at `clock_hz`.
    pub const fn new(clock_hz: u32) -> Self {
        Self {
            clock_hz,
            mode: MODE_0,
            msb_first: true,
        }
    }
}

/// A block-transfer serial bus with an explicit ownership bracket.
pub trait SerialBus {
    type Error: spi::Error;

    /// Claims the bus and applies `settings` for the transfers that follow.
    fn begin(&mut self, settings: &BusSettings) -> Result<(), Self::Error>;

    /// Clocks `words.len()` bytes in, overwriting `words`. What's shifted out is don't-care.
    fn transfer(&mut self, words: &mut [u8]) -> Result<(), Self::Error>;

    /// Releases the bus.
    fn end(&mut self) -> Result<(), Self::Error>;
}

impl<B: SerialBus + ?Sized> SerialBus for &mut B {
    type Error = B::Error;

    fn begin(&mut self, settings: &BusSettings) -> Result<(), Self::Error> {
        B::begin(self, settings)
    }

    fn transfer(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        B::transfer(self, words)
    }

    fn end(&mut self) -> Result<(), Self::Error> {
        B::end(self)
    }
}

/// Adapts any `embedded-hal` [`SpiBus`].
///
/// The HAL fixes clock and mode when the bus is built, so [`SerialBus::begin`]
/// only claims it; build the bus with [`MODE_0`] and at most 4.3 MHz.
#[derive(Debug)]
pub struct HalBus<S> {
    spi: S,
}

impl<S: SpiBus<u8>> HalBus<S> {
    /// Wraps a bus that's already set up for mode 0.
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    /// Gives the wrapped bus back.
    pub fn release(self) -> S {
        self.spi
    }
}

impl<S: SpiBus<u8>> SerialBus for HalBus<S> {
    type Error = S::Error;

    fn begin(&mut self, _settings: &BusSettings) -> Result<(), Self::Error> {
        Ok(())
    }

    fn transfer(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.transfer_in_place(words)
    }

    fn end(&mut self) -> Result<(), Self::Error> {
        self.spi.flush()
    }
}

/// Stands in for the lines or bus a handle's wiring doesn't use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unused;

impl embedded_hal::digital::ErrorType for Unused {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for Unused {
    fn set_low(&mut self) -> Result<(), core::convert::Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), core::convert::Infallible> {
        Ok(())
    }
}

impl embedded_hal::digital::InputPin for Unused {
    fn is_high(&mut self) -> Result<bool, core::convert::Infallible> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, core::convert::Infallible> {
        Ok(true)
    }
}

impl SerialBus for Unused {
    type Error = core::convert::Infallible;

    fn begin(&mut self, _settings: &BusSettings) -> Result<(), core::convert::Infallible> {
        Ok(())
    }

    fn transfer(&mut self, _words: &mut [u8]) -> Result<(), core::convert::Infallible> {
        Ok(())
    }

    fn end(&mut self) -> Result<(), core::convert::Infallible> {
        Ok(())
    }
}

#[cfg(feature = "spidev")]
pub use linux::{SpidevBus, SpidevTransferError};

#[cfg(feature = "spidev")]
mod linux {
    use std::io::Read;

    use embedded_hal::spi;
    use spidev::{SpiModeFlags, Spidev, SpidevOptions};
    use thiserror::Error;
    use tracing::{debug, warn};

    use super::{BusSettings, SerialBus};
    use crate::error::Max6675Error;

    /// A spidev transfer failed.
    #[derive(Debug, Error)]
    #[error("spidev transfer failed: {0}")]
    pub struct SpidevTransferError(#[from] pub std::io::Error);

    impl spi::Error for SpidevTransferError {
        fn kind(&self) -> spi::ErrorKind {
            spi::ErrorKind::Other
        }
    }

    /// The Linux kernel's SPI API.
    ///
    /// On Linux, you can use `ls /dev -1 | grep spidev` to find the device path.
    ///
    /// The device is driven with `SPI_NO_CS`, so the MAX6675's chip select has
    /// to be a GPIO line handed to [`Max6675::hardware`](crate::Max6675::hardware),
    /// not the controller's CE pin.
    #[derive(Debug)]
    pub struct SpidevBus {
        spi: Spidev,
        applied: Option<BusSettings>,
    }

    impl SpidevBus {
        /// Tries to open the SPI device at the given path, like `/dev/spidev0.0`.
        /// Only fails if there's something wrong with the SPI connection.
        pub fn open(spi_path: impl AsRef<str>) -> Result<Self, Max6675Error> {
            let spi = Spidev::open(spi_path.as_ref())?;
            Ok(Self::new(spi))
        }

        /// Wraps an already opened device. It's configured on first use.
        pub fn new(spi: Spidev) -> Self {
            Self { spi, applied: None }
        }

        /// Gives the device back.
        pub fn release(self) -> Spidev {
            self.spi
        }

        fn configure(&mut self, settings: &BusSettings) -> std::io::Result<()> {
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(settings.clock_hz)
                .lsb_first(!settings.msb_first)
                .mode(mode_flags(settings))
                .build();
            self.spi.configure(&options)?;
            debug!(clock_hz = settings.clock_hz, "configured spidev");
            Ok(())
        }
    }

    /// The kernel must leave its own CE line alone: the handle's chip select
    /// frames the whole conversion, not just the transfer.
    pub(super) fn mode_flags(settings: &BusSettings) -> SpiModeFlags {
        let mode = match (settings.mode.polarity, settings.mode.phase) {
            (spi::Polarity::IdleLow, spi::Phase::CaptureOnFirstTransition) => {
                SpiModeFlags::SPI_MODE_0
            }
            (spi::Polarity::IdleLow, spi::Phase::CaptureOnSecondTransition) => {
                SpiModeFlags::SPI_MODE_1
            }
            (spi::Polarity::IdleHigh, spi::Phase::CaptureOnFirstTransition) => {
                SpiModeFlags::SPI_MODE_2
            }
            (spi::Polarity::IdleHigh, spi::Phase::CaptureOnSecondTransition) => {
                SpiModeFlags::SPI_MODE_3
            }
        };
        mode | SpiModeFlags::SPI_NO_CS
    }

    impl SerialBus for SpidevBus {
        type Error = SpidevTransferError;

        fn begin(&mut self, settings: &BusSettings) -> Result<(), Self::Error> {
            // ioctls are only needed when the settings change
            if self.applied.as_ref() != Some(settings) {
                self.configure(settings).map_err(|e| {
                    warn!("couldn't configure spidev: {e}");
                    SpidevTransferError(e)
                })?;
                self.applied = Some(*settings);
            }
            Ok(())
        }

        fn transfer(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            self.spi.read_exact(words).map_err(|e| {
                warn!("spidev read failed: {e}");
                SpidevTransferError(e)
            })
        }

        fn end(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }
}
