//! Pure decoding of the MAX6675's 16-bit output word.
//!
//! Layout, MSB to LSB (see page 5 of the
//! [MAX6675 datasheet](https://www.analog.com/media/en/technical-documentation/data-sheets/MAX6675.pdf)):
//!
//! | bit   | meaning                                   |
//! |-------|-------------------------------------------|
//! | 15    | dummy sign bit, always zero               |
//! | 14..3 | 12-bit temperature, 0.25 °C per step      |
//! | 2     | open thermocouple input                   |
//! | 1     | device ID, low for the MAX6675            |
//! | 0     | three-state                               |

use crate::error::Max6675Error;

/// Degrees Celsius per step of the 12-bit temperature field.
pub const RESOLUTION: f64 = 0.25;

/// The identity reported for a chip whose D1 bit reads low.
pub const CHIP_ID: u16 = 6675;

/// Numeric stand-in for a failed reading, for callers that only want a number.
///
/// Every legitimate reading is non-negative, so this can't be confused with one.
pub const ERROR_SENTINEL: f64 = -255.0;

const OPEN_CIRCUIT_BIT: u16 = 1 << 2;
const DEVICE_ID_BIT: u16 = 1 << 1;
const TEMPERATURE_SHIFT: u16 = 3;
const TEMPERATURE_MASK: u16 = 0x0FFF;

/// One unvalidated word, exactly as it was shifted out of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawSample(u16);

impl RawSample {
    /// Wraps a word read off the bus, MSB first.
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    /// The word exactly as it was read.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// The 12-bit temperature field, in steps of [`RESOLUTION`].
    pub const fn counts(self) -> u16 {
        (self.0 >> TEMPERATURE_SHIFT) & TEMPERATURE_MASK
    }

    /// `true` unless bit D2 reports an open thermocouple input.
    ///
    /// The open circuit detector only works when the chip's T- pin is grounded.
    pub const fn is_connected(self) -> bool {
        self.0 & OPEN_CIRCUIT_BIT == 0
    }

    /// [`CHIP_ID`] when bit D1 is low, `None` otherwise.
    pub const fn chip_id(self) -> Option<u16> {
        if self.0 & DEVICE_ID_BIT == 0 {
            Some(CHIP_ID)
        } else {
            None
        }
    }

    /// Validates the word and converts it into degrees Celsius, in `0.0..=1023.75`.
    pub fn celsius(self) -> Result<f64, Max6675Error> {
        if !self.is_connected() {
            return Err(Max6675Error::OpenCircuit);
        }
        if self.chip_id() != Some(CHIP_ID) {
            return Err(Max6675Error::UnknownChip);
        }

        Ok(f64::from(self.counts()) * RESOLUTION)
    }
}

impl From<u16> for RawSample {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

impl From<RawSample> for u16 {
    fn from(sample: RawSample) -> Self {
        sample.0
    }
}

/// See [`RawSample::is_connected`].
pub fn is_connected(sample: RawSample) -> bool {
    sample.is_connected()
}

/// See [`RawSample::chip_id`].
pub fn chip_id(sample: RawSample) -> Option<u16> {
    sample.chip_id()
}

/// See [`RawSample::celsius`].
pub fn celsius(sample: RawSample) -> Result<f64, Max6675Error> {
    sample.celsius()
}

/// Collapses a reading into a bare number, using [`ERROR_SENTINEL`] for any failure.
pub fn or_sentinel(reading: Result<f64, Max6675Error>) -> f64 {
    reading.unwrap_or(ERROR_SENTINEL)
}

/// Which sample a temperature query should decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sample {
    /// Run a fresh acquisition and decode its result.
    #[default]
    Fresh,
    /// Decode a word captured earlier, without touching the hardware.
    Captured(RawSample),
}

/// Ignore any captured sample and read the chip now.
pub const FORCE_READ: Sample = Sample::Fresh;

impl From<RawSample> for Sample {
    fn from(sample: RawSample) -> Self {
        Self::Captured(sample)
    }
}

/// The temperature unit to report in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl Unit {
    /// Converts degrees Celsius into this unit.
    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            Unit::Celsius => celsius,
            Unit::Fahrenheit => celsius * 1.8 + 32.0,
            Unit::Kelvin => celsius + 273.15,
        }
    }
}
