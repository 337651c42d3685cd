use crate::error::Max6675Error;

/// Milliseconds the MAX6675 needs to finish a conversion at its default sample rate (~4-5 Hz).
pub const CONVERSION_TIME_MS: u32 = 220;

/// Rated maximum of the MAX6675's serial clock.
pub const MAX_CLOCK_HZ: u32 = 4_300_000;

/// Clock used for hardware transfers unless configured otherwise.
pub const DEFAULT_CLOCK_HZ: u32 = 4_000_000;

/// Width of the chip-select pulse that stops a running conversion.
pub const STOP_PULSE_US: u32 = 1;

/// Construction-time settings for a [`Max6675`](crate::Max6675).
///
/// ```
/// use max6675::Config;
///
/// let config = Config::new()
///     .clock_hz(1_000_000)
///     .mask_interrupts(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.conversion_time_ms(), 220);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    conversion_time_ms: u32,
    stop_pulse_us: u32,
    clock_hz: u32,
    mask_interrupts: bool,
}

impl Config {
    /// The datasheet defaults: 220 ms conversions, a 1 µs stop pulse, a 4 MHz clock
    /// and interrupts left alone.
    pub const fn new() -> Self {
        Self {
            conversion_time_ms: CONVERSION_TIME_MS,
            stop_pulse_us: STOP_PULSE_US,
            clock_hz: DEFAULT_CLOCK_HZ,
            mask_interrupts: false,
        }
    }

    /// How long to wait between starting a conversion and reading it out.
    ///
    /// Anything shorter than [`CONVERSION_TIME_MS`] reads a conversion that
    /// hasn't finished, so [`Config::build`] refuses it.
    pub fn conversion_time(&mut self, ms: u32) -> &mut Self {
        self.conversion_time_ms = ms;
        self
    }

    /// How long chip select is held low to stop a running conversion.
    pub fn stop_pulse(&mut self, us: u32) -> &mut Self {
        self.stop_pulse_us = us;
        self
    }

    /// Serial clock for hardware transfers. Ignored when bit-banging.
    ///
    /// Only [`SpidevBus`](crate::bus::SpidevBus) applies it. A
    /// [`HalBus`](crate::bus::HalBus) runs at whatever clock its `SpiBus` was
    /// built with, so keep that at or below [`MAX_CLOCK_HZ`] yourself.
    pub fn clock_hz(&mut self, hz: u32) -> &mut Self {
        self.clock_hz = hz;
        self
    }

    /// Hold a critical section while bit-banging the 16 clock pulses.
    ///
    /// Keeps interrupts from stretching a clock pulse mid-read at the cost of
    /// interrupt latency. Ignored in hardware mode.
    pub fn mask_interrupts(&mut self, mask: bool) -> &mut Self {
        self.mask_interrupts = mask;
        self
    }

    /// Checks the settings and hands back a copy.
    pub fn build(&self) -> Result<Self, Max6675Error> {
        // spidev treats a zero clock as "as fast as the controller goes"
        if self.clock_hz == 0 || self.clock_hz > MAX_CLOCK_HZ {
            return Err(Max6675Error::InvalidClock(self.clock_hz));
        }
        if self.conversion_time_ms < CONVERSION_TIME_MS {
            return Err(Max6675Error::InvalidConversionTime(self.conversion_time_ms));
        }
        Ok(*self)
    }

    /// Milliseconds waited for each conversion.
    pub fn conversion_time_ms(&self) -> u32 {
        self.conversion_time_ms
    }

    /// Microseconds chip select stays low to stop a conversion.
    pub fn stop_pulse_us(&self) -> u32 {
        self.stop_pulse_us
    }

    /// Serial clock in Hz requested from the hardware bus.
    pub fn clock(&self) -> u32 {
        self.clock_hz
    }

    /// Whether the bit-banged shift runs inside a critical section.
    pub fn masks_interrupts(&self) -> bool {
        self.mask_interrupts
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
