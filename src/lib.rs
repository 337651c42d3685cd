//! # max6675
//!
//! A library that reads temperatures from a MAX6675 thermocouple digitizer,
//! either by bit-banging three GPIO lines or through a hardware SPI bus.
//!
//! ## Usage
//!
//! Every read restarts a conversion, waits the chip's 220 ms conversion time
//! and then shifts the 16-bit result in. Failures of the thermocouple itself
//! come back as [`Max6675Error::OpenCircuit`] or [`Max6675Error::UnknownChip`].
//!
//! Bit-banged, with any `embedded-hal` GPIO lines:
//!
//! ```ignore
//! use max6675::{Config, Max6675, SleepDelay};
//!
//! let mut max = Max6675::software(cs, sck, so, SleepDelay, Config::new())?;
//! println!("Read Celsius! Got: {}° C.", max.read_celsius()?);
//! ```
//!
//! Through the Linux kernel's SPI API (on Linux, `ls /dev -1 | grep spidev`
//! tells you which device to open):
//!
//! ```ignore
//! use max6675::{Config, Max6675, SleepDelay, SpidevBus};
//!
//! let bus = SpidevBus::open("/dev/spidev0.0")?;
//! let mut max = Max6675::hardware(cs, bus, SleepDelay, Config::new())?;
//!
//! loop {
//!     println!("Read Celsius! Got: {}° C.", max.read_celsius()?);
//!     std::thread::sleep(std::time::Duration::from_millis(500));
//! }
//! ```
//!
//! Words captured earlier can be decoded without any hardware:
//!
//! ```
//! use max6675::{Max6675Error, RawSample};
//!
//! assert_eq!(RawSample::new(0x0C80).celsius().unwrap(), 100.0);
//! assert!(matches!(RawSample::new(0x0C84).celsius(), Err(Max6675Error::OpenCircuit)));
//! ```

pub mod bus;
pub mod config;
pub mod decode;
pub mod delay;
pub mod error;
pub mod transport;

#[cfg(feature = "spidev")]
pub use bus::SpidevBus;
pub use bus::{BusSettings, HalBus, SerialBus, Unused};
pub use config::{Config, CONVERSION_TIME_MS, MAX_CLOCK_HZ};
pub use decode::{or_sentinel, RawSample, Sample, Unit, CHIP_ID, ERROR_SENTINEL, FORCE_READ, RESOLUTION};
pub use delay::SleepDelay;
pub use error::Max6675Error;
pub use transport::{Max6675, Wiring};
