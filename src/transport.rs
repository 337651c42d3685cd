//! Triggering a conversion and shifting the result out of the chip.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use tracing::{debug, trace, warn};

use crate::bus::{BusSettings, SerialBus, Unused};
use crate::config::Config;
use crate::decode::{RawSample, Sample, Unit};
use crate::error::{bus_error, pin_error, Max6675Error};

const WORD_BITS: usize = 16;

/// How the data phase of a read is clocked. Fixed for a handle's lifetime.
#[derive(Debug)]
pub enum Wiring<SCK, SO, BUS> {
    /// Clock and data are GPIO lines, toggled one bit at a time.
    Software { sck: SCK, so: SO },
    /// A serial peripheral clocks the word in one block transfer.
    Hardware { bus: BUS },
}

impl<SCK, SO, BUS> Wiring<SCK, SO, BUS> {
    /// `true` for bit-banged wiring.
    pub fn is_software(&self) -> bool {
        matches!(self, Self::Software { .. })
    }
}

/// A representation of the MAX6675 thermocouple digitizer.
///
/// A handle owns its chip-select line for good. Nothing here is synchronized, so
/// share a handle between threads only behind a lock.
#[derive(Debug)]
pub struct Max6675<CS, SCK, SO, BUS, D> {
    cs: CS,
    wiring: Wiring<SCK, SO, BUS>,
    delay: D,
    config: Config,
}

impl<CS, SCK, SO, D> Max6675<CS, SCK, SO, Unused, D>
where
    CS: OutputPin,
    SCK: OutputPin,
    SO: InputPin,
    D: DelayNs,
{
    /// Bit-bangs reads over three GPIO lines: chip select, clock and data.
    ///
    /// Deselects the chip, which starts a conversion, and parks the clock low.
    pub fn software(
        mut cs: CS,
        mut sck: SCK,
        so: SO,
        delay: D,
        config: Config,
    ) -> Result<Self, Max6675Error> {
        let config = config.build()?;
        cs.set_high().map_err(pin_error)?;
        sck.set_low().map_err(pin_error)?;

        Ok(Self {
            cs,
            wiring: Wiring::Software { sck, so },
            delay,
            config,
        })
    }
}

impl<CS, BUS, D> Max6675<CS, Unused, Unused, BUS, D>
where
    CS: OutputPin,
    BUS: SerialBus,
    D: DelayNs,
{
    /// Reads through a serial peripheral, selecting the chip with `cs`.
    ///
    /// `bus` may be a `&mut` to a bus other devices share; it's only claimed
    /// while a word is being clocked in.
    pub fn hardware(mut cs: CS, bus: BUS, delay: D, config: Config) -> Result<Self, Max6675Error> {
        let config = config.build()?;
        cs.set_high().map_err(pin_error)?;

        Ok(Self {
            cs,
            wiring: Wiring::Hardware { bus },
            delay,
            config,
        })
    }
}

impl<CS, SCK, SO, BUS, D> Max6675<CS, SCK, SO, BUS, D>
where
    CS: OutputPin,
    SCK: OutputPin,
    SO: InputPin,
    BUS: SerialBus,
    D: DelayNs,
{
    /// Restarts a conversion, waits it out and shifts in the 16-bit result.
    ///
    /// Blocks for the whole conversion time. The word isn't checked here; a
    /// floating data line comes back as whatever the line idles at.
    pub fn acquire(&mut self) -> Result<RawSample, Max6675Error> {
        // pulling CS low stops any running conversion, releasing it starts a new one
        trace!("restarting conversion");
        self.cs.set_low().map_err(pin_error)?;
        self.delay.delay_us(self.config.stop_pulse_us());
        self.cs.set_high().map_err(pin_error)?;
        self.delay.delay_ms(self.config.conversion_time_ms());

        trace!("reading conversion");
        self.cs.set_low().map_err(pin_error)?;
        let word = self.read_word();
        // deselect even if the read failed; this also kicks off the next conversion
        let deselected = self.cs.set_high().map_err(pin_error);
        let word = word?;
        deselected?;

        debug!("acquired raw sample {word:#06x}");
        Ok(RawSample::new(word))
    }

    fn read_word(&mut self) -> Result<u16, Max6675Error> {
        match &mut self.wiring {
            Wiring::Software { sck, so } => {
                if self.config.masks_interrupts() {
                    critical_section::with(|_| shift_in(sck, so))
                } else {
                    shift_in(sck, so)
                }
            }
            Wiring::Hardware { bus } => {
                let mut buf = [0_u8; 2];
                bus.begin(&BusSettings::new(self.config.clock()))
                    .map_err(bus_error)?;
                let transferred = bus.transfer(&mut buf).map_err(bus_error);
                let released = bus.end().map_err(bus_error);
                transferred?;
                released?;
                Ok(u16::from_be_bytes(buf))
            }
        }
    }

    /// Tries to read the thermocouple's temperature in Celsius, from `sample`
    /// or from a fresh acquisition.
    pub fn temperature(&mut self, sample: Sample) -> Result<f64, Max6675Error> {
        let raw = self.sample(sample)?;
        raw.celsius().map_err(|e| {
            warn!("rejected sample {:#06x}: {e}", raw.bits());
            e
        })
    }

    /// Tries to read the thermocouple's temperature in Celsius, right now.
    pub fn read_celsius(&mut self) -> Result<f64, Max6675Error> {
        self.temperature(Sample::Fresh)
    }

    /// Like [`Max6675::read_celsius`], in the given unit.
    pub fn read(&mut self, unit: Unit) -> Result<f64, Max6675Error> {
        self.read_celsius().map(|celsius| unit.convert(celsius))
    }

    /// Check if the thermocouple input is closed (-T must be grounded).
    pub fn is_connected(&mut self, sample: Sample) -> Result<bool, Max6675Error> {
        Ok(self.sample(sample)?.is_connected())
    }

    /// [`CHIP_ID`](crate::CHIP_ID) if `sample`, or a fresh one, identifies as a MAX6675.
    pub fn chip_id(&mut self, sample: Sample) -> Result<Option<u16>, Max6675Error> {
        Ok(self.sample(sample)?.chip_id())
    }

    fn sample(&mut self, sample: Sample) -> Result<RawSample, Max6675Error> {
        match sample {
            Sample::Captured(raw) => Ok(raw),
            Sample::Fresh => self.acquire(),
        }
    }

    /// How this handle clocks its reads.
    pub fn wiring(&self) -> &Wiring<SCK, SO, BUS> {
        &self.wiring
    }

    /// The validated settings this handle was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gives back the chip select, the wiring and the delay.
    pub fn release(self) -> (CS, Wiring<SCK, SO, BUS>, D) {
        (self.cs, self.wiring, self.delay)
    }
}

/// Clocks 16 bits in, MSB first, sampling while the clock is high.
fn shift_in<SCK, SO>(sck: &mut SCK, so: &mut SO) -> Result<u16, Max6675Error>
where
    SCK: OutputPin,
    SO: InputPin,
{
    sck.set_low().map_err(pin_error)?;

    let mut word = 0_u16;
    for _ in 0..WORD_BITS {
        sck.set_high().map_err(pin_error)?;
        let bit = so.is_high().map_err(pin_error)?;
        word = (word << 1) | u16::from(bit);
        sck.set_low().map_err(pin_error)?;
    }
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::HalBus;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    /// Chip select as the constructor and one acquisition drive it.
    fn cs_for_one_read() -> Vec<PinTransaction> {
        vec![
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ]
    }

    fn sck_for_one_read() -> Vec<PinTransaction> {
        let mut sck = vec![PinTransaction::set(State::Low), PinTransaction::set(State::Low)];
        for _ in 0..16 {
            sck.push(PinTransaction::set(State::High));
            sck.push(PinTransaction::set(State::Low));
        }
        sck
    }

    fn so_for(word: u16) -> Vec<PinTransaction> {
        (0..16)
            .rev()
            .map(|bit| {
                let state = if word & (1 << bit) != 0 { State::High } else { State::Low };
                PinTransaction::get(state)
            })
            .collect()
    }

    fn done(max: Max6675<PinMock, PinMock, PinMock, Unused, NoopDelay>) {
        let (mut cs, wiring, _) = max.release();
        cs.done();
        match wiring {
            Wiring::Software { mut sck, mut so } => {
                sck.done();
                so.done();
            }
            Wiring::Hardware { .. } => unreachable!(),
        }
    }

    #[test]
    fn software_read_shifts_msb_first() {
        let word = 0b0_000110010000_0_0_0;
        let mut max = Max6675::software(
            PinMock::new(&cs_for_one_read()),
            PinMock::new(&sck_for_one_read()),
            PinMock::new(&so_for(word)),
            NoopDelay::new(),
            Config::new(),
        )
        .unwrap();

        assert_eq!(max.acquire().unwrap(), RawSample::new(word));
        done(max);
    }

    #[test]
    fn software_read_decodes() {
        let mut max = Max6675::software(
            PinMock::new(&cs_for_one_read()),
            PinMock::new(&sck_for_one_read()),
            PinMock::new(&so_for(0x0C80)),
            NoopDelay::new(),
            Config::new(),
        )
        .unwrap();

        assert_eq!(max.read_celsius().unwrap(), 100.0);
        done(max);
    }

    #[test]
    fn open_thermocouple_reads_as_an_error() {
        let mut max = Max6675::software(
            PinMock::new(&cs_for_one_read()),
            PinMock::new(&sck_for_one_read()),
            PinMock::new(&so_for(0x0C84)),
            NoopDelay::new(),
            Config::new(),
        )
        .unwrap();

        assert!(matches!(max.read_celsius(), Err(Max6675Error::OpenCircuit)));
        done(max);
    }

    /// Serves `word` MSB first. On its first read it checks whether another
    /// thread can get into a critical section while the shift is running.
    struct ContendedLine {
        word: u16,
        reads: u32,
        other_thread_entered: Option<bool>,
        other_thread: Option<thread::JoinHandle<()>>,
    }

    impl ContendedLine {
        fn new(word: u16) -> Self {
            Self {
                word,
                reads: 0,
                other_thread_entered: None,
                other_thread: None,
            }
        }
    }

    impl embedded_hal::digital::ErrorType for ContendedLine {
        type Error = core::convert::Infallible;
    }

    impl InputPin for ContendedLine {
        fn is_high(&mut self) -> Result<bool, core::convert::Infallible> {
            if self.other_thread.is_none() {
                let (tx, rx) = mpsc::channel();
                self.other_thread = Some(thread::spawn(move || {
                    critical_section::with(|_| {
                        let _ = tx.send(());
                    })
                }));
                let entered = rx.recv_timeout(Duration::from_millis(500)).is_ok();
                self.other_thread_entered = Some(entered);
            }

            let bit = self.word & (0x8000 >> self.reads) != 0;
            self.reads += 1;
            Ok(bit)
        }

        fn is_low(&mut self) -> Result<bool, core::convert::Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    fn read_contended(mask: bool) -> (u16, bool) {
        let mut max = Max6675::software(
            Unused,
            Unused,
            ContendedLine::new(0x7FF8),
            NoopDelay::new(),
            *Config::new().mask_interrupts(mask),
        )
        .unwrap();
        let word = max.acquire().unwrap().bits();

        let (_, wiring, _) = max.release();
        let Wiring::Software { so: mut line, .. } = wiring else {
            unreachable!()
        };
        line.other_thread.take().unwrap().join().unwrap();
        (word, line.other_thread_entered.unwrap())
    }

    // one test, so no other test's critical section can get in the way
    #[test]
    fn critical_section_is_held_only_while_masking() {
        let (word, other_thread_entered) = read_contended(false);
        assert_eq!(word, 0x7FF8);
        assert!(other_thread_entered);

        let (word, other_thread_entered) = read_contended(true);
        assert_eq!(word, 0x7FF8);
        assert!(!other_thread_entered);
    }

    #[test]
    fn captured_samples_touch_no_lines() {
        let mut max = Max6675::software(
            PinMock::new(&[PinTransaction::set(State::High)]),
            PinMock::new(&[PinTransaction::set(State::Low)]),
            PinMock::new(&[] as &[PinTransaction]),
            NoopDelay::new(),
            Config::new(),
        )
        .unwrap();

        let sample = Sample::Captured(RawSample::new(0x0C82));
        assert_eq!(max.chip_id(sample).unwrap(), None);
        assert!(max.is_connected(sample).unwrap());
        assert!(matches!(max.temperature(sample), Err(Max6675Error::UnknownChip)));
        done(max);
    }

    #[test]
    fn hardware_read_brackets_the_transfer() {
        let spi = SpiMock::new(&[
            SpiTransaction::transfer_in_place(vec![0x00, 0x00], vec![0x0C, 0x80]),
            SpiTransaction::flush(),
        ]);
        let mut max = Max6675::hardware(
            PinMock::new(&cs_for_one_read()),
            HalBus::new(spi),
            NoopDelay::new(),
            Config::new(),
        )
        .unwrap();

        assert_eq!(max.read(Unit::Fahrenheit).unwrap(), 212.0);

        let (mut cs, wiring, _) = max.release();
        cs.done();
        match wiring {
            Wiring::Hardware { bus } => bus.release().done(),
            Wiring::Software { .. } => unreachable!(),
        }
    }

    #[test]
    fn too_fast_a_clock_is_refused() {
        let mut cs = PinMock::new(&[] as &[PinTransaction]);
        let result = Max6675::hardware(
            cs.clone(),
            Unused,
            NoopDelay::new(),
            *Config::new().clock_hz(10_000_000),
        );
        let Err(Max6675Error::InvalidClock(10_000_000)) = result else {
            panic!("clock should have been rejected");
        };
        cs.done();
    }
}
