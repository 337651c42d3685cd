use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// A [`DelayNs`] that puts the calling thread to sleep, for hosts like a Raspberry Pi.
///
/// Sleeps are at least as long as requested, which is all the MAX6675 needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepDelay;

impl DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms.into()));
    }
}
