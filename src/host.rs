// Licensed under the Apache-2.0 license

//! Hosted platform pieces, for running the engine under an OS.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::i2c::traits::Timebase;

/// Millisecond ticks since construction.
#[derive(Copy, Clone, Debug)]
pub struct StdTimebase {
    origin: Instant,
}

impl StdTimebase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdTimebase {
    fn default() -> Self {
        Self::new()
    }
}

impl Timebase for StdTimebase {
    fn now(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn relax(&mut self) {
        core::hint::spin_loop();
    }

    fn yield_now(&mut self) {
        std::thread::yield_now();
    }
}

/// Busy-waiting delay. Sleeping would overshoot microsecond half-periods.
#[derive(Copy, Clone, Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        let until = Instant::now() + Duration::from_nanos(u64::from(ns));
        while Instant::now() < until {
            core::hint::spin_loop();
        }
    }
}
