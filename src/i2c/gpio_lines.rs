// Licensed under the Apache-2.0 license

//! [`BitLines`] over two embedded-hal GPIO pins.
//!
//! Both pins must be configured open-drain with pull-ups: setting a pin high
//! releases the line and reading it returns the wired-AND level.

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::i2c::traits::BitLines;

pub struct GpioLines<SCL, SDA> {
    scl: SCL,
    sda: SDA,
    scl_sense: bool,
}

impl<SCL, SDA> GpioLines<SCL, SDA>
where
    SCL: OutputPin<Error = Infallible> + InputPin<Error = Infallible>,
    SDA: OutputPin<Error = Infallible> + InputPin<Error = Infallible>,
{
    /// Lines with SCL read back, so clock stretching is honoured.
    pub fn new(scl: SCL, sda: SDA) -> Self {
        Self {
            scl,
            sda,
            scl_sense: true,
        }
    }

    /// For boards whose clock pin cannot be sampled.
    pub fn without_scl_sense(scl: SCL, sda: SDA) -> Self {
        Self {
            scl,
            sda,
            scl_sense: false,
        }
    }

    pub fn release(self) -> (SCL, SDA) {
        (self.scl, self.sda)
    }
}

fn infallible<T>(r: Result<T, Infallible>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => match e {},
    }
}

impl<SCL, SDA> BitLines for GpioLines<SCL, SDA>
where
    SCL: OutputPin<Error = Infallible> + InputPin<Error = Infallible>,
    SDA: OutputPin<Error = Infallible> + InputPin<Error = Infallible>,
{
    fn set_sda(&mut self, high: bool) {
        infallible(self.sda.set_state(PinState::from(high)));
    }

    fn set_scl(&mut self, high: bool) {
        infallible(self.scl.set_state(PinState::from(high)));
    }

    fn get_sda(&mut self) -> bool {
        infallible(self.sda.is_high())
    }

    fn scl_sense(&self) -> bool {
        self.scl_sense
    }

    fn get_scl(&mut self) -> bool {
        infallible(self.scl.is_high())
    }
}
