// Licensed under the Apache-2.0 license

//! Bit-banged I2C master.
//!
//! This module drives an I2C bus from two open-drain lines, with no I2C
//! peripheral involved. It is designed for bare-metal and `no_std`
//! environments: the platform supplies line access, a delay and a clock,
//! and the engine supplies the protocol.

pub mod algo_bit;
pub mod common;
pub mod error;
pub mod gpio_lines;
pub mod i2c_controller;
pub mod message;
pub mod traits;

#[cfg(test)]
pub(crate) mod sim;

pub use algo_bit::BitAdapter;
pub use common::{
    BitAlgoConfig, BitAlgoConfigBuilder, Functionality, I2cSpeed, MessageFlags, SMBUS_BLOCK_MAX,
};
pub use error::Error;
pub use gpio_lines::GpioLines;
pub use i2c_controller::I2cController;
pub use message::Message;
pub use traits::{BitLines, I2cAlgorithm, NoHooks, Timebase, XferHooks};
