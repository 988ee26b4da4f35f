// Licensed under the Apache-2.0 license

//! Common types and constants for the bit-banged I2C engine.
//!
//! This module provides the adapter configuration, message and capability
//! flags, and the SMBus limits used by the transfer engine.

use bitflags::bitflags;
use fugit::MicrosDurationU32;

/// Largest byte count an SMBus block transfer may announce.
pub const SMBUS_BLOCK_MAX: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
    FastPlus = 1_000_000,
}

impl I2cSpeed {
    /// SCL high period for this bus rate, rounded up to whole microseconds.
    #[must_use]
    pub fn udelay(self) -> MicrosDurationU32 {
        let hz = self as u32;
        MicrosDurationU32::micros(500_000_u32.div_ceil(hz))
    }
}

bitflags! {
    /// Per-message protocol flags, bit-compatible with `struct i2c_msg`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct MessageFlags: u16 {
        /// 10-bit target address.
        const TEN = 0x0010;
        /// First received byte is the count of bytes that follow.
        const RECV_LEN = 0x0400;
        /// Do not acknowledge received bytes.
        const NO_RD_ACK = 0x0800;
        /// Treat NAKs as acknowledgments.
        const IGNORE_NAK = 0x1000;
        /// Invert the read/write bit of the address byte.
        const REV_DIR_ADDR = 0x2000;
        /// Continue the previous message without start or address.
        const NOSTART = 0x4000;
    }
}

bitflags! {
    /// Adapter capabilities, bit-compatible with `I2C_FUNC_*`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Functionality: u32 {
        const I2C = 0x0000_0001;
        const TEN_BIT_ADDR = 0x0000_0002;
        const PROTOCOL_MANGLING = 0x0000_0004;
        const SMBUS_PEC = 0x0000_0008;
        const NOSTART = 0x0000_0010;
        const SMBUS_BLOCK_PROC_CALL = 0x0000_8000;
        const SMBUS_QUICK = 0x0001_0000;
        const SMBUS_READ_BYTE = 0x0002_0000;
        const SMBUS_WRITE_BYTE = 0x0004_0000;
        const SMBUS_READ_BYTE_DATA = 0x0008_0000;
        const SMBUS_WRITE_BYTE_DATA = 0x0010_0000;
        const SMBUS_READ_WORD_DATA = 0x0020_0000;
        const SMBUS_WRITE_WORD_DATA = 0x0040_0000;
        const SMBUS_PROC_CALL = 0x0080_0000;
        const SMBUS_READ_BLOCK_DATA = 0x0100_0000;
        const SMBUS_WRITE_BLOCK_DATA = 0x0200_0000;
        const SMBUS_READ_I2C_BLOCK = 0x0400_0000;
        const SMBUS_WRITE_I2C_BLOCK = 0x0800_0000;

        const SMBUS_BYTE = Self::SMBUS_READ_BYTE.bits() | Self::SMBUS_WRITE_BYTE.bits();
        const SMBUS_BYTE_DATA =
            Self::SMBUS_READ_BYTE_DATA.bits() | Self::SMBUS_WRITE_BYTE_DATA.bits();
        const SMBUS_WORD_DATA =
            Self::SMBUS_READ_WORD_DATA.bits() | Self::SMBUS_WRITE_WORD_DATA.bits();
        const SMBUS_I2C_BLOCK =
            Self::SMBUS_READ_I2C_BLOCK.bits() | Self::SMBUS_WRITE_I2C_BLOCK.bits();
        const SMBUS_EMUL = Self::SMBUS_QUICK.bits()
            | Self::SMBUS_BYTE.bits()
            | Self::SMBUS_BYTE_DATA.bits()
            | Self::SMBUS_WORD_DATA.bits()
            | Self::SMBUS_PROC_CALL.bits()
            | Self::SMBUS_WRITE_BLOCK_DATA.bits()
            | Self::SMBUS_I2C_BLOCK.bits()
            | Self::SMBUS_PEC.bits();
    }
}

/// Timing and retry parameters of a bit-banged adapter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitAlgoConfig {
    /// SCL high period. Half of it is used for setup and hold.
    pub udelay: MicrosDurationU32,
    /// Clock-stretch deadline, in `Timebase` ticks.
    pub timeout: u64,
    /// Extra attempts for each address phase.
    pub retries: u8,
    /// Verbosity of the bit-level trace, 0 (off) to 3.
    pub debug_level: u8,
}

impl BitAlgoConfig {
    pub(crate) fn half_delay_us(&self) -> u32 {
        self.udelay.ticks() / 2
    }

    pub(crate) fn half_delay_up_us(&self) -> u32 {
        self.udelay.ticks().div_ceil(2)
    }
}

impl Default for BitAlgoConfig {
    fn default() -> Self {
        BitAlgoConfigBuilder::new().build()
    }
}

pub struct BitAlgoConfigBuilder {
    udelay: MicrosDurationU32,
    timeout: u64,
    retries: u8,
    debug_level: u8,
}

impl Default for BitAlgoConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BitAlgoConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            udelay: I2cSpeed::Standard.udelay(),
            timeout: 100,
            retries: 3,
            debug_level: 0,
        }
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.udelay = speed.udelay();
        self
    }
    #[must_use]
    pub fn udelay(mut self, udelay: MicrosDurationU32) -> Self {
        self.udelay = udelay;
        self
    }
    #[must_use]
    pub fn timeout(mut self, ticks: u64) -> Self {
        self.timeout = ticks;
        self
    }
    #[must_use]
    pub fn retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }
    #[must_use]
    pub fn debug_level(mut self, level: u8) -> Self {
        self.debug_level = level.min(3);
        self
    }
    #[must_use]
    pub fn build(self) -> BitAlgoConfig {
        BitAlgoConfig {
            udelay: self.udelay,
            timeout: self.timeout,
            retries: self.retries,
            debug_level: self.debug_level,
        }
    }
}
