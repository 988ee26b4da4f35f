// Licensed under the Apache-2.0 license

//! # Bit-Banged I2C Platform Traits
//!
//! The engine owns no hardware. Everything it touches arrives through the
//! traits in this module, each with a single responsibility:
//!
//! ```text
//! BitLines      (drive and sample SDA/SCL)
//! Timebase      (monotonic ticks, poll relax, voluntary yield)
//! DelayNs       (embedded-hal, setup/hold delays)
//! XferHooks     (bus acquire/release around a transaction)
//! I2cAlgorithm  (what the engine offers back to a bus layer)
//! ```

use crate::i2c::common::Functionality;
use crate::i2c::error::Error;
use crate::i2c::message::Message;

/// Open-drain line control for one bus.
///
/// `true` releases a line (pulled high externally), `false` drives it low.
///
/// # Examples
///
/// ```rust,no_run
/// use i2c_algo_bit::i2c::BitLines;
///
/// struct Lines {
///     sda: bool,
///     scl: bool,
/// }
///
/// impl BitLines for Lines {
///     fn set_sda(&mut self, high: bool) {
///         self.sda = high;
///     }
///     fn set_scl(&mut self, high: bool) {
///         self.scl = high;
///     }
///     fn get_sda(&mut self) -> bool {
///         self.sda
///     }
/// }
/// ```
pub trait BitLines {
    fn set_sda(&mut self, high: bool);

    fn set_scl(&mut self, high: bool);

    fn get_sda(&mut self) -> bool;

    /// Whether SCL can be read back.
    ///
    /// Without it the engine cannot see a target stretching the clock and
    /// falls back to fixed delays.
    fn scl_sense(&self) -> bool {
        false
    }

    /// Sample SCL. Only called when [`BitLines::scl_sense`] is true.
    fn get_scl(&mut self) -> bool {
        true
    }
}

/// Platform clock used for the clock-stretch deadline.
pub trait Timebase {
    /// Monotonic tick count. Wrap-around is tolerated.
    fn now(&mut self) -> u64;

    /// Called between SCL polls.
    fn relax(&mut self) {}

    /// Voluntary preemption point between address retries. May do nothing.
    fn yield_now(&mut self) {}
}

/// Hooks bracketing every transaction, typically bus arbitration with
/// another master or a mux.
pub trait XferHooks {
    /// Refusing here aborts the transaction before any line moves.
    ///
    /// # Errors
    ///
    /// The returned error is handed to the caller unchanged, normally
    /// [`Error::Resource`].
    fn pre_xfer(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Runs after the STOP condition, whatever the outcome.
    fn post_xfer(&mut self) {}
}

/// Adapter without transaction hooks.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHooks;

impl XferHooks for NoHooks {}

/// A transfer algorithm as seen by a bus layer.
pub trait I2cAlgorithm {
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Run `msgs` as one combined transaction.
    ///
    /// # Errors
    ///
    /// The first failing message ends the transaction. STOP is still sent.
    fn master_xfer(&mut self, msgs: &mut [Message<'_>]) -> Result<usize, Self::Error>;

    /// Message flags and SMBus operations this algorithm can carry.
    fn functionality(&self) -> Functionality;

    /// Free a bus left stuck by a target holding SDA low.
    ///
    /// # Errors
    ///
    /// Returns an error if SDA stays low after recovery.
    fn recover_bus(&mut self) -> Result<(), Self::Error>;
}
