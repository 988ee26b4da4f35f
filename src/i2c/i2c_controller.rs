// Licensed under the Apache-2.0 license

//! embedded-hal front end for a transfer algorithm.
//!
//! Maps `embedded_hal::i2c::Operation` lists onto engine messages so any
//! embedded-hal device driver can sit on top of a bit-banged bus.

use embedded_hal::i2c::{Operation, SevenBitAddress, TenBitAddress};
use heapless::Vec;

use crate::common::{LogLevel, Logger, NoOpLogger};
use crate::i2c::common::{Functionality, MessageFlags};
use crate::i2c::error::Error;
use crate::i2c::message::Message;
use crate::i2c::traits::I2cAlgorithm;

/// Most operations accepted in one `transaction` call.
pub const MAX_OPERATIONS: usize = 16;

pub struct I2cController<A: I2cAlgorithm, L: Logger = NoOpLogger> {
    pub algo: A,
    pub logger: L,
}

impl<A: I2cAlgorithm> I2cController<A> {
    pub fn new(algo: A) -> Self {
        Self {
            algo,
            logger: NoOpLogger,
        }
    }
}

impl<A, L> I2cController<A, L>
where
    A: I2cAlgorithm,
    A::Error: Into<Error>,
    L: Logger,
{
    pub fn with_logger(algo: A, logger: L) -> Self {
        Self { algo, logger }
    }

    #[must_use]
    pub fn functionality(&self) -> Functionality {
        self.algo.functionality()
    }

    /// # Errors
    ///
    /// Whatever the algorithm reports when the bus stays stuck.
    pub fn recover_bus(&mut self) -> Result<(), Error> {
        self.algo.recover_bus().map_err(Into::into).inspect_err(|e| {
            self.logger
                .log(LogLevel::Error, format_args!("bus recovery failed: {e}"));
        })
    }

    fn run(
        &mut self,
        addr: u16,
        flags: MessageFlags,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        if operations.is_empty() {
            return Ok(());
        }

        let mut msgs: Vec<Message<'_>, MAX_OPERATIONS> = Vec::new();
        for op in operations.iter_mut() {
            let msg = match op {
                Operation::Read(buf) => Message::read(addr, buf),
                Operation::Write(bytes) => Message::write(addr, bytes),
            }
            .with_flags(flags);

            // Same-direction neighbours form one unbroken byte stream.
            let msg = match msgs.last_mut() {
                Some(prev) if prev.is_read() == msg.is_read() => {
                    prev.set_ack_last();
                    msg.with_flags(MessageFlags::NOSTART)
                }
                _ => msg,
            };
            if msgs.push(msg).is_err() {
                self.logger.log(
                    LogLevel::Error,
                    format_args!(
                        "transaction to 0x{addr:02x}: more than {MAX_OPERATIONS} operations"
                    ),
                );
                return Err(Error::Resource);
            }
        }

        match self.algo.master_xfer(&mut msgs) {
            Ok(_) => Ok(()),
            Err(e) => {
                let e: Error = e.into();
                self.logger.log(
                    LogLevel::Error,
                    format_args!("transaction to 0x{addr:02x} failed: {e}"),
                );
                Err(e)
            }
        }
    }
}

impl<A: I2cAlgorithm, L: Logger> embedded_hal::i2c::ErrorType for I2cController<A, L> {
    type Error = Error;
}

impl<A, L> embedded_hal::i2c::I2c<SevenBitAddress> for I2cController<A, L>
where
    A: I2cAlgorithm,
    A::Error: Into<Error>,
    L: Logger,
{
    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run(u16::from(addr), MessageFlags::empty(), operations)
    }
}

impl<A, L> embedded_hal::i2c::I2c<TenBitAddress> for I2cController<A, L>
where
    A: I2cAlgorithm,
    A::Error: Into<Error>,
    L: Logger,
{
    fn transaction(
        &mut self,
        addr: TenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run(addr & 0x3ff, MessageFlags::TEN, operations)
    }
}
