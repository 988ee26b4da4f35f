// Licensed under the Apache-2.0 license

//! Bit-banged I2C master.
//!
//! Implements START/STOP/repeated START, byte transfer with acknowledge,
//! clock stretching, 7-bit and 10-bit addressing and combined transactions
//! purely by toggling two open-drain lines through [`BitLines`].
//!
//! Layering, from the wire up:
//!
//! - line helpers: `sdalo`, `sdahi`, `scllo`, `sclhi`
//! - conditions: `start`, `repstart`, `stop`
//! - bytes: `outb`, `inb`, `acknak`
//! - messages: `try_address`, `do_address`, `send_bytes`, `read_bytes`
//! - transaction: [`BitAdapter::master_xfer`]
//!
//! Every helper leaves SCL low on return unless noted otherwise.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::common::{LogLevel, Logger, NoOpLogger};
use crate::i2c::common::{BitAlgoConfig, Functionality, MessageFlags, SMBUS_BLOCK_MAX};
use crate::i2c::error::Error;
use crate::i2c::message::Message;
use crate::i2c::traits::{BitLines, I2cAlgorithm, NoHooks, Timebase, XferHooks};

/// SCL pulses that always clock a stuck target through its current byte.
const RECOVERY_PULSES: u32 = 9;

/// A bus driven by the bit-banging engine.
///
/// Owns the line, delay and clock handles for its whole life. Callers must
/// not share one bus between transactions in flight; wrap the adapter in a
/// mutex when several contexts need it.
pub struct BitAdapter<L, D, T, H = NoHooks, G = NoOpLogger> {
    lines: L,
    delay: D,
    timebase: T,
    hooks: H,
    logger: G,
    config: BitAlgoConfig,
}

impl<L, D, T> BitAdapter<L, D, T>
where
    L: BitLines,
    D: DelayNs,
    T: Timebase,
{
    pub fn new(lines: L, delay: D, timebase: T, config: BitAlgoConfig) -> Self {
        Self {
            lines,
            delay,
            timebase,
            hooks: NoHooks,
            logger: NoOpLogger,
            config,
        }
    }
}

impl<L, D, T, H, G> BitAdapter<L, D, T, H, G>
where
    L: BitLines,
    D: DelayNs,
    T: Timebase,
    H: XferHooks,
    G: Logger,
{
    #[must_use]
    pub fn with_hooks<H2: XferHooks>(self, hooks: H2) -> BitAdapter<L, D, T, H2, G> {
        BitAdapter {
            lines: self.lines,
            delay: self.delay,
            timebase: self.timebase,
            hooks,
            logger: self.logger,
            config: self.config,
        }
    }

    #[must_use]
    pub fn with_logger<G2: Logger>(self, logger: G2) -> BitAdapter<L, D, T, H, G2> {
        BitAdapter {
            lines: self.lines,
            delay: self.delay,
            timebase: self.timebase,
            hooks: self.hooks,
            logger,
            config: self.config,
        }
    }

    pub fn config(&self) -> &BitAlgoConfig {
        &self.config
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn logger(&self) -> &G {
        &self.logger
    }

    /// Give back the platform handles.
    pub fn release(self) -> (L, D, T) {
        (self.lines, self.delay, self.timebase)
    }

    fn dbg(&mut self, level: u8, args: fmt::Arguments<'_>) {
        if level <= self.config.debug_level {
            self.logger.log(LogLevel::Debug, args);
        }
    }

    fn err(&mut self, args: fmt::Arguments<'_>) {
        self.logger.log(LogLevel::Error, args);
    }

    fn udelay(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn sdalo(&mut self) {
        self.lines.set_sda(false);
        self.udelay(self.config.half_delay_up_us());
    }

    fn sdahi(&mut self) {
        self.lines.set_sda(true);
        self.udelay(self.config.half_delay_up_us());
    }

    fn scllo(&mut self) {
        self.lines.set_scl(false);
        self.udelay(self.config.half_delay_us());
    }

    /// Release SCL and wait for it to actually rise.
    ///
    /// Leaves SCL high.
    fn sclhi(&mut self) -> Result<(), Error> {
        self.lines.set_scl(true);

        if self.lines.scl_sense() {
            let start = self.timebase.now();
            while !self.lines.get_scl() {
                let elapsed = self.timebase.now().wrapping_sub(start);
                if elapsed > self.config.timeout {
                    // One last look: we may have been preempted between the
                    // sample and the deadline check.
                    if self.lines.get_scl() {
                        break;
                    }
                    return Err(Error::Timeout);
                }
                self.timebase.relax();
            }
            if self.config.debug_level >= 3 {
                let waited = self.timebase.now().wrapping_sub(start);
                if waited != 0 {
                    self.dbg(3, format_args!("needed {waited} ticks for SCL to go high"));
                }
            }
        }

        self.udelay(self.config.udelay.ticks());
        Ok(())
    }

    /// Expects SCL and SDA high.
    fn start(&mut self) {
        self.lines.set_sda(false);
        self.udelay(self.config.udelay.ticks());
        self.scllo();
    }

    fn repstart(&mut self) {
        self.sdahi();
        // A stretch timeout here surfaces on the next address byte.
        let _ = self.sclhi();
        self.lines.set_sda(false);
        self.udelay(self.config.udelay.ticks());
        self.scllo();
    }

    /// Leaves both lines released.
    fn stop(&mut self) {
        self.sdalo();
        // The bus is released regardless; nothing left to report to.
        let _ = self.sclhi();
        self.lines.set_sda(true);
        self.udelay(self.config.udelay.ticks());
    }

    /// Shift out one byte, MSB first. `Ok(true)` when the target ACKed.
    fn outb(&mut self, byte: u8) -> Result<bool, Error> {
        for bit in (0..8).rev() {
            self.lines.set_sda((byte >> bit) & 1 != 0);
            self.udelay(self.config.half_delay_up_us());
            if let Err(e) = self.sclhi() {
                self.dbg(
                    1,
                    format_args!("outb: 0x{byte:02x}, timeout at bit #{bit}"),
                );
                return Err(e);
            }
            self.scllo();
        }

        self.sdahi();
        if let Err(e) = self.sclhi() {
            self.dbg(1, format_args!("outb: 0x{byte:02x}, timeout at ack"));
            return Err(e);
        }

        // The target pulls SDA low to acknowledge.
        let ack = !self.lines.get_sda();
        self.dbg(
            2,
            format_args!("outb: 0x{byte:02x} {}", if ack { "A" } else { "NA" }),
        );

        self.scllo();
        Ok(ack)
    }

    /// Shift in one byte, MSB first. The acknowledge bit is left to the
    /// caller.
    fn inb(&mut self) -> Result<u8, Error> {
        let mut indata = 0u8;

        self.sdahi();
        for i in 0..8 {
            if let Err(e) = self.sclhi() {
                self.dbg(1, format_args!("inb: timeout at bit #{}", 7 - i));
                return Err(e);
            }
            indata <<= 1;
            if self.lines.get_sda() {
                indata |= 0x01;
            }
            self.lines.set_scl(false);
            let hold = if i == 7 {
                self.config.half_delay_us()
            } else {
                self.config.udelay.ticks()
            };
            self.udelay(hold);
        }

        Ok(indata)
    }

    /// Send an address byte, restarting the bus between failed attempts.
    ///
    /// Makes `retries + 1` attempts. Anything but an ACK, a timeout included,
    /// is retried. The last outcome is returned.
    fn try_address(&mut self, addr: u8, retries: u8) -> Result<bool, Error> {
        let mut attempt: u8 = 0;
        let ret = loop {
            let ret = self.outb(addr);
            if matches!(ret, Ok(true)) || attempt == retries {
                break ret;
            }
            self.dbg(3, format_args!("emitting stop condition"));
            self.stop();
            self.udelay(self.config.udelay.ticks());
            self.timebase.yield_now();
            self.dbg(3, format_args!("emitting start condition"));
            self.start();
            attempt += 1;
        };

        if attempt > 0 && !matches!(ret, Ok(false)) {
            self.dbg(
                1,
                format_args!(
                    "used {} tries to {} client at 0x{:02x}: {}",
                    u32::from(attempt) + 1,
                    if addr & 1 != 0 { "read from" } else { "write to" },
                    addr >> 1,
                    if ret.is_ok() { "success" } else { "failed, timeout?" }
                ),
            );
        }
        ret
    }

    fn do_address(&mut self, msg: &Message<'_>) -> Result<(), Error> {
        let flags = msg.flags();
        let nak_ok = flags.contains(MessageFlags::IGNORE_NAK);
        let retries = if nak_ok { 0 } else { self.config.retries };

        if flags.contains(MessageFlags::TEN) {
            let mut addr = 0xf0 | ((msg.addr() >> 7) & 0x06) as u8;
            self.dbg(2, format_args!("addr0: {addr}"));

            let acked = matches!(self.try_address(addr, retries), Ok(true));
            if !acked && !nak_ok {
                self.err(format_args!("died at extended address code"));
                return Err(Error::NoDevice);
            }

            let acked = matches!(self.outb((msg.addr() & 0xff) as u8), Ok(true));
            if !acked && !nak_ok {
                self.err(format_args!("died at 2nd address code"));
                return Err(Error::NoDevice);
            }

            if msg.is_read() {
                self.dbg(3, format_args!("emitting repeated start condition"));
                self.repstart();
                addr |= 0x01;
                let acked = matches!(self.try_address(addr, retries), Ok(true));
                if !acked && !nak_ok {
                    self.err(format_args!("died at repeated address code"));
                    return Err(Error::Io);
                }
            }
        } else {
            let mut addr = ((msg.addr() & 0x7f) << 1) as u8;
            if msg.is_read() {
                addr |= 0x01;
            }
            if flags.contains(MessageFlags::REV_DIR_ADDR) {
                addr ^= 0x01;
            }
            let acked = matches!(self.try_address(addr, retries), Ok(true));
            if !acked && !nak_ok {
                return Err(Error::NoDevice);
            }
        }

        Ok(())
    }

    fn send_bytes(&mut self, msg: &Message<'_>) -> Result<usize, Error> {
        let nak_ok = msg.flags().contains(MessageFlags::IGNORE_NAK);
        let mut wrcount = 0;

        for &byte in msg.data() {
            match self.outb(byte) {
                Ok(true) => wrcount += 1,
                Ok(false) if nak_ok => wrcount += 1,
                // The target disliked what it saw, e.g. a bad PEC.
                Ok(false) => {
                    self.err(format_args!("sendbytes: NAK bailout."));
                    return Err(Error::Io);
                }
                Err(e) => {
                    self.err(format_args!("sendbytes: error {}", e.errno()));
                    return Err(e);
                }
            }
        }

        Ok(wrcount)
    }

    /// Clock out the acknowledge bit for a received byte. Expects SDA high.
    fn acknak(&mut self, is_ack: bool) -> Result<(), Error> {
        if is_ack {
            self.lines.set_sda(false);
        }
        self.udelay(self.config.half_delay_up_us());
        if let Err(e) = self.sclhi() {
            self.err(format_args!("readbytes: ack/nak timeout"));
            return Err(e);
        }
        self.scllo();
        Ok(())
    }

    /// Read `msg.len()` bytes.
    ///
    /// A timeout mid-byte ends the read early and the short count is
    /// returned. For `RECV_LEN` messages the first byte extends the length.
    fn read_bytes(&mut self, msg: &mut Message<'_>) -> Result<usize, Error> {
        let flags = msg.flags();
        let no_ack = flags.contains(MessageFlags::NO_RD_ACK);
        let ack_last = msg.ack_last();
        let mut count = msg.len();
        let mut rdcount = 0;

        while count > 0 {
            let Ok(inval) = self.inb() else {
                break;
            };
            let Some(slot) = msg.read_slot(rdcount) else {
                break;
            };
            *slot = inval;
            rdcount += 1;
            count -= 1;

            if rdcount == 1 && flags.contains(MessageFlags::RECV_LEN) {
                let extra = usize::from(inval);
                if extra == 0 || extra > SMBUS_BLOCK_MAX || msg.len() + extra > msg.capacity() {
                    if !no_ack {
                        let _ = self.acknak(false);
                    }
                    self.err(format_args!("readbytes: invalid block length ({inval})"));
                    return Err(Error::Protocol);
                }
                count += extra;
                msg.extend_len(extra);
            }

            self.dbg(
                2,
                format_args!(
                    "readbytes: 0x{inval:02x} {}",
                    if no_ack {
                        "(no ack/nak)"
                    } else if count > 0 || ack_last {
                        "A"
                    } else {
                        "NA"
                    }
                ),
            );

            if !no_ack {
                self.acknak(count > 0 || ack_last)?;
            }
        }

        Ok(rdcount)
    }

    fn xfer_messages(&mut self, msgs: &mut [Message<'_>]) -> Result<usize, Error> {
        for (i, msg) in msgs.iter_mut().enumerate() {
            let nak_ok = msg.flags().contains(MessageFlags::IGNORE_NAK);

            if !msg.flags().contains(MessageFlags::NOSTART) {
                if i > 0 {
                    self.dbg(3, format_args!("emitting repeated start condition"));
                    self.repstart();
                }
                if let Err(e) = self.do_address(msg) {
                    if !nak_ok {
                        self.dbg(
                            1,
                            format_args!(
                                "NAK from device addr 0x{:02x} msg #{i}",
                                msg.addr()
                            ),
                        );
                        return Err(e);
                    }
                }
            }

            let moved = if msg.is_read() {
                let n = self.read_bytes(msg)?;
                if n >= 1 {
                    self.dbg(
                        2,
                        format_args!("read {n} byte{}", if n == 1 { "" } else { "s" }),
                    );
                }
                n
            } else {
                let n = self.send_bytes(msg)?;
                if n >= 1 {
                    self.dbg(
                        2,
                        format_args!("wrote {n} byte{}", if n == 1 { "" } else { "s" }),
                    );
                }
                n
            };
            if moved < msg.len() {
                return Err(Error::Io);
            }
        }

        Ok(msgs.len())
    }

    /// Run `msgs` as one combined transaction.
    ///
    /// Exactly one START and one STOP frame the transaction. Messages after
    /// the first are joined by a repeated START unless flagged `NOSTART`.
    /// The first failing message ends the transaction; STOP and the
    /// post-transfer hook still run.
    ///
    /// # Errors
    ///
    /// - the pre-transfer hook's error, before any line activity
    /// - [`Error::NoDevice`] or [`Error::Io`] when addressing fails
    /// - [`Error::Io`] on a data NAK or a short read
    /// - [`Error::Timeout`] when a write stalls on clock stretching
    /// - [`Error::Protocol`] on a bad `RECV_LEN` count
    pub fn master_xfer(&mut self, msgs: &mut [Message<'_>]) -> Result<usize, Error> {
        self.hooks.pre_xfer()?;

        self.dbg(3, format_args!("emitting start condition"));
        self.start();

        let ret = self.xfer_messages(msgs);

        self.dbg(3, format_args!("emitting stop condition"));
        self.stop();

        self.hooks.post_xfer();
        ret
    }

    #[must_use]
    pub fn functionality(&self) -> Functionality {
        Functionality::I2C
            | Functionality::NOSTART
            | Functionality::SMBUS_EMUL
            | Functionality::SMBUS_READ_BLOCK_DATA
            | Functionality::SMBUS_BLOCK_PROC_CALL
            | Functionality::TEN_BIT_ADDR
            | Functionality::PROTOCOL_MANGLING
    }

    /// Check that both lines idle high and follow what we drive.
    ///
    /// Run it on an idle bus, before the first transfer. SCL checks are
    /// skipped when the lines cannot sense SCL.
    ///
    /// # Errors
    ///
    /// [`Error::BusFault`] naming the first misbehaving line in the log.
    pub fn self_test(&mut self) -> Result<(), Error> {
        let sense = self.lines.scl_sense();
        if !sense {
            self.logger.log(
                LogLevel::Info,
                format_args!("testing SDA only, SCL is not readable"),
            );
        }

        let (sda, scl) = self.sample();
        if !scl || !sda {
            self.err(format_args!("bus seems to be busy (scl={scl}, sda={sda})"));
            return self.self_test_bailout();
        }

        self.sdalo();
        let (sda, scl) = self.sample();
        if sda {
            self.err(format_args!("SDA stuck high!"));
            return self.self_test_bailout();
        }
        if !scl {
            self.err(format_args!("SCL unexpected low while pulling SDA low!"));
            return self.self_test_bailout();
        }

        self.sdahi();
        let (sda, scl) = self.sample();
        if !sda {
            self.err(format_args!("SDA stuck low!"));
            return self.self_test_bailout();
        }
        if !scl {
            self.err(format_args!("SCL unexpected low while releasing SDA!"));
            return self.self_test_bailout();
        }

        self.scllo();
        let (sda, scl) = self.sample();
        if scl && sense {
            self.err(format_args!("SCL stuck high!"));
            return self.self_test_bailout();
        }
        if !sda {
            self.err(format_args!("SDA unexpected low while pulling SCL low!"));
            return self.self_test_bailout();
        }

        if self.sclhi().is_err() || !self.sample().1 {
            self.err(format_args!("SCL stuck low!"));
            return self.self_test_bailout();
        }
        if !self.sample().0 {
            self.err(format_args!("SDA unexpected low while releasing SCL!"));
            return self.self_test_bailout();
        }

        self.logger.log(LogLevel::Info, format_args!("bus test passed"));
        Ok(())
    }

    fn sample(&mut self) -> (bool, bool) {
        let sda = self.lines.get_sda();
        let scl = if self.lines.scl_sense() {
            self.lines.get_scl()
        } else {
            true
        };
        (sda, scl)
    }

    fn self_test_bailout(&mut self) -> Result<(), Error> {
        self.lines.set_sda(true);
        self.lines.set_scl(true);
        Err(Error::BusFault)
    }

    /// Clock a target stuck mid-byte until it lets go of SDA, then STOP.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if SCL never rises, [`Error::BusFault`] if SDA is
    /// still low after nine pulses.
    pub fn recover_bus(&mut self) -> Result<(), Error> {
        self.lines.set_sda(true);
        self.sclhi()?;

        let mut pulses = 0;
        while !self.lines.get_sda() && pulses < RECOVERY_PULSES {
            self.scllo();
            self.sclhi()?;
            pulses += 1;
        }
        self.dbg(1, format_args!("bus recovery used {pulses} SCL pulses"));

        if !self.lines.get_sda() {
            self.err(format_args!("SDA still held low after recovery"));
            return Err(Error::BusFault);
        }

        // Leave a clean STOP so targets resynchronise.
        self.scllo();
        self.stop();
        Ok(())
    }
}

impl<L, D, T, H, G> I2cAlgorithm for BitAdapter<L, D, T, H, G>
where
    L: BitLines,
    D: DelayNs,
    T: Timebase,
    H: XferHooks,
    G: Logger,
{
    type Error = Error;

    fn master_xfer(&mut self, msgs: &mut [Message<'_>]) -> Result<usize, Self::Error> {
        BitAdapter::master_xfer(self, msgs)
    }

    fn functionality(&self) -> Functionality {
        BitAdapter::functionality(self)
    }

    fn recover_bus(&mut self) -> Result<(), Self::Error> {
        BitAdapter::recover_bus(self)
    }
}
