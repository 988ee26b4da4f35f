// Licensed under the Apache-2.0 license

//! Transfer messages.
//!
//! A [`Message`] is one segment of a combined transaction: a target address,
//! protocol flags and a caller-owned buffer. The buffer variant fixes the
//! direction, so a read always has somewhere to land.

use crate::i2c::common::MessageFlags;

/// Caller-owned payload of a message.
#[derive(Debug)]
pub(crate) enum Buffer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

#[derive(Debug)]
pub struct Message<'a> {
    addr: u16,
    flags: MessageFlags,
    len: usize,
    buf: Buffer<'a>,
    /// Acknowledge the final byte too; the next message continues the read.
    ack_last: bool,
}

impl<'a> Message<'a> {
    /// Write all of `data` to `addr`.
    pub fn write(addr: u16, data: &'a [u8]) -> Self {
        Self {
            addr,
            flags: MessageFlags::empty(),
            len: data.len(),
            buf: Buffer::Write(data),
            ack_last: false,
        }
    }

    /// Fill all of `buf` from `addr`.
    pub fn read(addr: u16, buf: &'a mut [u8]) -> Self {
        Self {
            addr,
            flags: MessageFlags::empty(),
            len: buf.len(),
            buf: Buffer::Read(buf),
            ack_last: false,
        }
    }

    /// SMBus block read: the target sends a count byte, then that many bytes.
    ///
    /// The message starts one byte long and grows by the received count, so
    /// `buf` should hold `SMBUS_BLOCK_MAX + 1` bytes. After the transfer
    /// [`Message::len`] reports the number of bytes stored, count included.
    pub fn block_read(addr: u16, buf: &'a mut [u8]) -> Self {
        Self {
            addr,
            flags: MessageFlags::RECV_LEN,
            len: buf.len().min(1),
            buf: Buffer::Read(buf),
            ack_last: false,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: MessageFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn addr(&self) -> u16 {
        self.addr
    }

    #[must_use]
    pub fn flags(&self) -> MessageFlags {
        self.flags
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self.buf, Buffer::Read(_))
    }

    /// Bytes to move. Grows during a `RECV_LEN` read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the caller's buffer, the ceiling for `len`.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match &self.buf {
            Buffer::Read(buf) => buf.len(),
            Buffer::Write(buf) => buf.len(),
        }
    }

    /// The first `len` bytes of the buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        let buf: &[u8] = match &self.buf {
            Buffer::Read(buf) => buf,
            Buffer::Write(buf) => buf,
        };
        buf.get(..self.len).unwrap_or(buf)
    }

    pub(crate) fn ack_last(&self) -> bool {
        self.ack_last
    }

    /// Keep the final byte acknowledged so a following `NOSTART` read
    /// picks up the same byte stream.
    pub(crate) fn set_ack_last(&mut self) {
        self.ack_last = self.is_read();
    }

    pub(crate) fn extend_len(&mut self, extra: usize) {
        self.len += extra;
    }

    pub(crate) fn read_slot(&mut self, index: usize) -> Option<&mut u8> {
        match &mut self.buf {
            Buffer::Read(buf) => buf.get_mut(index),
            Buffer::Write(_) => None,
        }
    }
}
