// Licensed under the Apache-2.0 license

//! Shared logging plumbing.
//!
//! Drivers take a [`Logger`] type parameter that defaults to [`NoOpLogger`],
//! so production builds pay nothing unless a sink is wired in. A
//! [`WriterLogger`] formats records onto any `embedded_io::Write` sink, which
//! is usually a UART.

use core::fmt;

/// Severity of a log record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for driver diagnostics.
pub trait Logger {
    fn log(&mut self, level: LogLevel, args: fmt::Arguments<'_>);
}

impl<G: Logger + ?Sized> Logger for &mut G {
    fn log(&mut self, level: LogLevel, args: fmt::Arguments<'_>) {
        (**self).log(level, args);
    }
}

/// Logger that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&mut self, _level: LogLevel, _args: fmt::Arguments<'_>) {}
}

/// Logger writing one line per record to an `embedded_io::Write` sink.
///
/// Records are formatted as `[LEVEL] prefix: message` followed by `\r\n`.
/// Write errors are dropped; logging must never fail a bus transfer.
pub struct WriterLogger<W> {
    writer: W,
    prefix: &'static str,
    max_level: LogLevel,
}

impl<W: embedded_io::Write> WriterLogger<W> {
    pub fn new(writer: W, prefix: &'static str) -> Self {
        Self {
            writer,
            prefix,
            max_level: LogLevel::Debug,
        }
    }

    #[must_use]
    pub fn max_level(mut self, level: LogLevel) -> Self {
        self.max_level = level;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: embedded_io::Write> Logger for WriterLogger<W> {
    fn log(&mut self, level: LogLevel, args: fmt::Arguments<'_>) {
        if level > self.max_level {
            return;
        }
        let _ = write!(self.writer, "[{}] {}: {}\r\n", level, self.prefix, args);
    }
}
