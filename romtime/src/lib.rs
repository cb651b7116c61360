// Licensed under the Apache-2.0 license

//! Console output for code that runs before any OS or heap exists.
//!
//! A single `core::fmt::Write` sink is registered once at startup; all
//! logging macros in this crate write to it and are silently dropped until
//! then.

#![cfg_attr(not(test), no_std)]
#![allow(static_mut_refs)]

use core::fmt::{Arguments, Display, Write};

static mut WRITER: Option<&'static mut dyn Write> = None;
static mut MAX_LEVEL: Level = Level::Info;

/// Verbosity of a log line. Lower values are more severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl Level {
    pub const fn tag(self) -> &'static str {
        match self {
            Level::Error => "ERR",
            Level::Warn => "WRN",
            Level::Info => "INF",
            Level::Debug => "DBG",
        }
    }
}

/// Sets the global backing writer for the logging macros.
///
/// Lines above `max_level` are discarded before formatting.
pub fn set_printer(writer: &'static mut dyn Write, max_level: Level) {
    unsafe {
        WRITER = Some(writer);
        MAX_LEVEL = max_level;
    }
}

pub fn enabled(level: Level) -> bool {
    unsafe { WRITER.is_some() && level <= MAX_LEVEL }
}

#[doc(hidden)]
pub fn write_fmt(args: Arguments) {
    if let Some(writer) = unsafe { WRITER.as_mut() } {
        let _ = writer.write_fmt(args);
    }
}

#[doc(hidden)]
pub fn write_line(level: Level, args: Arguments) {
    if !enabled(level) {
        return;
    }
    if let Some(writer) = unsafe { WRITER.as_mut() } {
        let _ = write!(writer, "[{}] ", level.tag());
        let _ = writer.write_fmt(args);
        let _ = writer.write_str("\n");
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::write_fmt(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => {
        $crate::write_line($crate::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)*) => {
        $crate::write_line($level, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!($crate::Level::Error, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!($crate::Level::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!($crate::Level::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!($crate::Level::Debug, $($arg)*)
    };
}

/// Upper-case hex rendering of a byte string, e.g. a digest.
pub struct HexBytes<'a>(pub &'a [u8]);

impl Display for HexBytes<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        for &x in self.0.iter() {
            f.write_char(DIGITS[(x >> 4) as usize] as char)?;
            f.write_char(DIGITS[(x & 0xf) as usize] as char)?;
        }
        Ok(())
    }
}

pub struct HexWord(pub u32);

impl Display for HexWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        HexBytes(&self.0.to_be_bytes()).fmt(f)
    }
}
