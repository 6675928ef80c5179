//! Time wrappers: FILETIME ([MS-DTYP] 2.3.3) and the legacy 32-bit UTIME.

use std::fmt::Display;

use binrw::prelude::*;
use time::PrimitiveDateTime;
use time::macros::datetime;

/// 100-nanosecond intervals since January 1, 1601 (UTC).
#[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FileTime {
    value: u64,
}

impl FileTime {
    const EPOCH: PrimitiveDateTime = datetime!(1601-01-01 00:00:00);
    const SCALE_VALUE_TO_NANOS: u64 = 100;

    /// A constant representing a zero FileTime value.
    pub const ZERO: FileTime = FileTime { value: 0 };

    /// Returns true if the FileTime value is zero.
    ///
    /// This is usually an indicator of "no time" or "not set".
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    pub fn date_time(&self) -> PrimitiveDateTime {
        let duration = core::time::Duration::from_nanos(self.value * Self::SCALE_VALUE_TO_NANOS);
        Self::EPOCH + duration
    }
}

impl Display for FileTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.date_time().fmt(f)
    }
}

impl std::fmt::Debug for FileTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FileTime").field(&self.date_time()).finish()
    }
}

impl From<u64> for FileTime {
    fn from(value: u64) -> Self {
        Self { value }
    }
}

impl From<FileTime> for u64 {
    fn from(val: FileTime) -> Self {
        val.value
    }
}

impl From<PrimitiveDateTime> for FileTime {
    fn from(dt: PrimitiveDateTime) -> Self {
        let duration = dt - Self::EPOCH;
        Self {
            value: duration.whole_nanoseconds() as u64 / Self::SCALE_VALUE_TO_NANOS,
        }
    }
}

impl From<FileTime> for PrimitiveDateTime {
    fn from(val: FileTime) -> Self {
        val.date_time()
    }
}

/// Seconds since January 1, 1970 (UTC), as carried by legacy SMB commands.
///
/// The value `0xFFFFFFFF` means "no time specified".
#[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Utime {
    value: u32,
}

impl Utime {
    pub const UNSPECIFIED: Utime = Utime { value: 0xffffffff };

    pub fn is_unspecified(&self) -> bool {
        self.value == Self::UNSPECIFIED.value
    }

    pub fn date_time(&self) -> Option<time::OffsetDateTime> {
        if self.is_unspecified() {
            return None;
        }
        time::OffsetDateTime::from_unix_timestamp(self.value as i64).ok()
    }
}

impl Default for Utime {
    fn default() -> Self {
        Self::UNSPECIFIED
    }
}

impl std::fmt::Debug for Utime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.date_time() {
            Some(dt) => f.debug_tuple("Utime").field(&dt).finish(),
            None => f.write_str("Utime(unspecified)"),
        }
    }
}

impl From<u32> for Utime {
    fn from(value: u32) -> Self {
        Self { value }
    }
}

impl From<Utime> for u32 {
    fn from(val: Utime) -> Self {
        val.value
    }
}
