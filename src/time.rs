use std::cmp;
use std::convert::TryFrom;
use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{Error, Result};

/// Granularity of the stored UTC offset.
pub const OFFSET_QUANTUM_SECS: i32 = 15 * 60;

/// Added to the quantised offset to produce an unsigned 7-bit field.
const OFFSET_BIAS: i32 = 64;

/// Largest epoch-millisecond magnitude whose composite fits in an `i64`.
const MAX_UTC_MILLIS: i64 = i64::MAX >> 7;

/// A key timestamp: a millisecond-precision UTC instant plus a UTC offset
/// quantised to 15-minute units.
///
/// The offset participates in equality and ordering, because it is part of
/// the wire form: two `Time`s at the same instant but with different offsets
/// encode to different bytes, ordered by offset. Offsets cover ±64 quanta
/// (i.e. [−16h, +16h)); anything outside that range is rejected.
///
/// Sub-millisecond precision is dropped on construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    /// Milliseconds since the Unix epoch, in UTC.
    utc_millis: i64,
    /// Quantised, biased UTC offset in [0, 128).
    offset_q: u8,
}

impl Time {
    /// Construct from an instant and a UTC offset in seconds. The offset is
    /// rounded to the nearest 15-minute multiple.
    pub fn from_utc_millis(utc_millis: i64, offset_secs: i32) -> Result<Time> {
        if utc_millis > MAX_UTC_MILLIS || utc_millis < -MAX_UTC_MILLIS {
            return Err(Error::OutOfRange(format!(
                "timestamp {}ms exceeds the encodable range",
                utc_millis
            )));
        }
        let q = (offset_secs + OFFSET_QUANTUM_SECS / 2).div_euclid(OFFSET_QUANTUM_SECS)
            + OFFSET_BIAS;
        if !(0..128).contains(&q) {
            return Err(Error::OutOfRange(format!(
                "UTC offset {}s exceeds ±16 hours",
                offset_secs
            )));
        }
        Ok(Time {
            utc_millis,
            offset_q: q as u8,
        })
    }

    /// Construct from a datetime carrying an explicit offset.
    pub fn new(dt: DateTime<FixedOffset>) -> Result<Time> {
        Time::from_utc_millis(dt.timestamp_millis(), dt.offset().local_minus_utc())
    }

    /// Interpret a timezone-naive datetime in the process's local timezone.
    /// An ambiguous local time (e.g. inside a DST fold) resolves to the
    /// earlier instant.
    pub fn from_local_naive(naive: NaiveDateTime) -> Result<Time> {
        let local = Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| {
                Error::OutOfRange(format!("local time {} does not exist", naive))
            })?;
        Time::new(local.fixed_offset())
    }

    /// The current time, at UTC offset zero.
    pub fn now() -> Time {
        Time::from(Utc::now())
    }

    /// Milliseconds since the Unix epoch, in UTC.
    pub fn utc_millis(&self) -> i64 {
        self.utc_millis
    }

    /// The attached UTC offset in seconds. Always a 15-minute multiple.
    pub fn offset_secs(&self) -> i32 {
        (self.offset_q as i32 - OFFSET_BIAS) * OFFSET_QUANTUM_SECS
    }

    /// Reconstruct the datetime with its offset attached. Fails only for
    /// wire values outside chrono's representable range.
    pub fn to_datetime(&self) -> Result<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.offset_secs())
            .ok_or_else(|| Error::OutOfRange(format!("offset {}s", self.offset_secs())))?;
        match Utc.timestamp_millis_opt(self.utc_millis) {
            chrono::LocalResult::Single(utc) => Ok(utc.with_timezone(&offset)),
            _ => Err(Error::OutOfRange(format!(
                "timestamp {}ms is outside the datetime range",
                self.utc_millis
            ))),
        }
    }

    /// The signed wire composite: `(utc_millis << 7) | offset_q`.
    pub(crate) fn composite(&self) -> i64 {
        (self.utc_millis << 7) | self.offset_q as i64
    }

    /// Split a wire composite back into instant and offset. The arithmetic
    /// shift and low-bit mask are exact inverses of [`composite`] for both
    /// signs.
    ///
    /// [`composite`]: Self::composite
    pub(crate) fn from_composite(c: i64) -> Time {
        Time {
            utc_millis: c >> 7,
            offset_q: (c & 0x7f) as u8,
        }
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(dt: DateTime<Utc>) -> Time {
        // chrono's representable range is well inside MAX_UTC_MILLIS.
        Time {
            utc_millis: dt.timestamp_millis(),
            offset_q: OFFSET_BIAS as u8,
        }
    }
}

impl TryFrom<DateTime<FixedOffset>> for Time {
    type Error = Error;
    fn try_from(dt: DateTime<FixedOffset>) -> Result<Time> {
        Time::new(dt)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_datetime() {
            Ok(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Err(_) => write!(f, "{}ms{:+}s", self.utc_millis, self.offset_secs()),
        }
    }
}

impl cmp::PartialEq<DateTime<FixedOffset>> for Time {
    fn eq(&self, other: &DateTime<FixedOffset>) -> bool {
        Time::new(*other).map_or(false, |t| *self == t)
    }
}
