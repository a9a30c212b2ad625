use std::cmp::{self, Ordering};
use std::convert::TryFrom;
use std::fmt::{self, Debug, Display};

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum IntPriv {
    /// Always non-less than zero.
    PosInt(u64),
    /// Magnitude of a value less than zero. Always nonzero.
    NegInt(u64),
}

/// Represents a key integer, whether signed or unsigned.
///
/// The representable range is −(2⁶⁴−1) ..= 2⁶⁴−1, matching what the wire
/// varint can carry in either sign. Construct one with the `From` trait from
/// any primitive integer up to 64 bits, or fallibly from `i128`/`u128`.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Integer {
    n: IntPriv,
}

impl Integer {
    /// Minimum possible integer that can be represented: −(2⁶⁴−1).
    pub fn min_value() -> Integer {
        Integer {
            n: IntPriv::NegInt(u64::MAX),
        }
    }

    /// Maximum possible integer that can be represented: 2⁶⁴−1.
    pub fn max_value() -> Integer {
        Integer {
            n: IntPriv::PosInt(u64::MAX),
        }
    }

    /// Returns `true` if the integer is less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        matches!(self.n, IntPriv::NegInt(..))
    }

    /// Returns the integer represented as `i64` if possible, or else `None`.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self.n {
            IntPriv::PosInt(n) => i64::try_from(n).ok(),
            IntPriv::NegInt(n) if n <= (i64::MAX as u64) + 1 => Some((n as i64).wrapping_neg()),
            IntPriv::NegInt(..) => None,
        }
    }

    /// Returns the integer represented as `u64` if possible, or else `None`.
    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        match self.n {
            IntPriv::PosInt(n) => Some(n),
            IntPriv::NegInt(..) => None,
        }
    }

    /// Returns the integer as `i128`. Always possible.
    #[inline]
    pub fn as_i128(&self) -> i128 {
        match self.n {
            IntPriv::PosInt(n) => n as i128,
            IntPriv::NegInt(n) => -(n as i128),
        }
    }

    /// The wire magnitude: the value itself when non-negative, its negation
    /// otherwise.
    #[inline]
    pub(crate) fn magnitude(&self) -> u64 {
        match self.n {
            IntPriv::PosInt(n) => n,
            IntPriv::NegInt(n) => n,
        }
    }

    pub(crate) fn from_parts(negative: bool, magnitude: u64) -> Integer {
        if negative && magnitude != 0 {
            Integer {
                n: IntPriv::NegInt(magnitude),
            }
        } else {
            Integer {
                n: IntPriv::PosInt(magnitude),
            }
        }
    }
}

impl Default for Integer {
    fn default() -> Self {
        Self {
            n: IntPriv::PosInt(0),
        }
    }
}

impl cmp::Ord for Integer {
    fn cmp(&self, other: &Integer) -> Ordering {
        match (self.n, other.n) {
            (IntPriv::NegInt(lhs), IntPriv::NegInt(ref rhs)) => rhs.cmp(&lhs),
            (IntPriv::NegInt(_), IntPriv::PosInt(_)) => Ordering::Less,
            (IntPriv::PosInt(_), IntPriv::NegInt(_)) => Ordering::Greater,
            (IntPriv::PosInt(lhs), IntPriv::PosInt(ref rhs)) => lhs.cmp(rhs),
        }
    }
}

impl cmp::PartialOrd for Integer {
    fn partial_cmp(&self, other: &Integer) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        Debug::fmt(&self.n, fmt)
    }
}

impl Display for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        Display::fmt(&self.as_i128(), fmt)
    }
}

macro_rules! impl_from_unsigned {
    ($t: ty) => {
        impl From<$t> for Integer {
            fn from(n: $t) -> Self {
                Integer {
                    n: IntPriv::PosInt(n as u64),
                }
            }
        }
    };
}

macro_rules! impl_from_signed {
    ($t: ty) => {
        impl From<$t> for Integer {
            fn from(n: $t) -> Self {
                if n < 0 {
                    Integer {
                        n: IntPriv::NegInt((n as i64).unsigned_abs()),
                    }
                } else {
                    Integer {
                        n: IntPriv::PosInt(n as u64),
                    }
                }
            }
        }
    };
}

impl_from_unsigned!(u8);
impl_from_unsigned!(u16);
impl_from_unsigned!(u32);
impl_from_unsigned!(u64);
impl_from_unsigned!(usize);
impl_from_signed!(i8);
impl_from_signed!(i16);
impl_from_signed!(i32);
impl_from_signed!(i64);
impl_from_signed!(isize);

impl TryFrom<i128> for Integer {
    type Error = Error;
    fn try_from(n: i128) -> Result<Self> {
        if n > u64::MAX as i128 || n < -(u64::MAX as i128) {
            return Err(Error::OutOfRange(format!(
                "integer {} exceeds the ±(2⁶⁴−1) varint range",
                n
            )));
        }
        Ok(Integer::from_parts(n < 0, n.unsigned_abs() as u64))
    }
}

impl TryFrom<u128> for Integer {
    type Error = Error;
    fn try_from(n: u128) -> Result<Self> {
        let n = u64::try_from(n).map_err(|_| {
            Error::OutOfRange(format!("integer {} exceeds the 2⁶⁴−1 varint range", n))
        })?;
        Ok(Integer::from(n))
    }
}

macro_rules! impl_try_into {
    ($t: ty) => {
        impl TryFrom<Integer> for $t {
            type Error = Integer;
            fn try_from(v: Integer) -> Result<Self, Self::Error> {
                <$t>::try_from(v.as_i128()).map_err(|_| v)
            }
        }
    };
}

impl_try_into!(u8);
impl_try_into!(u16);
impl_try_into!(u32);
impl_try_into!(u64);
impl_try_into!(usize);
impl_try_into!(i8);
impl_try_into!(i16);
impl_try_into!(i32);
impl_try_into!(i64);
impl_try_into!(isize);

use serde::{
    de::{Deserialize, Deserializer},
    ser::{Serialize, Serializer},
};

impl Serialize for Integer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.n {
            IntPriv::PosInt(v) => serializer.serialize_u64(v),
            IntPriv::NegInt(_) => match self.as_i64() {
                Some(v) => serializer.serialize_i64(v),
                None => serializer.serialize_i128(self.as_i128()),
            },
        }
    }
}

impl<'de> Deserialize<'de> for Integer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IntVisitor;
        impl<'de> serde::de::Visitor<'de> for IntVisitor {
            type Value = Integer;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
                write!(fmt, "an integer")
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Integer::from(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Integer::from(v))
            }

            fn visit_i128<E: serde::de::Error>(self, v: i128) -> Result<Self::Value, E> {
                Integer::try_from(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(IntVisitor)
    }
}
