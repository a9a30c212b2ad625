//! Element kind tags.
//!
//! The tag byte is the first byte of every encoded element and doubles as the
//! element's sort class: tags are assigned so that unsigned byte comparison of
//! two encoded elements of different kinds matches the cross-kind element
//! order. The values are stable and observable in persisted keys.

/// Element kind tags. For internal use only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Kind {
    Null,
    NegInt,
    PosInt,
    Bool,
    Bytes,
    Text,
    Uuid,
    NegTime,
    Time,
    Sep,
}

impl Kind {
    /// Construct a kind from a tag byte. Returns `None` for bytes outside the
    /// tag table.
    pub fn from_u8(n: u8) -> Option<Kind> {
        match n {
            0x0f => Some(Kind::Null),
            0x14 => Some(Kind::NegInt),
            0x15 => Some(Kind::PosInt),
            0x1e => Some(Kind::Bool),
            0x28 => Some(Kind::Bytes),
            0x32 => Some(Kind::Text),
            0x5a => Some(Kind::Uuid),
            0x5b => Some(Kind::NegTime),
            0x5c => Some(Kind::Time),
            0x66 => Some(Kind::Sep),
            _ => None,
        }
    }

    /// Convert a kind into its tag byte.
    pub fn into_u8(self) -> u8 {
        match self {
            Kind::Null => 0x0f,
            Kind::NegInt => 0x14,
            Kind::PosInt => 0x15,
            Kind::Bool => 0x1e,
            Kind::Bytes => 0x28,
            Kind::Text => 0x32,
            Kind::Uuid => 0x5a,
            Kind::NegTime => 0x5b,
            Kind::Time => 0x5c,
            Kind::Sep => 0x66,
        }
    }
}

impl From<Kind> for u8 {
    fn from(val: Kind) -> u8 {
        val.into_u8()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tag_table_roundtrip() {
        for n in 0..=255u8 {
            if let Some(kind) = Kind::from_u8(n) {
                assert_eq!(kind.into_u8(), n);
            }
        }
    }

    #[test]
    fn tag_order_matches_sort_class() {
        let order = [
            Kind::Null,
            Kind::NegInt,
            Kind::PosInt,
            Kind::Bool,
            Kind::Bytes,
            Kind::Text,
            Kind::Uuid,
            Kind::NegTime,
            Kind::Time,
            Kind::Sep,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].into_u8() < pair[1].into_u8());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn unknown_tags_rejected() {
        for n in [0x00u8, 0x16, 0x33, 0x5d, 0x67, 0x80, 0xff] {
            assert_eq!(Kind::from_u8(n), None);
        }
    }
}
