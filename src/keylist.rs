//! Splitting flat byte strings into logical keys.
//!
//! Several logical keys can share one physical key by joining their encoded
//! tuples with `Sep` bytes. `KeyList` performs the reverse split using the
//! skip machinery, without decoding any element.

use std::ops::Range;

use crate::element::{skip_element, Skip};
use crate::error::{Error, Result};
use crate::key::Key;
use crate::source::{MemSource, Region};

/// An ordered sequence of logical keys split out of one physical key.
/// Never empty: a physical key equal to its prefix yields one empty key.
#[derive(Clone, Debug)]
pub struct KeyList {
    keys: Vec<Key>,
}

/// Byte ranges of each `Sep`-separated segment. A trailing `Sep` produces
/// no trailing empty segment; empty input produces one empty segment.
fn split_segments(bytes: &[u8]) -> Result<Vec<Range<usize>>> {
    let mut segments = Vec::new();
    let mut cursor = bytes;
    let mut seg_start = 0;
    while !cursor.is_empty() {
        match skip_element(&mut cursor)? {
            Skip::Element => {}
            Skip::Sep => {
                // The Sep byte itself belongs to neither segment.
                let end = bytes.len() - cursor.len() - 1;
                segments.push(seg_start..end);
                seg_start = bytes.len() - cursor.len();
            }
        }
    }
    if seg_start < bytes.len() {
        segments.push(seg_start..bytes.len());
    }
    if segments.is_empty() {
        segments.push(0..0);
    }
    Ok(segments)
}

impl KeyList {
    /// Split `raw` into Private keys after verifying and stripping `prefix`.
    pub fn from_raw(raw: &[u8], prefix: &[u8]) -> Result<KeyList> {
        let rest = raw.strip_prefix(prefix).ok_or(Error::PrefixMismatch)?;
        let keys = split_segments(rest)?
            .into_iter()
            .map(|seg| Key::from_raw(&rest[seg], b""))
            .collect::<Result<Vec<Key>>>()?;
        Ok(KeyList { keys })
    }

    /// Split an engine-supplied region after verifying and stripping
    /// `prefix`. Keys over a source-aliased region come out Shared; keys
    /// over an owned region come out Private.
    pub fn from_region(region: &Region, prefix: &[u8]) -> Result<KeyList> {
        match region {
            Region::Owned(raw) => KeyList::from_raw(raw, prefix),
            Region::Source { source, range } => {
                let (ok, segments) = source.with_range(range.clone(), |bytes| {
                    if !bytes.starts_with(prefix) {
                        return (false, Ok(Vec::new()));
                    }
                    (true, split_segments(&bytes[prefix.len()..]))
                })?;
                if !ok {
                    return Err(Error::PrefixMismatch);
                }
                let base = range.start + prefix.len();
                KeyList::shared(source, segments?, base)
            }
        }
    }

    fn shared(source: &MemSource, segments: Vec<Range<usize>>, base: usize) -> Result<KeyList> {
        let keys = segments
            .into_iter()
            .map(|seg| Key::shared(source, base + seg.start..base + seg.end))
            .collect::<Result<Vec<Key>>>()?;
        Ok(KeyList { keys })
    }

    pub fn first(&self) -> &Key {
        &self.keys[0]
    }

    pub fn into_keys(self) -> Vec<Key> {
        self.keys
    }
}

impl std::ops::Deref for KeyList {
    type Target = [Key];
    fn deref(&self) -> &[Key] {
        &self.keys
    }
}

impl<'a> IntoIterator for &'a KeyList {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;
    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl IntoIterator for KeyList {
    type Item = Key;
    type IntoIter = std::vec::IntoIter<Key>;
    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::Element;
    use crate::key::StorageMode;
    use crate::tuple::encode_list;

    fn tuples() -> Vec<Vec<Element>> {
        vec![
            vec![Element::from(1u8), Element::from("a")],
            vec![Element::from(2u8)],
            vec![Element::Null],
        ]
    }

    #[test]
    fn splits_encoded_lists() {
        let raw = encode_list(&tuples());
        let list = KeyList::from_raw(&raw, b"").unwrap();
        assert_eq!(list.len(), 3);
        for (key, tuple) in list.iter().zip(tuples()) {
            assert_eq!(key.to_tuple().unwrap(), tuple);
        }
    }

    #[test]
    fn prefix_verified() {
        let raw = encode_list(&tuples());
        let mut prefixed = b"idx".to_vec();
        prefixed.extend_from_slice(&raw);
        let list = KeyList::from_raw(&prefixed, b"idx").unwrap();
        assert_eq!(list.len(), 3);
        assert!(matches!(
            KeyList::from_raw(&prefixed, b"other"),
            Err(Error::PrefixMismatch)
        ));
    }

    #[test]
    fn exact_prefix_is_one_empty_key() {
        let list = KeyList::from_raw(b"idx", b"idx").unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.first().is_empty());
    }

    #[test]
    fn trailing_sep_adds_nothing() {
        let mut raw = encode_list(&tuples()[..1]);
        raw.push(crate::kind::Kind::Sep.into_u8());
        let list = KeyList::from_raw(&raw, b"").unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn leading_sep_is_an_empty_key() {
        let mut raw = vec![crate::kind::Kind::Sep.into_u8()];
        raw.extend_from_slice(&encode_list(&tuples()[..1]));
        let list = KeyList::from_raw(&raw, b"").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].is_empty());
    }

    #[test]
    fn corrupt_input_surfaces() {
        assert!(KeyList::from_raw(&[0x00], b"").is_err());
        assert!(KeyList::from_raw(&[0x15], b"").is_err());
    }

    #[test]
    fn source_regions_make_shared_keys() {
        let raw = encode_list(&tuples());
        let mut prefixed = b"p".to_vec();
        prefixed.extend_from_slice(&raw);
        let source = MemSource::new(prefixed);
        let region = source.slice(0..source.len()).unwrap();

        let list = KeyList::from_region(&region, b"p").unwrap();
        assert_eq!(list.len(), 3);
        let expected: Vec<Vec<Element>> = tuples();
        for (key, tuple) in list.iter().zip(&expected) {
            assert_eq!(key.storage_mode(), StorageMode::Shared);
            assert_eq!(&key.to_tuple().unwrap(), tuple);
        }

        // Invalidation flips every key in the list at once, preserving
        // content.
        source.invalidate();
        for (key, tuple) in list.iter().zip(&expected) {
            assert_eq!(key.storage_mode(), StorageMode::Copied);
            assert_eq!(&key.to_tuple().unwrap(), tuple);
        }
    }
}
