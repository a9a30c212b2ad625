//! The immutable Key value type.
//!
//! A `Key` owns or aliases the encoded form of one tuple. Element access
//! decodes on demand; comparison, hashing and ordering work directly on the
//! bytes, which by construction order the same way the tuples do.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::convert::TryFrom;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::rc::Rc;

use crate::bound::next_greater_bytes;
use crate::element::{read_element, skip_element, write_element, Element, Skip};
use crate::error::{Error, Result};
use crate::source::{MemSource, Region, Sink};
use crate::tuple::encode_tuple_into;
use crate::MAX_KEY_LEN;

/// How a Key's byte buffer is held.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageMode {
    /// The buffer is owned by this key alone.
    Private,
    /// The buffer aliases a [`MemSource`]; the key is subscribed for
    /// invalidation.
    Shared,
    /// Former Shared whose source invalidated; the key now owns a copy.
    Copied,
}

enum Storage {
    Private(Box<[u8]>),
    Shared {
        source: MemSource,
        range: Range<usize>,
    },
    Copied(Box<[u8]>),
}

pub(crate) struct KeyInner {
    storage: RefCell<Storage>,
    hash: Cell<Option<u64>>,
}

impl Sink for KeyInner {
    fn materialize(&self) {
        let mut storage = self.storage.borrow_mut();
        if let Storage::Shared { source, range } = &*storage {
            // The source buffer is still intact while invalidation runs, so
            // the range is in bounds and the copy is bytewise identical.
            let copied = source
                .with_range(range.clone(), |b| b.to_vec())
                .unwrap_or_default();
            *storage = Storage::Copied(copied.into_boxed_slice());
        }
    }
}

/// An immutable encoded tuple. Cheap to clone; compares, hashes and orders
/// by its encoded bytes.
#[derive(Clone)]
pub struct Key {
    inner: Rc<KeyInner>,
}

fn check_len(len: usize) -> Result<()> {
    if len > MAX_KEY_LEN {
        return Err(Error::KeyTooLong { actual: len });
    }
    Ok(())
}

impl Key {
    /// Encode a tuple of elements into a new Private key.
    pub fn new(elements: &[Element]) -> Result<Key> {
        let mut buf = Vec::with_capacity(16 * elements.len());
        encode_tuple_into(&mut buf, elements);
        Key::from_vec(buf)
    }

    /// Take ownership of already-encoded bytes. Only the length is checked;
    /// content is validated lazily on element access.
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Result<Key> {
        check_len(bytes.len())?;
        Ok(Key {
            inner: Rc::new(KeyInner {
                storage: RefCell::new(Storage::Private(bytes.into_boxed_slice())),
                hash: Cell::new(None),
            }),
        })
    }

    /// Build a Private key from raw encoded bytes, verifying and stripping
    /// `prefix`.
    pub fn from_raw(raw: &[u8], prefix: &[u8]) -> Result<Key> {
        let rest = raw.strip_prefix(prefix).ok_or(Error::PrefixMismatch)?;
        Key::from_vec(rest.to_vec())
    }

    /// Build a key from an engine-supplied region, verifying and stripping
    /// `prefix`. A source-aliased region yields a Shared key subscribed to
    /// the source; an owned region yields a Private key.
    pub fn from_region(region: &Region, prefix: &[u8]) -> Result<Key> {
        match region {
            Region::Owned(raw) => Key::from_raw(raw, prefix),
            Region::Source { source, range } => {
                let ok = source.with_range(range.clone(), |b| b.starts_with(prefix))?;
                if !ok {
                    return Err(Error::PrefixMismatch);
                }
                Key::shared(source, range.start + prefix.len()..range.end)
            }
        }
    }

    /// A Shared key over `range` of `source`, subscribed for invalidation.
    pub(crate) fn shared(source: &MemSource, range: Range<usize>) -> Result<Key> {
        check_len(range.len())?;
        if range.end > source.len() {
            return Err(Error::OutOfRange(format!(
                "key range {}..{} exceeds source of {} bytes",
                range.start,
                range.end,
                source.len()
            )));
        }
        let inner = Rc::new(KeyInner {
            storage: RefCell::new(Storage::Shared {
                source: source.clone(),
                range,
            }),
            hash: Cell::new(None),
        });
        let inner_dyn: Rc<dyn Sink> = inner.clone();
        let sink: std::rc::Weak<dyn Sink> = Rc::downgrade(&inner_dyn);
        source.subscribe(sink);
        Ok(Key { inner })
    }

    /// Parse a key from its [`to_hex`][Self::to_hex] representation.
    pub fn from_hex(s: &str) -> Result<Key> {
        let bytes = hex::decode(s).map_err(|e| Error::BadHex(e.to_string()))?;
        Key::from_vec(bytes)
    }

    /// Run `f` over the encoded bytes.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let storage = self.inner.storage.borrow();
        match &*storage {
            Storage::Private(b) | Storage::Copied(b) => f(b),
            Storage::Shared { source, range } => source
                .with_range(range.clone(), f)
                .expect("shared key outlived its source buffer without invalidation"),
        }
    }

    /// Copy the encoded bytes out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.with_bytes(|b| b.to_vec())
    }

    /// `prefix` followed by the encoded bytes.
    pub fn to_raw(&self, prefix: &[u8]) -> Vec<u8> {
        self.with_bytes(|b| {
            let mut out = Vec::with_capacity(prefix.len() + b.len());
            out.extend_from_slice(prefix);
            out.extend_from_slice(b);
            out
        })
    }

    /// The encoded bytes as lowercase ASCII hex.
    pub fn to_hex(&self) -> String {
        self.with_bytes(|b| hex::encode(b))
    }

    /// Encoded length in bytes.
    pub fn byte_len(&self) -> usize {
        self.with_bytes(|b| b.len())
    }

    /// True when the key is the empty tuple.
    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }

    /// How the byte buffer is currently held.
    pub fn storage_mode(&self) -> StorageMode {
        match &*self.inner.storage.borrow() {
            Storage::Private(_) => StorageMode::Private,
            Storage::Shared { .. } => StorageMode::Shared,
            Storage::Copied(_) => StorageMode::Copied,
        }
    }

    /// Number of elements. Costs a linear scan.
    pub fn len(&self) -> Result<usize> {
        self.with_bytes(|bytes| {
            let mut cursor = bytes;
            let mut len = 0;
            while !cursor.is_empty() {
                match skip_element(&mut cursor)? {
                    Skip::Element => len += 1,
                    Skip::Sep => return Err(Error::BadKind(crate::kind::Kind::Sep.into_u8())),
                }
            }
            Ok(len)
        })
    }

    /// Decode the element at `index`.
    pub fn get(&self, index: usize) -> Result<Element> {
        self.with_bytes(|bytes| {
            let mut cursor = bytes;
            let mut at = 0;
            while !cursor.is_empty() {
                if at == index {
                    return read_element(&mut cursor);
                }
                skip_element(&mut cursor)?;
                at += 1;
            }
            Err(Error::IndexOutOfRange { index, len: at })
        })
    }

    /// A new Private key over the element subsequence `range`. An empty or
    /// inverted range yields the empty key.
    pub fn slice(&self, range: Range<usize>) -> Result<Key> {
        if range.start >= range.end {
            return Key::from_vec(Vec::new());
        }
        self.with_bytes(|bytes| {
            let mut cursor = bytes;
            let mut at = 0;
            while at < range.start {
                if cursor.is_empty() {
                    return Err(Error::IndexOutOfRange {
                        index: range.start,
                        len: at,
                    });
                }
                skip_element(&mut cursor)?;
                at += 1;
            }
            let start_pos = bytes.len() - cursor.len();
            while at < range.end {
                if cursor.is_empty() {
                    return Err(Error::IndexOutOfRange {
                        index: range.end,
                        len: at,
                    });
                }
                skip_element(&mut cursor)?;
                at += 1;
            }
            let end_pos = bytes.len() - cursor.len();
            Key::from_vec(bytes[start_pos..end_pos].to_vec())
        })
    }

    /// Byte-append another key's elements after this key's.
    pub fn concat(&self, other: &Key) -> Result<Key> {
        self.with_bytes(|a| {
            other.with_bytes(|b| {
                let mut out = Vec::with_capacity(a.len() + b.len());
                out.extend_from_slice(a);
                out.extend_from_slice(b);
                Key::from_vec(out)
            })
        })
    }

    /// Append encoded elements after this key's.
    pub fn append(&self, elements: &[Element]) -> Result<Key> {
        self.with_bytes(|a| {
            let mut out = Vec::with_capacity(a.len() + 16 * elements.len());
            out.extend_from_slice(a);
            encode_tuple_into(&mut out, elements);
            Key::from_vec(out)
        })
    }

    /// Single-pass iterator of decoded elements. Take a fresh one to
    /// restart.
    pub fn elements(&self) -> KeyElements {
        KeyElements {
            key: self.clone(),
            pos: 0,
            stopped: false,
        }
    }

    /// Decode the whole key back into a tuple.
    pub fn to_tuple(&self) -> Result<Vec<Element>> {
        self.elements().collect()
    }

    /// The smallest key strictly greater than this one: the last non-0xFF
    /// byte is incremented and trailing 0xFF bytes are dropped. `None` when
    /// the key is empty or every byte is 0xFF.
    pub fn next_greater(&self) -> Option<Key> {
        let bumped = self.with_bytes(next_greater_bytes)?;
        // Never longer than the input, so the length check cannot fail.
        Key::from_vec(bumped).ok()
    }

    fn cached_hash(&self) -> u64 {
        if let Some(h) = self.inner.hash.get() {
            return h;
        }
        let h = self.with_bytes(|bytes| {
            let mut hasher = DefaultHasher::new();
            bytes.hash(&mut hasher);
            hasher.finish()
        });
        self.inner.hash.set(Some(h));
        h
    }

    /// Compare against a tuple without fully encoding it: elements are
    /// encoded one at a time and compared chunkwise, so a difference in an
    /// early element never encodes the rest.
    pub fn cmp_elements(&self, elements: &[Element]) -> Ordering {
        self.with_bytes(|bytes| {
            let mut pos = 0;
            let mut scratch = Vec::new();
            for elem in elements {
                scratch.clear();
                write_element(&mut scratch, elem);
                let remaining = &bytes[pos..];
                if remaining.len() < scratch.len() {
                    return match remaining.cmp(&scratch[..remaining.len()]) {
                        Ordering::Equal => Ordering::Less,
                        unequal => unequal,
                    };
                }
                match remaining[..scratch.len()].cmp(&scratch) {
                    Ordering::Equal => pos += scratch.len(),
                    unequal => return unequal,
                }
            }
            if pos == bytes.len() {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        })
    }
}

impl TryFrom<&[Element]> for Key {
    type Error = Error;
    fn try_from(elements: &[Element]) -> Result<Key> {
        Key::new(elements)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Key) -> bool {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.with_bytes(|a| other.with_bytes(|b| a == b))
    }
}

impl Eq for Key {}

impl Ord for Key {
    fn cmp(&self, other: &Key) -> Ordering {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return Ordering::Equal;
        }
        self.with_bytes(|a| other.with_bytes(|b| a.cmp(b)))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Key) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.cached_hash());
    }
}

impl PartialEq<[Element]> for Key {
    fn eq(&self, other: &[Element]) -> bool {
        self.cmp_elements(other) == Ordering::Equal
    }
}

impl PartialEq<Vec<Element>> for Key {
    fn eq(&self, other: &Vec<Element>) -> bool {
        self.cmp_elements(other) == Ordering::Equal
    }
}

impl PartialOrd<[Element]> for Key {
    fn partial_cmp(&self, other: &[Element]) -> Option<Ordering> {
        Some(self.cmp_elements(other))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_tuple() {
            Ok(tuple) => write!(f, "Key({:?})", tuple),
            Err(_) => write!(f, "Key(raw {})", self.to_hex()),
        }
    }
}

/// Iterator over a key's decoded elements.
pub struct KeyElements {
    key: Key,
    pos: usize,
    stopped: bool,
}

impl Iterator for KeyElements {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }
        let result = self.key.with_bytes(|bytes| {
            if self.pos >= bytes.len() {
                return None;
            }
            let mut cursor = &bytes[self.pos..];
            let result = read_element(&mut cursor);
            self.pos = bytes.len() - cursor.len();
            Some(result)
        });
        match result {
            Some(Ok(elem)) => Some(Ok(elem)),
            Some(Err(e)) => {
                self.stopped = true;
                Some(Err(e))
            }
            None => {
                self.stopped = true;
                None
            }
        }
    }
}

impl serde::Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.with_bytes(|b| serializer.serialize_bytes(b))
        }
    }
}

impl<'de> serde::Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Key::from_hex(&s).map_err(D::Error::custom)
        } else {
            let b = serde_bytes::ByteBuf::deserialize(deserializer)?;
            Key::from_vec(b.into_vec()).map_err(D::Error::custom)
        }
    }
}
