//! The storage engine contract the range iterator drives.
//!
//! The core never stores anything itself; it only asks an engine for an
//! ordered cursor. Any ordered byte-keyed store can sit behind this trait.

use std::collections::BTreeMap;
use std::ops::Bound as RangeBound;

use crate::error::Result;
use crate::source::Region;

/// A lazy cursor of `(physical_key, value)` pairs.
pub type EngineIter<'a> = Box<dyn Iterator<Item = Result<(Region, Vec<u8>)>> + 'a>;

/// An ordered key/value store the iterator can scan.
pub trait Engine {
    /// Open a cursor. Forward cursors yield pairs starting at the least key
    /// `>= start`; reverse cursors start at the greatest key `<= start`.
    /// Exhaustion ends the sequence. Failures surface as `Err` items and
    /// halt the consumer.
    ///
    /// Engines that keep cursor bytes in a reusable buffer may yield
    /// [`Region::Source`] values to let keys alias the buffer until it is
    /// invalidated.
    fn iter<'a>(&'a self, start: &[u8], reverse: bool) -> Result<EngineIter<'a>>;
}

/// An in-memory reference engine over a `BTreeMap`. Used by the tests, doc
/// examples and benches; also handy as a scratch store.
#[derive(Default, Debug, Clone)]
pub struct MemoryEngine {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryEngine {
    pub fn new() -> MemoryEngine {
        MemoryEngine::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.map.insert(key, value);
    }

    pub fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.map.remove(key)
    }

    pub fn get(&self, key: &[u8]) -> Option<&Vec<u8>> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Engine for MemoryEngine {
    fn iter<'a>(&'a self, start: &[u8], reverse: bool) -> Result<EngineIter<'a>> {
        let ok = |(k, v): (&Vec<u8>, &Vec<u8>)| Ok((Region::Owned(k.clone()), v.clone()));
        if reverse {
            let range = (
                RangeBound::Unbounded,
                RangeBound::Included(start.to_vec()),
            );
            Ok(Box::new(self.map.range::<Vec<u8>, _>(range).rev().map(ok)))
        } else {
            let range = (
                RangeBound::Included(start.to_vec()),
                RangeBound::Unbounded,
            );
            Ok(Box::new(self.map.range::<Vec<u8>, _>(range).map(ok)))
        }
    }
}
