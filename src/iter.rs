//! The range iterator.
//!
//! A `RangeIterator` drives an engine cursor through one collection's slice
//! of the keyspace. It is configured with a byte prefix, optional lower and
//! upper fences, and a result cap, then set in motion with [`forward`] or
//! [`reverse`]; after that it behaves as a plain `Iterator` of [`Record`]s.
//!
//! The state machine has three states. *Configured*: fences may still be
//! adjusted, stepping is an error. *Running*: each step pulls one physical
//! record, splits it into logical keys, and tests the first logical key
//! against the stop fence. *Halted*: terminal, reached on exhaustion, a
//! failed fence, a prefix mismatch, the cap, or an error.
//!
//! [`forward`]: RangeIterator::forward
//! [`reverse`]: RangeIterator::reverse

use crate::bound::{next_greater_bytes, Bound, Predicate};
use crate::engine::{Engine, EngineIter};
use crate::error::{Error, Result};
use crate::key::Key;
use crate::keylist::KeyList;

/// One yielded record: the logical keys split out of the physical key, and
/// the raw value bytes.
#[derive(Clone, Debug)]
pub struct Record {
    keys: KeyList,
    data: Vec<u8>,
}

impl Record {
    /// The first logical key of the physical record.
    pub fn key(&self) -> &Key {
        self.keys.first()
    }

    /// Every logical key of the physical record.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The raw value bytes as the engine yielded them.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_parts(self) -> (Vec<Key>, Vec<u8>) {
        (self.keys.into_keys(), self.data)
    }
}

enum State<'e> {
    Configured,
    Running {
        cursor: EngineIter<'e>,
        cur: Option<Record>,
        started: bool,
        reverse: bool,
    },
    Halted,
}

/// A configurable scan over one prefix of an engine's keyspace.
pub struct RangeIterator<'e, E: Engine + ?Sized> {
    engine: &'e E,
    prefix: Vec<u8>,
    lo: Option<Bound>,
    hi: Option<Bound>,
    max: Option<usize>,
    state: State<'e>,
}

impl<'e, E: Engine + ?Sized> RangeIterator<'e, E> {
    pub fn new(engine: &'e E, prefix: impl Into<Vec<u8>>) -> RangeIterator<'e, E> {
        RangeIterator {
            engine,
            prefix: prefix.into(),
            lo: None,
            hi: None,
            max: None,
            state: State::Configured,
        }
    }

    /// Lower fence. `closed` keeps records equal to `key`.
    pub fn set_lo(mut self, key: Key, closed: bool) -> Self {
        let pred = if closed { Predicate::Le } else { Predicate::Lt };
        self.lo = Some(Bound::new(key, pred));
        self
    }

    /// Upper fence. `closed` keeps records equal to `key`.
    pub fn set_hi(mut self, key: Key, closed: bool) -> Self {
        let pred = if closed { Predicate::Ge } else { Predicate::Gt };
        self.hi = Some(Bound::new(key, pred));
        self
    }

    /// Constrain to keys having `key` as a tuple prefix: a closed lower
    /// fence at `key` and an open upper fence at its next-greater key. When
    /// no next-greater key exists the collection prefix check alone fences
    /// the top.
    pub fn set_prefix(mut self, key: Key) -> Self {
        self.hi = key.next_greater().map(|ng| Bound::new(ng, Predicate::Lt));
        self.lo = Some(Bound::new(key, Predicate::Ge));
        self
    }

    /// Constrain to exactly `key`.
    pub fn set_exact(mut self, key: Key) -> Self {
        self.lo = Some(Bound::new(key.clone(), Predicate::Le));
        self.hi = Some(Bound::new(key, Predicate::Ge));
        self
    }

    /// Cap the number of yielded records.
    pub fn set_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Pull the next physical record within the collection prefix into
    /// `cur`. Returns false on exhaustion or (unless `skip_mismatch`) on the
    /// first record outside the prefix.
    fn step(&mut self, skip_mismatch: bool) -> Result<bool> {
        let State::Running { cursor, cur, .. } = &mut self.state else {
            return Ok(false);
        };
        *cur = None;
        loop {
            let Some(item) = cursor.next() else {
                return Ok(false);
            };
            let (region, data) = item?;
            let in_prefix = region.with_bytes(|b| b.starts_with(&self.prefix))?;
            if !in_prefix {
                if skip_mismatch {
                    continue;
                }
                return Ok(false);
            }
            let keys = KeyList::from_region(&region, &self.prefix).map_err(|e| {
                Error::BadRecord {
                    key: region.to_vec().unwrap_or_default(),
                    source: Box::new(e),
                }
            })?;
            *cur = Some(Record { keys, data });
            return Ok(true);
        }
    }

    /// True when the current record's first logical key fails `bound`.
    fn current_fails(&self, bound: &Option<Bound>) -> bool {
        match (&self.state, bound) {
            (State::Running { cur: Some(rec), .. }, Some(bound)) => {
                !rec.key().with_bytes(|kb| bound.admits(kb))
            }
            _ => false,
        }
    }

    /// Start scanning in ascending key order. The cursor opens at
    /// `prefix ∥ lo` when a lower fence is set, else at `prefix`.
    pub fn forward(mut self) -> Result<Self> {
        let mut start = self.prefix.clone();
        if let Some(lo) = &self.lo {
            lo.key.with_bytes(|b| start.extend_from_slice(b));
        }
        let cursor = self.engine.iter(&start, false)?;
        self.state = State::Running {
            cursor,
            cur: None,
            started: false,
            reverse: false,
        };
        // An open lower fence admits the start key's successors only.
        if self.step(false)? && self.current_fails(&self.lo) {
            self.step(false)?;
        }
        Ok(self)
    }

    /// Start scanning in descending key order. The cursor opens at
    /// `prefix ∥ hi` when an upper fence is set, else just above the whole
    /// prefix.
    pub fn reverse(mut self) -> Result<Self> {
        let start = match &self.hi {
            Some(hi) => {
                let mut start = self.prefix.clone();
                hi.key.with_bytes(|b| start.extend_from_slice(b));
                start
            }
            None => next_greater_bytes(&self.prefix).ok_or_else(|| {
                Error::OutOfRange("no key space above the scan prefix".into())
            })?,
        };
        let cursor = self.engine.iter(&start, true)?;
        self.state = State::Running {
            cursor,
            cur: None,
            started: false,
            reverse: true,
        };
        // The reverse start may overshoot into a neighbouring collection;
        // skip down past mismatches, then past records an open upper fence
        // rejects.
        self.step(true)?;
        while self.current_fails(&self.hi) {
            if !self.step(true)? {
                break;
            }
        }
        Ok(self)
    }

    fn halt(&mut self) {
        self.state = State::Halted;
    }
}

impl<'e, E: Engine + ?Sized> Iterator for RangeIterator<'e, E> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let (was_started, reverse) = match &mut self.state {
            State::Configured => {
                self.halt();
                return Some(Err(Error::NoDirection));
            }
            State::Halted => return None,
            State::Running {
                started, reverse, ..
            } => {
                let was = *started;
                *started = true;
                (was, *reverse)
            }
        };

        if self.max == Some(0) {
            self.halt();
            return None;
        }

        // The positioning done by forward()/reverse() provides the first
        // record; afterwards each call advances the cursor.
        if was_started {
            match self.step(false) {
                Ok(true) => {}
                Ok(false) => {
                    self.halt();
                    return None;
                }
                Err(e) => {
                    self.halt();
                    return Some(Err(e));
                }
            }
        }

        let record = match &mut self.state {
            State::Running { cur, .. } => cur.take(),
            _ => None,
        };
        let Some(record) = record else {
            self.halt();
            return None;
        };

        let stop = if reverse { &self.lo } else { &self.hi };
        if let Some(stop) = stop {
            if !record.key().with_bytes(|kb| stop.admits(kb)) {
                self.halt();
                return None;
            }
        }

        if let Some(max) = &mut self.max {
            *max -= 1;
        }
        Some(Ok(record))
    }
}
