//! Shared memory sources and the regions that alias them.
//!
//! An engine that owns reusable cursor buffers can expose them as a
//! [`MemSource`]. Keys built over a source alias its bytes instead of copying
//! them, and register for notification so the copy happens at the last
//! possible moment: the source calls [`MemSource::invalidate`] immediately
//! before its buffer changes, every subscriber materialises its own copy
//! synchronously, and only then may the buffer be reused.
//!
//! Everything here is single-threaded by construction (`Rc`-based, not
//! `Send`); subscribe, cancel, and notify are serialised with the source's
//! own mutation by the caller.

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};

/// A subscriber holding bytes that alias a source buffer.
pub(crate) trait Sink {
    /// Copy the aliased bytes out. Called exactly once, immediately before
    /// the source buffer becomes invalid.
    fn materialize(&self);
}

struct SourceInner {
    buf: RefCell<Box<[u8]>>,
    /// Subscribers to notify before the buffer changes. Entries are weak;
    /// dead ones are pruned during notification and registration.
    sinks: RefCell<Vec<Weak<dyn Sink>>>,
}

/// A byte buffer whose owner promises to call [`invalidate`] before the
/// bytes change or disappear.
///
/// Cloning is cheap and shares the buffer.
///
/// [`invalidate`]: Self::invalidate
#[derive(Clone)]
pub struct MemSource {
    inner: Rc<SourceInner>,
}

impl MemSource {
    pub fn new(data: Vec<u8>) -> MemSource {
        MemSource {
            inner: Rc::new(SourceInner {
                buf: RefCell::new(data.into_boxed_slice()),
                sinks: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.buf.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the current buffer contents.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.inner.buf.borrow())
    }

    /// Run `f` over a sub-range of the buffer.
    pub(crate) fn with_range<R>(
        &self,
        range: Range<usize>,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R> {
        let buf = self.inner.buf.borrow();
        let bytes = buf.get(range.clone()).ok_or_else(|| {
            Error::OutOfRange(format!(
                "region {}..{} exceeds source of {} bytes",
                range.start,
                range.end,
                buf.len()
            ))
        })?;
        Ok(f(bytes))
    }

    /// A region aliasing `range` of this source's buffer.
    pub fn slice(&self, range: Range<usize>) -> Result<Region> {
        if range.end > self.len() || range.start > range.end {
            return Err(Error::OutOfRange(format!(
                "region {}..{} exceeds source of {} bytes",
                range.start,
                range.end,
                self.len()
            )));
        }
        Ok(Region::Source {
            source: self.clone(),
            range,
        })
    }

    /// Notify every live subscriber to copy its bytes out, then clear the
    /// subscriber list. Must be called before the buffer is mutated or
    /// dropped out from under aliases.
    pub fn invalidate(&self) {
        let sinks = std::mem::take(&mut *self.inner.sinks.borrow_mut());
        for sink in sinks {
            if let Some(sink) = sink.upgrade() {
                sink.materialize();
            }
        }
    }

    /// Invalidate, then install new buffer contents.
    pub fn replace(&self, data: Vec<u8>) {
        self.invalidate();
        *self.inner.buf.borrow_mut() = data.into_boxed_slice();
    }

    pub(crate) fn subscribe(&self, sink: Weak<dyn Sink>) {
        let mut sinks = self.inner.sinks.borrow_mut();
        sinks.retain(|s| s.upgrade().is_some());
        sinks.push(sink);
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.inner
            .sinks
            .borrow()
            .iter()
            .filter(|s| s.upgrade().is_some())
            .count()
    }
}

impl fmt::Debug for MemSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemSource")
            .field("len", &self.len())
            .finish()
    }
}

/// A byte region handed from an engine to the core: either an owned buffer,
/// or a range aliasing a [`MemSource`]. Keys built from a `Source` region
/// come out Shared; keys built from an `Owned` region come out Private.
#[derive(Clone, Debug)]
pub enum Region {
    Owned(Vec<u8>),
    Source {
        source: MemSource,
        range: Range<usize>,
    },
}

impl Region {
    pub fn len(&self) -> usize {
        match self {
            Region::Owned(v) => v.len(),
            Region::Source { range, .. } => range.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the region's bytes. Fails only when a source-aliased
    /// range no longer fits its buffer, which means the caller broke the
    /// invalidation contract.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        match self {
            Region::Owned(v) => Ok(f(v)),
            Region::Source { source, range } => source.with_range(range.clone(), f),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.with_bytes(|b| b.to_vec())
    }
}

impl From<Vec<u8>> for Region {
    fn from(v: Vec<u8>) -> Region {
        Region::Owned(v)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    struct CountingSink {
        fired: Cell<u32>,
    }

    impl Sink for CountingSink {
        fn materialize(&self) {
            self.fired.set(self.fired.get() + 1);
        }
    }

    #[test]
    fn regions_read_through() {
        let source = MemSource::new(vec![1, 2, 3, 4, 5]);
        let region = source.slice(1..4).unwrap();
        assert_eq!(region.to_vec().unwrap(), vec![2, 3, 4]);
        assert_eq!(region.len(), 3);
        assert!(source.slice(3..6).is_err());
    }

    #[test]
    fn invalidate_notifies_each_subscriber_once() {
        let source = MemSource::new(vec![0; 8]);
        let sink = Rc::new(CountingSink {
            fired: Cell::new(0),
        });
        let sink_dyn: Rc<dyn Sink> = sink.clone();
        let weak: Weak<dyn Sink> = Rc::downgrade(&sink_dyn);
        drop(sink_dyn);
        source.subscribe(weak);
        assert_eq!(source.subscriber_count(), 1);

        source.invalidate();
        assert_eq!(sink.fired.get(), 1);
        assert_eq!(source.subscriber_count(), 0);

        // The list was cleared, so a second invalidation is a no-op.
        source.invalidate();
        assert_eq!(sink.fired.get(), 1);
    }

    #[test]
    fn dead_subscribers_are_pruned() {
        let source = MemSource::new(vec![0; 8]);
        let sink = Rc::new(CountingSink {
            fired: Cell::new(0),
        });
        let sink_dyn: Rc<dyn Sink> = sink.clone();
        let weak: Weak<dyn Sink> = Rc::downgrade(&sink_dyn);
        drop(sink_dyn);
        source.subscribe(weak);
        drop(sink);
        let live = Rc::new(CountingSink {
            fired: Cell::new(0),
        });
        let live_dyn: Rc<dyn Sink> = live.clone();
        let weak: Weak<dyn Sink> = Rc::downgrade(&live_dyn);
        drop(live_dyn);
        source.subscribe(weak);
        assert_eq!(source.subscriber_count(), 1);
        source.invalidate();
        assert_eq!(live.fired.get(), 1);
    }

    #[test]
    fn replace_swaps_contents_after_notifying() {
        let source = MemSource::new(vec![1, 2, 3]);
        source.replace(vec![9, 9]);
        assert_eq!(source.len(), 2);
        source.with_bytes(|b| assert_eq!(b, &[9, 9]));
    }
}
