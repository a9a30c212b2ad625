//! Order-preserving tuple keys for ordered key/value stores.
//!
//! ordkey turns tuples of primitive values (integers, byte strings, text,
//! booleans, timestamps, UUIDs, nulls) into opaque byte strings whose
//! unsigned lexicographic order equals the natural order of the tuples.
//! Secondary indexes, prefix scans and bounded range queries over any
//! ordered byte-keyed engine are built on that property.
//!
//! Three layers:
//!
//! - the codec: [`encode_tuple`], [`decode_tuple`] and friends;
//! - the [`Key`] value type, an immutable, hashable, comparable handle over
//!   one encoded tuple, with three buffer storage modes for zero-copy use;
//! - the [`RangeIterator`], a state machine that drives an [`Engine`]
//!   cursor and yields decoded logical keys under configurable fences.
//!
//! ```
//! use ordkey::{Element, Key, MemoryEngine, RangeIterator};
//!
//! # fn main() -> ordkey::Result<()> {
//! let mut engine = MemoryEngine::new();
//! for (user, score) in [("ada", 10u32), ("ada", 31), ("bob", 2)] {
//!     let key = Key::new(&[Element::from(user), Element::from(score)])?;
//!     engine.put(key.to_raw(b"scores:"), vec![]);
//! }
//!
//! // All of ada's scores, in ascending order.
//! let ada = Key::new(&[Element::from("ada")])?;
//! let mut found = Vec::new();
//! for record in RangeIterator::new(&engine, "scores:").set_prefix(ada).forward()? {
//!     found.push(record?.key().get(1)?);
//! }
//! assert_eq!(found, vec![Element::from(10u32), Element::from(31u32)]);
//! # Ok(())
//! # }
//! ```

mod bound;
mod element;
mod engine;
mod error;
mod integer;
mod iter;
mod key;
mod keylist;
mod kind;
mod source;
mod time;
mod tuple;
mod varint;

pub use self::bound::{next_greater_bytes, next_greater_text, prefix_bound, Bound, Predicate};
pub use self::element::Element;
pub use self::engine::{Engine, EngineIter, MemoryEngine};
pub use self::error::{Error, Result};
pub use self::integer::Integer;
pub use self::iter::{RangeIterator, Record};
pub use self::key::{Key, KeyElements, StorageMode};
pub use self::keylist::KeyList;
pub use self::kind::Kind;
pub use self::source::{MemSource, Region};
pub use self::time::Time;
pub use self::tuple::{
    decode_list, decode_offsets, decode_tuple, encode_int, encode_list, encode_tuple, pack,
    Packable,
};

/// Maximum encoded key size in bytes.
pub const MAX_KEY_LEN: usize = u16::MAX as usize;
