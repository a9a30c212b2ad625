//! Tuple and tuple-list codecs.
//!
//! A tuple is a sequence of elements concatenated with no separator. A list
//! of tuples joins the encoded tuples with a single `Sep` byte, which is the
//! form batch records store under one physical key.

use crate::element::{write_element, Element, Parser};
use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::varint::{read_uvarint, uvarint_len, write_uvarint};

/// Encode a tuple of elements. The empty tuple encodes to no bytes.
pub fn encode_tuple(elements: &[Element]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 * elements.len());
    encode_tuple_into(&mut buf, elements);
    buf
}

pub(crate) fn encode_tuple_into(buf: &mut Vec<u8>, elements: &[Element]) {
    for elem in elements {
        write_element(buf, elem);
    }
}

/// Encode a list of tuples, joined with `Sep` bytes.
pub fn encode_list(tuples: &[Vec<Element>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (i, tuple) in tuples.iter().enumerate() {
        if i > 0 {
            buf.push(Kind::Sep.into_u8());
        }
        encode_tuple_into(&mut buf, tuple);
    }
    buf
}

/// Encode a bare order-preserving varint.
pub fn encode_int(v: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(uvarint_len(v));
    write_uvarint(&mut buf, v, 0);
    buf
}

fn strip_prefix<'a>(raw: &'a [u8], prefix: &[u8]) -> Result<&'a [u8]> {
    raw.strip_prefix(prefix).ok_or(Error::PrefixMismatch)
}

/// Decode one tuple from `raw` after verifying and stripping `prefix`.
/// Reads elements until the data ends or a `Sep` closes the tuple; any data
/// past the `Sep` is left alone; use [`decode_list`] for multi-tuple data.
pub fn decode_tuple(raw: &[u8], prefix: &[u8]) -> Result<Vec<Element>> {
    let mut parser = Parser::new(strip_prefix(raw, prefix)?);
    let mut out = Vec::new();
    for elem in &mut parser {
        out.push(elem?);
    }
    Ok(out)
}

/// Decode a `Sep`-joined list of tuples from `raw` after verifying and
/// stripping `prefix`. When the remainder is empty, yields exactly one empty
/// tuple, so a key equal to its prefix reads as a single empty logical key.
pub fn decode_list(raw: &[u8], prefix: &[u8]) -> Result<Vec<Vec<Element>>> {
    let mut rest = strip_prefix(raw, prefix)?;
    let mut out = Vec::new();
    while !rest.is_empty() {
        let mut parser = Parser::new(rest);
        let mut tuple = Vec::new();
        for elem in &mut parser {
            tuple.push(elem?);
        }
        out.push(tuple);
        rest = parser.remainder();
    }
    if out.is_empty() {
        out.push(Vec::new());
    }
    Ok(out)
}

/// Decode a varint array prefixed with its own length: a count, then that
/// many deltas. Returns the cumulative offsets (starting at 0, so one more
/// entry than the count) and the number of bytes consumed.
pub fn decode_offsets(raw: &[u8]) -> Result<(Vec<u64>, usize)> {
    let mut cursor = raw;
    let count = read_uvarint(&mut cursor, 0)?;
    let mut out = Vec::with_capacity(count as usize + 1);
    out.push(0);
    let mut pos = 0u64;
    for _ in 0..count {
        let delta = read_uvarint(&mut cursor, 0)?;
        pos = pos.checked_add(delta).ok_or_else(|| {
            Error::OutOfRange("offset array overflows u64".into())
        })?;
        out.push(pos);
    }
    Ok((out, raw.len() - cursor.len()))
}

/// Anything [`pack`] can encode, selected by runtime shape: a single
/// element, one tuple, or a list of tuples.
#[derive(Clone, Debug)]
pub enum Packable {
    One(Element),
    Tuple(Vec<Element>),
    List(Vec<Vec<Element>>),
}

impl From<Element> for Packable {
    fn from(v: Element) -> Self {
        Packable::One(v)
    }
}

impl From<Vec<Element>> for Packable {
    fn from(v: Vec<Element>) -> Self {
        Packable::Tuple(v)
    }
}

impl From<Vec<Vec<Element>>> for Packable {
    fn from(v: Vec<Vec<Element>>) -> Self {
        Packable::List(v)
    }
}

/// Shape-directed encoding convenience: prepend `prefix`, then encode a
/// single element, a tuple, or a `Sep`-joined list.
pub fn pack(prefix: &[u8], value: &Packable) -> Vec<u8> {
    let mut buf = Vec::with_capacity(prefix.len() + 20);
    buf.extend_from_slice(prefix);
    match value {
        Packable::One(elem) => write_element(&mut buf, elem),
        Packable::Tuple(tuple) => encode_tuple_into(&mut buf, tuple),
        Packable::List(tuples) => {
            for (i, tuple) in tuples.iter().enumerate() {
                if i > 0 {
                    buf.push(Kind::Sep.into_u8());
                }
                encode_tuple_into(&mut buf, tuple);
            }
        }
    }
    buf
}
