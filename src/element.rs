//! The element sum type and its wire codec.
//!
//! Every element encodes as a one-byte kind tag followed by a kind-specific
//! body. Tags and bodies are arranged so that unsigned byte comparison of two
//! encoded elements matches semantic comparison of their values, both within
//! a kind and across kinds.

use std::cmp::Ordering;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::integer::Integer;
use crate::kind::Kind;
use crate::time::Time;
use crate::varint::{read_uvarint, skip_uvarint, write_uvarint};

/// A single key element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element {
    Null,
    Bool(bool),
    Int(Integer),
    Bytes(Vec<u8>),
    Text(String),
    Uuid(Uuid),
    Time(Time),
}

impl Element {
    pub fn name(&self) -> &'static str {
        use self::Element::*;
        match self {
            Null => "Null",
            Bool(_) => "Bool",
            Int(_) => "Int",
            Bytes(_) => "Bytes",
            Text(_) => "Text",
            Uuid(_) => "Uuid",
            Time(_) => "Time",
        }
    }

    /// The tag this element will carry on the wire. Signed kinds split by
    /// sign, which is what makes the cross-kind tag order a total sort order.
    pub fn wire_kind(&self) -> Kind {
        use self::Element::*;
        match self {
            Null => Kind::Null,
            Bool(_) => Kind::Bool,
            Int(v) => {
                if v.is_negative() {
                    Kind::NegInt
                } else {
                    Kind::PosInt
                }
            }
            Bytes(_) => Kind::Bytes,
            Text(_) => Kind::Text,
            Uuid(_) => Kind::Uuid,
            Time(t) => {
                if t.composite() < 0 {
                    Kind::NegTime
                } else {
                    Kind::Time
                }
            }
        }
    }
}

impl Ord for Element {
    fn cmp(&self, other: &Element) -> Ordering {
        use self::Element::*;
        match self.wire_kind().cmp(&other.wire_kind()) {
            Ordering::Equal => match (self, other) {
                (Null, Null) => Ordering::Equal,
                (Bool(a), Bool(b)) => a.cmp(b),
                (Int(a), Int(b)) => a.cmp(b),
                (Bytes(a), Bytes(b)) => a.cmp(b),
                (Text(a), Text(b)) => a.as_bytes().cmp(b.as_bytes()),
                (Uuid(a), Uuid(b)) => a.as_bytes().cmp(b.as_bytes()),
                (Time(a), Time(b)) => a.cmp(b),
                _ => unreachable!("equal wire kinds imply equal variants"),
            },
            unequal => unequal,
        }
    }
}

impl PartialOrd for Element {
    fn partial_cmp(&self, other: &Element) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

macro_rules! impl_from_int {
    ($t: ty) => {
        impl From<$t> for Element {
            fn from(n: $t) -> Self {
                Element::Int(Integer::from(n))
            }
        }
    };
}

impl_from_int!(u8);
impl_from_int!(u16);
impl_from_int!(u32);
impl_from_int!(u64);
impl_from_int!(usize);
impl_from_int!(i8);
impl_from_int!(i16);
impl_from_int!(i32);
impl_from_int!(i64);
impl_from_int!(isize);

impl From<Integer> for Element {
    fn from(n: Integer) -> Self {
        Element::Int(n)
    }
}

impl From<bool> for Element {
    fn from(v: bool) -> Self {
        Element::Bool(v)
    }
}

impl From<&str> for Element {
    fn from(v: &str) -> Self {
        Element::Text(v.to_owned())
    }
}

impl From<String> for Element {
    fn from(v: String) -> Self {
        Element::Text(v)
    }
}

impl From<&[u8]> for Element {
    fn from(v: &[u8]) -> Self {
        Element::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Element {
    fn from(v: Vec<u8>) -> Self {
        Element::Bytes(v)
    }
}

impl From<Uuid> for Element {
    fn from(v: Uuid) -> Self {
        Element::Uuid(v)
    }
}

impl From<Time> for Element {
    fn from(v: Time) -> Self {
        Element::Time(v)
    }
}

impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Element::Null,
        }
    }
}

/// Append the 7→8 bit expansion of `p`. Every output byte has the high bit
/// set and carries 7 payload bits in the low bits, the payload sliding by one
/// bit position per byte; a partial trailer byte finishes the field. The
/// field has no terminator of its own: it ends at the next byte with the high
/// bit clear.
fn write_packed(buf: &mut Vec<u8>, p: &[u8]) {
    // ceil(n * 8/7), reserved up front so the per-byte pushes never grow.
    buf.reserve(p.len() + p.len() / 7 + 1);

    let mut shift = 1u32;
    let mut trailer = 0u8;
    for &o in p {
        buf.push(0x80 | trailer | (o >> shift));
        if shift < 7 {
            trailer = o << (7 - shift);
            shift += 1;
        } else {
            buf.push(0x80 | o);
            shift = 1;
            trailer = 0;
        }
    }
    if shift > 1 {
        buf.push(0x80 | trailer);
    }
}

/// Inverse of [`write_packed`]. Consumes body bytes up to, and not
/// including, the first byte with a clear high bit.
fn read_packed(cursor: &mut &[u8]) -> Vec<u8> {
    let body_len = cursor
        .iter()
        .position(|&b| b < 0x80)
        .unwrap_or(cursor.len());
    let (body, rest) = cursor.split_at(body_len);
    *cursor = rest;

    let mut out = Vec::with_capacity(body_len * 7 / 8);
    if body.is_empty() {
        return out;
    }

    let mut shift = 1u32;
    let mut lb = body[0];
    let mut i = 1;
    while i < body.len() {
        let cb = body[i];
        i += 1;
        out.push((lb << shift) | ((cb & 0x7f) >> (7 - shift)));
        if shift < 7 {
            shift += 1;
            lb = cb;
        } else {
            shift = 1;
            if i < body.len() {
                lb = body[i];
                i += 1;
            } else {
                break;
            }
        }
    }
    out
}

/// Serialize an element onto a byte vector.
pub(crate) fn write_element(buf: &mut Vec<u8>, elem: &Element) {
    use self::Element::*;
    match elem {
        Null => buf.push(Kind::Null.into()),
        Bool(v) => {
            buf.push(Kind::Bool.into());
            buf.push(*v as u8);
        }
        Int(v) => {
            if v.is_negative() {
                buf.push(Kind::NegInt.into());
                write_uvarint(buf, v.magnitude(), 0xff);
            } else {
                buf.push(Kind::PosInt.into());
                write_uvarint(buf, v.magnitude(), 0);
            }
        }
        Bytes(v) => {
            buf.push(Kind::Bytes.into());
            write_packed(buf, v);
        }
        Text(v) => {
            buf.push(Kind::Text.into());
            write_packed(buf, v.as_bytes());
        }
        Uuid(v) => {
            buf.push(Kind::Uuid.into());
            buf.extend_from_slice(v.as_bytes());
        }
        Time(v) => {
            let c = v.composite();
            if c < 0 {
                buf.push(Kind::NegTime.into());
                write_uvarint(buf, c.unsigned_abs(), 0xff);
            } else {
                buf.push(Kind::Time.into());
                write_uvarint(buf, c as u64, 0);
            }
        }
    }
}

fn take<'a>(cursor: &mut &'a [u8], n: usize, step: &'static str) -> Result<&'a [u8]> {
    if cursor.len() < n {
        return Err(Error::Truncated {
            step,
            expected: n,
            actual: cursor.len(),
        });
    }
    let (taken, rest) = cursor.split_at(n);
    *cursor = rest;
    Ok(taken)
}

fn read_time_composite(cursor: &mut &[u8], negative: bool) -> Result<Time> {
    let xor = if negative { 0xff } else { 0 };
    let v = read_uvarint(cursor, xor)?;
    let c = if negative {
        i64::try_from(v)
            .map(|v| -v)
            .map_err(|_| Error::OutOfRange(format!("time composite -{}", v)))?
    } else {
        i64::try_from(v).map_err(|_| Error::OutOfRange(format!("time composite {}", v)))?
    };
    Ok(Time::from_composite(c))
}

/// Decode the next element from `cursor`. The caller is responsible for
/// checking for the `Sep` byte first; encountering one here is a decode
/// error.
pub(crate) fn read_element(cursor: &mut &[u8]) -> Result<Element> {
    let tag = take(cursor, 1, "kind tag")?[0];
    let kind = Kind::from_u8(tag).ok_or(Error::BadKind(tag))?;
    Ok(match kind {
        Kind::Null => Element::Null,
        Kind::Bool => Element::Bool(take(cursor, 1, "bool body")?[0] != 0),
        Kind::PosInt => Element::Int(Integer::from_parts(false, read_uvarint(cursor, 0)?)),
        Kind::NegInt => Element::Int(Integer::from_parts(true, read_uvarint(cursor, 0xff)?)),
        Kind::Bytes => Element::Bytes(read_packed(cursor)),
        Kind::Text => {
            let raw = read_packed(cursor);
            let text = String::from_utf8(raw).map_err(|e| Error::BadUtf8(e.utf8_error()))?;
            Element::Text(text)
        }
        Kind::Uuid => {
            let raw = take(cursor, 16, "uuid body")?;
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(raw);
            Element::Uuid(Uuid::from_bytes(bytes))
        }
        Kind::Time => Element::Time(read_time_composite(cursor, false)?),
        Kind::NegTime => Element::Time(read_time_composite(cursor, true)?),
        Kind::Sep => return Err(Error::BadKind(tag)),
    })
}

/// Outcome of a skip step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Skip {
    /// Advanced past one element.
    Element,
    /// Consumed a `Sep` byte; the current tuple ended.
    Sep,
}

/// Advance `cursor` past one element without decoding it.
pub(crate) fn skip_element(cursor: &mut &[u8]) -> Result<Skip> {
    let tag = take(cursor, 1, "kind tag")?[0];
    let kind = Kind::from_u8(tag).ok_or(Error::BadKind(tag))?;
    match kind {
        Kind::Sep => return Ok(Skip::Sep),
        Kind::Null => {}
        Kind::Bool => {
            take(cursor, 1, "bool body")?;
        }
        Kind::PosInt | Kind::Time => skip_uvarint(cursor, 0)?,
        Kind::NegInt | Kind::NegTime => skip_uvarint(cursor, 0xff)?,
        Kind::Bytes | Kind::Text => {
            let body_len = cursor
                .iter()
                .position(|&b| b < 0x80)
                .unwrap_or(cursor.len());
            *cursor = &cursor[body_len..];
        }
        Kind::Uuid => {
            take(cursor, 16, "uuid body")?;
        }
    }
    Ok(Skip::Element)
}

/// Streaming element parser over encoded bytes. Yields elements until the
/// data runs out or a `Sep` byte ends the tuple; the `Sep` is consumed.
#[derive(Clone, Debug)]
pub(crate) struct Parser<'a> {
    data: &'a [u8],
    stopped: bool,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Parser<'a> {
        Parser {
            data,
            stopped: false,
        }
    }

    /// Bytes remaining after the parser stopped, i.e. everything past the
    /// consumed `Sep`.
    pub(crate) fn remainder(&self) -> &'a [u8] {
        self.data
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped || self.data.is_empty() {
            return None;
        }
        if self.data[0] == Kind::Sep.into_u8() {
            self.data = &self.data[1..];
            self.stopped = true;
            return None;
        }
        let result = read_element(&mut self.data);
        if result.is_err() {
            self.stopped = true;
        }
        Some(result)
    }
}
