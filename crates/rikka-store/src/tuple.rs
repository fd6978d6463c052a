//! Order-preserving tuple encoding.
//!
//! A subset of the FoundationDB tuple layer: byte strings, UTF-8 strings and
//! unsigned 64-bit integers. Packed tuples sort bytewise in the same order as
//! their elements, so integer ids become contiguous, ordered key ranges.

use crate::error::{TupleError, TupleResult};

const BYTES_CODE: u8 = 0x01;
const STRING_CODE: u8 = 0x02;
const INT_ZERO_CODE: u8 = 0x14;
const ESCAPE: u8 = 0xFF;

/// One element of a [`Tuple`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Bytes(Vec<u8>),
    String(String),
    Int(u64),
}

impl Element {
    /// Returns the integer value, if this is an integer element.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Element::Int(n) => Some(*n),
            Element::Bytes(_) | Element::String(_) => None,
        }
    }

    /// Returns the string value, if this is a string element.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Element::String(s) => Some(s),
            Element::Bytes(_) | Element::Int(_) => None,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Element::Bytes(b) => {
                out.push(BYTES_CODE);
                encode_escaped(b, out);
            }
            Element::String(s) => {
                out.push(STRING_CODE);
                encode_escaped(s.as_bytes(), out);
            }
            Element::Int(0) => out.push(INT_ZERO_CODE),
            Element::Int(n) => {
                let be = n.to_be_bytes();
                let skip = (n.leading_zeros() / 8) as usize;
                out.push(INT_ZERO_CODE + (be.len() - skip) as u8);
                out.extend_from_slice(&be[skip..]);
            }
        }
    }
}

impl From<u64> for Element {
    fn from(n: u64) -> Self {
        Element::Int(n)
    }
}

impl From<&str> for Element {
    fn from(s: &str) -> Self {
        Element::String(s.to_string())
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Element::String(s)
    }
}

impl From<Vec<u8>> for Element {
    fn from(b: Vec<u8>) -> Self {
        Element::Bytes(b)
    }
}

impl From<&[u8]> for Element {
    fn from(b: &[u8]) -> Self {
        Element::Bytes(b.to_vec())
    }
}

/// An ordered sequence of elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tuple(Vec<Element>);

impl Tuple {
    /// Creates an empty tuple.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an element.
    pub fn push(mut self, element: impl Into<Element>) -> Self {
        self.0.push(element.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.0.get(index)
    }

    pub fn elements(&self) -> &[Element] {
        &self.0
    }

    /// Encodes the tuple.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.pack_into(&mut out);
        out
    }

    /// Appends the encoding of the tuple to `out`.
    pub fn pack_into(&self, out: &mut Vec<u8>) {
        for element in &self.0 {
            element.encode_into(out);
        }
    }

    /// Decodes a packed tuple. The whole input must be consumed.
    pub fn unpack(bytes: &[u8]) -> TupleResult<Self> {
        let mut elements = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let (element, next) = decode_element(bytes, pos)?;
            elements.push(element);
            pos = next;
        }
        Ok(Self(elements))
    }
}

impl From<u64> for Tuple {
    fn from(n: u64) -> Self {
        Tuple::new().push(n)
    }
}

impl From<&str> for Tuple {
    fn from(s: &str) -> Self {
        Tuple::new().push(s)
    }
}

impl FromIterator<Element> for Tuple {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn encode_escaped(payload: &[u8], out: &mut Vec<u8>) {
    for &b in payload {
        out.push(b);
        if b == 0x00 {
            out.push(ESCAPE);
        }
    }
    out.push(0x00);
}

/// Decodes an escaped, zero-terminated payload starting at `start`.
fn decode_escaped(bytes: &[u8], start: usize, offset: usize) -> TupleResult<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut pos = start;
    loop {
        match bytes.get(pos) {
            None => return Err(TupleError::Truncated { offset }),
            Some(0x00) if bytes.get(pos + 1) == Some(&ESCAPE) => {
                out.push(0x00);
                pos += 2;
            }
            Some(0x00) => return Ok((out, pos + 1)),
            Some(&b) => {
                out.push(b);
                pos += 1;
            }
        }
    }
}

fn decode_element(bytes: &[u8], offset: usize) -> TupleResult<(Element, usize)> {
    let code = bytes[offset];
    match code {
        BYTES_CODE => {
            let (payload, next) = decode_escaped(bytes, offset + 1, offset)?;
            Ok((Element::Bytes(payload), next))
        }
        STRING_CODE => {
            let (payload, next) = decode_escaped(bytes, offset + 1, offset)?;
            let s = String::from_utf8(payload).map_err(|_| TupleError::InvalidUtf8 { offset })?;
            Ok((Element::String(s), next))
        }
        INT_ZERO_CODE..=0x1C => {
            let n = (code - INT_ZERO_CODE) as usize;
            let start = offset + 1;
            let raw = bytes
                .get(start..start + n)
                .ok_or(TupleError::Truncated { offset })?;
            let mut be = [0u8; 8];
            be[8 - n..].copy_from_slice(raw);
            Ok((Element::Int(u64::from_be_bytes(be)), start + n))
        }
        _ => Err(TupleError::UnknownTypeCode { code, offset }),
    }
}
