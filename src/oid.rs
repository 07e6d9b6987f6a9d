//! Object identifiers: parsing, ordering, prefix testing, and BER codec.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

use crate::ber::{tag, BerBuffer};
use crate::error::{Error, Kind};

/// An ordered sequence of unsigned 32-bit sub-identifiers.
///
/// `0.0` (the "null OID" sentinel) is the only value allowed to have fewer
/// than two sub-identifiers; [`Oid::parse`] produces it from empty input.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Oid(Vec<u32>);

impl Oid {
    /// Builds an OID from sub-identifiers without validating them. Used
    /// internally and by callers who already know the arcs are well
    /// formed (e.g. standard OID constants).
    pub fn from_parts(parts: Vec<u32>) -> Self {
        Self(parts)
    }

    /// The null OID sentinel, `0.0`.
    pub fn null() -> Self {
        Self(vec![0, 0])
    }

    /// Parses a dotted-decimal string, with or without a leading dot. Empty
    /// input yields the null OID.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let input = input.trim();
        let input = input.strip_prefix('.').unwrap_or(input);
        if input.is_empty() {
            return Ok(Self::null());
        }
        let mut parts = Vec::new();
        for part in input.split('.') {
            let n: u32 = part
                .parse()
                .map_err(|_| Error::from(Kind::invalid_oid(format!("not a number: {part}"))))?;
            parts.push(n);
        }
        validate(&parts)?;
        Ok(Self(parts))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Lexicographic comparison over `min(len(self), len(other))`
    /// sub-identifiers; does not consider length when one is a strict
    /// prefix of the other. Use [`Oid::compare_exact`] when length should
    /// also be ordered.
    pub fn compare(&self, other: &Oid) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    /// As [`Oid::compare`], but orders by length once one sequence is a
    /// prefix of the other, so `compare_exact(a, b) == Equal` iff `a` and
    /// `b` have identical sub-identifier sequences.
    pub fn compare_exact(&self, other: &Oid) -> Ordering {
        match self.compare(other) {
            Ordering::Equal => self.0.len().cmp(&other.0.len()),
            ord => ord,
        }
    }

    /// True iff `self`'s sub-identifiers are a prefix of `other`'s.
    pub fn is_prefix_of(&self, other: &Oid) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        let mut content = Vec::new();
        if self.0.len() >= 2 {
            let first = self.0[0] as u64;
            let second = self.0[1] as u64;
            encode_base128(first * 40 + second, &mut content);
            for &arc in &self.0[2..] {
                encode_base128(arc as u64, &mut content);
            }
        } else if self.0.is_empty() {
            // Null-sentinel written with no arcs at all still needs to
            // round-trip; encode it the same as `0.0`.
            content.push(0);
        }
        crate::ber::build_header(buf, tag::OBJECT_IDENTIFIER, content.len());
        buf.extend_from_slice(&content);
    }

    pub(crate) fn decode(buf: &BerBuffer, offset: &mut usize) -> Result<Self, Error> {
        let (found, len) = crate::ber::parse_header(buf, offset)?;
        if !found.is(tag::OBJECT_IDENTIFIER) {
            return Err(Kind::decoding(format!(
                "expected OBJECT IDENTIFIER tag, found {:#x}",
                found.to_byte()
            ))
            .into());
        }
        let content = buf.slice(*offset, len)?;
        *offset += len;
        Self::decode_content(content)
    }

    pub(crate) fn decode_content(content: &[u8]) -> Result<Self, Error> {
        if content.is_empty() {
            return Ok(Self::null());
        }
        let mut groups = Vec::new();
        let mut value: u64 = 0;
        let mut in_progress = false;
        for &b in content {
            in_progress = true;
            value = (value << 7) | (b & 0x7F) as u64;
            if b & 0x80 == 0 {
                groups.push(value);
                value = 0;
                in_progress = false;
            }
        }
        if in_progress {
            return Err(Kind::invalid_oid("truncated base-128 sub-identifier").into());
        }

        let combined = groups[0];
        let first = if combined < 80 { (combined / 40) as u32 } else { 2 };
        let second = combined - (first as u64) * 40;
        let mut parts = vec![first, second as u32];
        parts.extend(groups[1..].iter().map(|&g| g as u32));
        Ok(Self(parts))
    }
}

fn validate(parts: &[u32]) -> Result<(), Error> {
    if parts.len() < 2 {
        return Err(Kind::invalid_oid("an OID needs at least two sub-identifiers").into());
    }
    if parts[0] > 2 {
        return Err(Kind::invalid_oid("first sub-identifier must be 0, 1 or 2").into());
    }
    if parts[0] < 2 && parts[1] > 39 {
        return Err(Kind::invalid_oid("second sub-identifier must be in [0, 39] when the first is 0 or 1").into());
    }
    Ok(())
}

fn encode_base128(mut value: u64, out: &mut Vec<u8>) {
    let mut septets = [0u8; 10];
    let mut i = septets.len();
    i -= 1;
    septets[i] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        septets[i] = ((value & 0x7F) as u8) | 0x80;
        value >>= 7;
    }
    out.extend_from_slice(&septets[i..]);
}

impl Deref for Oid {
    type Target = [u32];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u32]> for Oid {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl From<Vec<u32>> for Oid {
    fn from(parts: Vec<u32>) -> Self {
        Self(parts)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", strs.join("."))
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare_exact(other))
    }
}
