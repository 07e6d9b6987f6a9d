//! Message envelopes: the v1/v2c community wrapper and the v3 USM wrapper
//! around a [`crate::pdu::Pdu`].

pub mod community;
pub mod v3;

use crate::ber::{tag, BerBuffer};
use crate::error::{Error, Kind};

pub use community::CommunityMessage;
pub use v3::V3Message;

pub(crate) fn push_integer(buf: &mut Vec<u8>, value: i64) {
    let content = crate::ber::int::encode_signed(value);
    crate::ber::build_header(buf, tag::INTEGER, content.len());
    buf.extend_from_slice(&content);
}

pub(crate) fn parse_integer(buf: &BerBuffer, offset: &mut usize) -> Result<i64, Error> {
    let (found, len) = crate::ber::parse_header(buf, offset)?;
    if !found.is(tag::INTEGER) {
        return Err(Kind::decoding("expected INTEGER").into());
    }
    let content = buf.slice(*offset, len)?;
    *offset += len;
    Ok(crate::ber::int::decode_signed(content))
}

pub(crate) fn push_octet_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    crate::ber::build_header(buf, tag::OCTET_STRING, bytes.len());
    buf.extend_from_slice(bytes);
}

pub(crate) fn parse_octet_string(buf: &BerBuffer, offset: &mut usize) -> Result<Vec<u8>, Error> {
    let (found, len) = crate::ber::parse_header(buf, offset)?;
    if !found.is(tag::OCTET_STRING) {
        return Err(Kind::decoding("expected OCTET STRING").into());
    }
    let content = buf.slice(*offset, len)?.to_vec();
    *offset += len;
    Ok(content)
}

/// The SNMP protocol version an envelope carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Version {
    V1,
    V2c,
    V3,
}

impl Version {
    pub(crate) fn to_i64(self) -> i64 {
        match self {
            Version::V1 => 0,
            Version::V2c => 1,
            Version::V3 => 3,
        }
    }

    pub(crate) fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Version::V1),
            1 => Some(Version::V2c),
            3 => Some(Version::V3),
            _ => None,
        }
    }
}
