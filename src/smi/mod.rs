//! The SMI value model: a tagged sum type over every SNMP data type, each
//! variant knowing its own tag and how to encode/decode itself.
//!
//! This replaces the source library's `AsnType` object-graph hierarchy with
//! shared mutable references and copy constructors: here a value is a
//! plain enum, `Clone` is a structural value copy, and there is no runtime
//! polymorphism. Tag-to-variant dispatch (`decode`) is a pure function over
//! `(class, number)`, not a lookup table built at startup.

use crate::ber::int::{decode_signed, decode_unsigned, encode_signed, encode_unsigned32, encode_unsigned64};
use crate::ber::{tag, BerBuffer, Tag};
use crate::error::{Error, Kind};
use crate::oid::Oid;

/// A single SNMP value, tagged with its SMI type.
#[derive(Clone, Debug, PartialEq)]
pub enum SmiValue {
    Integer32(i32),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    /// Legacy SNMPv1 Party Clock (obsolete, decode-only); carried as raw
    /// content bytes since no production code constructs one.
    PartyClock(Vec<u8>),
    /// SMIv2 exception: no instance of this object currently exists.
    NoSuchObject,
    /// SMIv2 exception: the object exists but this instance does not.
    NoSuchInstance,
    /// SMIv2 exception: the lexicographic successor is outside the MIB view.
    EndOfMibView,
}

/// Alias matching the SMI name for `Gauge32`.
pub type Unsigned32 = u32;

impl SmiValue {
    pub fn tag(&self) -> Tag {
        match self {
            SmiValue::Integer32(_) => tag::INTEGER,
            SmiValue::OctetString(_) => tag::OCTET_STRING,
            SmiValue::Null => tag::NULL,
            SmiValue::ObjectIdentifier(_) => tag::OBJECT_IDENTIFIER,
            SmiValue::IpAddress(_) => tag::IP_ADDRESS,
            SmiValue::Counter32(_) => tag::COUNTER32,
            SmiValue::Gauge32(_) => tag::GAUGE32,
            SmiValue::TimeTicks(_) => tag::TIME_TICKS,
            SmiValue::Opaque(_) => tag::OPAQUE,
            SmiValue::Counter64(_) => tag::COUNTER64,
            SmiValue::PartyClock(_) => tag::PARTY_CLOCK,
            SmiValue::NoSuchObject => tag::NO_SUCH_OBJECT,
            SmiValue::NoSuchInstance => tag::NO_SUCH_INSTANCE,
            SmiValue::EndOfMibView => tag::END_OF_MIB_VIEW,
        }
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            SmiValue::Integer32(n) => {
                let content = encode_signed(*n as i64);
                crate::ber::build_header(buf, self.tag(), content.len());
                buf.extend_from_slice(&content);
            }
            SmiValue::OctetString(bytes) | SmiValue::Opaque(bytes) | SmiValue::PartyClock(bytes) => {
                crate::ber::build_header(buf, self.tag(), bytes.len());
                buf.extend_from_slice(bytes);
            }
            SmiValue::Null | SmiValue::NoSuchObject | SmiValue::NoSuchInstance | SmiValue::EndOfMibView => {
                crate::ber::build_header(buf, self.tag(), 0);
            }
            SmiValue::ObjectIdentifier(oid) => oid.encode(buf),
            SmiValue::IpAddress(bytes) => {
                crate::ber::build_header(buf, self.tag(), 4);
                buf.extend_from_slice(bytes);
            }
            SmiValue::Counter32(n) | SmiValue::Gauge32(n) | SmiValue::TimeTicks(n) => {
                let content = encode_unsigned32(*n);
                crate::ber::build_header(buf, self.tag(), content.len());
                buf.extend_from_slice(&content);
            }
            SmiValue::Counter64(n) => {
                let content = encode_unsigned64(*n);
                crate::ber::build_header(buf, self.tag(), content.len());
                buf.extend_from_slice(&content);
            }
        }
    }

    /// Parses one TLV at `buf[*offset]`, dispatching on its tag to build
    /// the matching variant, and advances `offset` past it.
    pub fn decode(buf: &BerBuffer, offset: &mut usize) -> Result<Self, Error> {
        let (found, len) = crate::ber::parse_header(buf, offset)?;
        let content = buf.slice(*offset, len)?;
        let value = decode_content(found, content)?;
        *offset += len;
        Ok(value)
    }
}

fn decode_content(found: Tag, content: &[u8]) -> Result<SmiValue, Error> {
    if found.is(tag::INTEGER) {
        return Ok(SmiValue::Integer32(decode_signed(content) as i32));
    }
    if found.is(tag::OCTET_STRING) {
        return Ok(SmiValue::OctetString(content.to_vec()));
    }
    if found.is(tag::NULL) {
        return Ok(SmiValue::Null);
    }
    if found.is(tag::OBJECT_IDENTIFIER) {
        return Ok(SmiValue::ObjectIdentifier(Oid::decode_content(content)?));
    }
    if found.is(tag::IP_ADDRESS) {
        if content.len() != 4 {
            return Err(Kind::decoding(format!(
                "IpAddress must be 4 bytes, got {}",
                content.len()
            ))
            .into());
        }
        let mut ip = [0u8; 4];
        ip.copy_from_slice(content);
        return Ok(SmiValue::IpAddress(ip));
    }
    if found.is(tag::COUNTER32) {
        return Ok(SmiValue::Counter32(decode_unsigned(content) as u32));
    }
    if found.is(tag::GAUGE32) {
        return Ok(SmiValue::Gauge32(decode_unsigned(content) as u32));
    }
    if found.is(tag::TIME_TICKS) {
        return Ok(SmiValue::TimeTicks(decode_unsigned(content) as u32));
    }
    if found.is(tag::OPAQUE) {
        return Ok(SmiValue::Opaque(content.to_vec()));
    }
    if found.is(tag::COUNTER64) {
        return Ok(SmiValue::Counter64(decode_unsigned(content)));
    }
    if found.is(tag::PARTY_CLOCK) {
        return Ok(SmiValue::PartyClock(content.to_vec()));
    }
    if found.is(tag::NO_SUCH_OBJECT) {
        return Ok(SmiValue::NoSuchObject);
    }
    if found.is(tag::NO_SUCH_INSTANCE) {
        return Ok(SmiValue::NoSuchInstance);
    }
    if found.is(tag::END_OF_MIB_VIEW) {
        return Ok(SmiValue::EndOfMibView);
    }
    Err(Kind::decoding(format!("unknown SMI tag {:#x}", found.to_byte())).into())
}

impl From<i32> for SmiValue {
    fn from(v: i32) -> Self {
        SmiValue::Integer32(v)
    }
}

impl From<Vec<u8>> for SmiValue {
    fn from(v: Vec<u8>) -> Self {
        SmiValue::OctetString(v)
    }
}

impl From<&str> for SmiValue {
    fn from(v: &str) -> Self {
        SmiValue::OctetString(v.as_bytes().to_vec())
    }
}

impl From<Oid> for SmiValue {
    fn from(v: Oid) -> Self {
        SmiValue::ObjectIdentifier(v)
    }
}
