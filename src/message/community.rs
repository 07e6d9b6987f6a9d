//! The v1/v2c envelope: `SEQUENCE { version, community OCTET STRING, pdu }`.

use crate::ber::{tag, BerBuffer};
use crate::error::{Error, Kind};
use crate::pdu::Pdu;

use super::{parse_integer, parse_octet_string, push_integer, push_octet_string, Version};

/// A v1/v2c community-wrapped message.
#[derive(Clone, Debug)]
pub struct CommunityMessage {
    pub version: Version,
    pub community: String,
    pub pdu: Pdu,
}

impl CommunityMessage {
    pub fn new(version: Version, community: impl Into<String>, pdu: Pdu) -> Self {
        Self {
            version,
            community: community.into(),
            pdu,
        }
    }

    pub fn encode(&mut self) -> Result<Vec<u8>, Error> {
        let mut inner = Vec::new();
        push_integer(&mut inner, self.version.to_i64());
        push_octet_string(&mut inner, self.community.as_bytes());
        self.pdu.encode(&mut inner);

        let mut buf = Vec::new();
        crate::ber::build_header(&mut buf, tag::SEQUENCE, inner.len());
        buf.extend_from_slice(&inner);
        Ok(buf)
    }

    /// Decodes a message, rejecting a version that does not match
    /// `expected_version` or a PDU tag outside the accepted set for it.
    pub fn decode(bytes: &[u8], expected_version: Version) -> Result<Self, Error> {
        let buf = BerBuffer::from(bytes.to_vec());
        let mut offset = 0;

        let (found, len) = crate::ber::parse_header(&buf, &mut offset)?;
        if !found.is(tag::SEQUENCE) {
            return Err(Kind::decoding("expected outer SEQUENCE").into());
        }
        let end = offset + len;

        let version_raw = parse_integer(&buf, &mut offset)?;
        let version = Version::from_i64(version_raw).ok_or_else(|| Error::from(Kind::InvalidVersion { version: version_raw }))?;
        if version != expected_version {
            return Err(Kind::InvalidVersion { version: version_raw }.into());
        }

        let community = parse_octet_string(&buf, &mut offset)?;
        let community = String::from_utf8_lossy(&community).into_owned();

        let pdu = Pdu::decode(&buf, &mut offset)?;
        let allowed = match version {
            Version::V1 => pdu.pdu_type().allowed_in_v1(),
            Version::V2c => pdu.pdu_type().allowed_in_v2c(),
            Version::V3 => unreachable!("community messages are never v3"),
        };
        if !allowed {
            return Err(Kind::InvalidPduType {
                tag: pdu.pdu_type().tag().to_byte(),
            }
            .into());
        }

        if offset != end {
            return Err(Kind::decoding("community message length mismatch").into());
        }

        Ok(Self {
            version,
            community,
            pdu,
        })
    }
}
