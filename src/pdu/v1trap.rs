//! The SNMPv1 Trap-PDU, a layout distinct enough from every other PDU
//! (no request-id, no error-status) that it gets its own type rather than
//! another [`super::PduFields`] variant.

use crate::ber::{tag, BerBuffer};
use crate::error::{Error, Kind};
use crate::oid::Oid;
use crate::smi::SmiValue;

use super::{decode_vb_list, encode_vb_list, VarBind};

/// The standard `generic-trap` codes of RFC 1157; `Enterprise(6)` carries
/// an enterprise-specific code in [`TrapV1Pdu::specific_trap`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GenericTrap {
    ColdStart,
    WarmStart,
    LinkDown,
    LinkUp,
    AuthenticationFailure,
    EgpNeighborLoss,
    EnterpriseSpecific,
}

impl GenericTrap {
    fn to_i32(self) -> i32 {
        match self {
            GenericTrap::ColdStart => 0,
            GenericTrap::WarmStart => 1,
            GenericTrap::LinkDown => 2,
            GenericTrap::LinkUp => 3,
            GenericTrap::AuthenticationFailure => 4,
            GenericTrap::EgpNeighborLoss => 5,
            GenericTrap::EnterpriseSpecific => 6,
        }
    }

    fn from_i32(value: i32) -> Result<Self, Error> {
        Ok(match value {
            0 => GenericTrap::ColdStart,
            1 => GenericTrap::WarmStart,
            2 => GenericTrap::LinkDown,
            3 => GenericTrap::LinkUp,
            4 => GenericTrap::AuthenticationFailure,
            5 => GenericTrap::EgpNeighborLoss,
            6 => GenericTrap::EnterpriseSpecific,
            other => return Err(Kind::decoding(format!("unknown generic-trap code {other}")).into()),
        })
    }
}

/// A v1 Trap-PDU (context tag 4): enterprise OID, the sending agent's
/// address, a generic/specific trap code pair, an uptime timestamp, and a
/// variable-binding list.
#[derive(Clone, Debug, PartialEq)]
pub struct TrapV1Pdu {
    pub enterprise: Oid,
    pub agent_addr: [u8; 4],
    pub generic_trap: GenericTrap,
    pub specific_trap: i32,
    pub time_stamp: u32,
    pub var_binds: Vec<VarBind>,
}

impl TrapV1Pdu {
    pub fn new(enterprise: Oid, agent_addr: [u8; 4], generic_trap: GenericTrap, time_stamp: u32) -> Self {
        Self {
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap: 0,
            time_stamp,
            var_binds: Vec::new(),
        }
    }

    pub fn add_vb(&mut self, oid: Oid, value: SmiValue) {
        self.var_binds.push(VarBind::new(oid, value));
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        let mut inner = Vec::new();
        self.enterprise.encode(&mut inner);

        crate::ber::build_header(&mut inner, tag::IP_ADDRESS, 4);
        inner.extend_from_slice(&self.agent_addr);

        push_integer(&mut inner, self.generic_trap.to_i32() as i64);
        push_integer(&mut inner, self.specific_trap as i64);

        let timestamp_content = crate::ber::int::encode_unsigned32(self.time_stamp);
        crate::ber::build_header(&mut inner, tag::TIME_TICKS, timestamp_content.len());
        inner.extend_from_slice(&timestamp_content);

        encode_vb_list(&self.var_binds, &mut inner);

        crate::ber::build_header(buf, tag::PDU_TRAP_V1, inner.len());
        buf.extend_from_slice(&inner);
    }

    pub fn decode(buf: &BerBuffer, offset: &mut usize) -> Result<Self, Error> {
        let (found, len) = crate::ber::parse_header(buf, offset)?;
        if !found.is(tag::PDU_TRAP_V1) {
            return Err(Error::from(Kind::InvalidPduType { tag: found.to_byte() }));
        }
        let end = *offset + len;

        let enterprise = Oid::decode(buf, offset)?;

        let (addr_tag, addr_len) = crate::ber::parse_header(buf, offset)?;
        if !addr_tag.is(tag::IP_ADDRESS) || addr_len != 4 {
            return Err(Kind::decoding("expected a 4-byte IpAddress for agent-addr").into());
        }
        let mut agent_addr = [0u8; 4];
        agent_addr.copy_from_slice(buf.slice(*offset, 4)?);
        *offset += 4;

        let generic_trap = GenericTrap::from_i32(parse_integer(buf, offset)? as i32)?;
        let specific_trap = parse_integer(buf, offset)? as i32;

        let (ts_tag, ts_len) = crate::ber::parse_header(buf, offset)?;
        if !ts_tag.is(tag::TIME_TICKS) {
            return Err(Kind::decoding("expected TimeTicks for trap time-stamp").into());
        }
        let time_stamp = crate::ber::int::decode_unsigned(buf.slice(*offset, ts_len)?) as u32;
        *offset += ts_len;

        let var_binds = decode_vb_list(buf, offset)?;
        if *offset != end {
            return Err(Kind::decoding("v1 Trap-PDU length mismatch").into());
        }

        Ok(Self {
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap,
            time_stamp,
            var_binds,
        })
    }
}

fn push_integer(buf: &mut Vec<u8>, value: i64) {
    let content = crate::ber::int::encode_signed(value);
    crate::ber::build_header(buf, tag::INTEGER, content.len());
    buf.extend_from_slice(&content);
}

fn parse_integer(buf: &BerBuffer, offset: &mut usize) -> Result<i64, Error> {
    let (found, len) = crate::ber::parse_header(buf, offset)?;
    if !found.is(tag::INTEGER) {
        return Err(Kind::decoding("expected INTEGER").into());
    }
    let content = buf.slice(*offset, len)?;
    *offset += len;
    Ok(crate::ber::int::decode_signed(content))
}
