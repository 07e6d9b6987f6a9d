//! The PDU: variable-binding list, request-id, and the error-status/index
//! pair that GET-BULK overloads as non-repeaters/max-repetitions.
//!
//! The source stores GET-BULK's tuning parameters in the same integer
//! slots as `error-status`/`error-index` and dispatches on PDU type at
//! runtime. Here that is a variant enum ([`PduFields`]); accessing the
//! wrong arm returns [`crate::error::Kind::InvalidPduOperation`] instead of
//! silently reinterpreting the bits.

mod v1trap;

use rand::Rng;

use crate::ber::{tag, BerBuffer, Tag};
use crate::constants::{SNMP_TRAP_OID, SYS_UP_TIME};
use crate::error::{Error, Kind};
use crate::oid::Oid;
use crate::smi::SmiValue;

pub use v1trap::{GenericTrap, TrapV1Pdu};

/// The PDU operation this message carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PduType {
    GetRequest,
    GetNextRequest,
    Response,
    SetRequest,
    GetBulkRequest,
    InformRequest,
    V2Trap,
    Report,
}

impl PduType {
    pub(crate) fn tag(self) -> Tag {
        match self {
            PduType::GetRequest => tag::PDU_GET_REQUEST,
            PduType::GetNextRequest => tag::PDU_GET_NEXT_REQUEST,
            PduType::Response => tag::PDU_RESPONSE,
            PduType::SetRequest => tag::PDU_SET_REQUEST,
            PduType::GetBulkRequest => tag::PDU_GET_BULK_REQUEST,
            PduType::InformRequest => tag::PDU_INFORM_REQUEST,
            PduType::V2Trap => tag::PDU_TRAP_V2,
            PduType::Report => tag::PDU_REPORT,
        }
    }

    pub(crate) fn from_tag(found: Tag) -> Option<Self> {
        for candidate in [
            PduType::GetRequest,
            PduType::GetNextRequest,
            PduType::Response,
            PduType::SetRequest,
            PduType::GetBulkRequest,
            PduType::InformRequest,
            PduType::V2Trap,
            PduType::Report,
        ] {
            if found.is(candidate.tag()) {
                return Some(candidate);
            }
        }
        None
    }

    /// PDU types valid inside a v1 community message.
    pub fn allowed_in_v1(self) -> bool {
        matches!(
            self,
            PduType::GetRequest | PduType::GetNextRequest | PduType::SetRequest | PduType::Response
        )
    }

    /// PDU types valid inside a v2c community message.
    pub fn allowed_in_v2c(self) -> bool {
        self.allowed_in_v1()
            || matches!(
                self,
                PduType::GetBulkRequest | PduType::V2Trap | PduType::InformRequest
            )
    }

    fn carries_notification_fields(self) -> bool {
        matches!(self, PduType::V2Trap | PduType::InformRequest | PduType::Response)
    }
}

/// One (OID, value) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: SmiValue,
}

impl VarBind {
    pub fn new(oid: Oid, value: SmiValue) -> Self {
        Self { oid, value }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        let mut content = Vec::new();
        self.oid.encode(&mut content);
        self.value.encode(&mut content);
        crate::ber::build_header(buf, tag::SEQUENCE, content.len());
        buf.extend_from_slice(&content);
    }

    fn decode(buf: &BerBuffer, offset: &mut usize) -> Result<Self, Error> {
        let (found, len) = crate::ber::parse_header(buf, offset)?;
        if !found.is(tag::SEQUENCE) {
            return Err(Kind::decoding("expected SEQUENCE for a variable binding").into());
        }
        let end = *offset + len;
        let oid = Oid::decode(buf, offset)?;
        let value = SmiValue::decode(buf, offset)?;
        if *offset != end {
            return Err(Kind::decoding("trailing bytes in variable binding").into());
        }
        Ok(Self { oid, value })
    }
}

fn encode_vb_list(var_binds: &[VarBind], buf: &mut Vec<u8>) {
    let mut content = Vec::new();
    for vb in var_binds {
        vb.encode(&mut content);
    }
    crate::ber::build_header(buf, tag::SEQUENCE, content.len());
    buf.extend_from_slice(&content);
}

fn decode_vb_list(buf: &BerBuffer, offset: &mut usize) -> Result<Vec<VarBind>, Error> {
    let (found, len) = crate::ber::parse_header(buf, offset)?;
    if !found.is(tag::SEQUENCE) {
        return Err(Kind::decoding("expected SEQUENCE for a variable-binding list").into());
    }
    let end = *offset + len;
    let mut out = Vec::new();
    while *offset < end {
        out.push(VarBind::decode(buf, offset)?);
    }
    if *offset != end {
        return Err(Kind::decoding("variable-binding list length mismatch").into());
    }
    Ok(out)
}

/// The dual-use error-status/index slots, modeled as a variant rather than
/// two integers reinterpreted at runtime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PduFields {
    Standard { error_status: i32, error_index: i32 },
    Bulk { non_repeaters: i32, max_repetitions: i32 },
}

/// The notification-only `sysUpTime`/`snmpTrapOID` pair that the codec
/// splices in as the first two variable bindings of a V2Trap, Inform, or
/// Inform-response PDU.
#[derive(Clone, Debug, PartialEq)]
pub struct NotificationFields {
    pub sys_up_time: u32,
    pub trap_oid: Oid,
}

/// A GET/GET-NEXT/GET-BULK/SET/Response/Inform/V2Trap/Report PDU.
#[derive(Clone, Debug)]
pub struct Pdu {
    pdu_type: PduType,
    request_id: i32,
    fields: PduFields,
    var_binds: Vec<VarBind>,
    notification: Option<NotificationFields>,
}

impl Pdu {
    /// Builds a fresh PDU with a random non-zero request-id. GET-BULK PDUs
    /// default to `non_repeaters = 0`, `max_repetitions = 100`.
    pub fn new(pdu_type: PduType) -> Self {
        let fields = if pdu_type == PduType::GetBulkRequest {
            PduFields::Bulk {
                non_repeaters: 0,
                max_repetitions: 100,
            }
        } else {
            PduFields::Standard {
                error_status: 0,
                error_index: 0,
            }
        };
        Self {
            pdu_type,
            request_id: random_nonzero_i32(),
            fields,
            var_binds: Vec::new(),
            notification: None,
        }
    }

    pub fn pdu_type(&self) -> PduType {
        self.pdu_type
    }

    pub fn request_id(&self) -> i32 {
        self.request_id
    }

    pub fn set_request_id(&mut self, request_id: i32) {
        self.request_id = request_id;
    }

    pub fn var_binds(&self) -> &[VarBind] {
        &self.var_binds
    }

    pub fn add_vb(&mut self, oid: Oid, value: SmiValue) {
        self.var_binds.push(VarBind::new(oid, value));
    }

    pub fn error_status(&self) -> Result<i32, Error> {
        match self.fields {
            PduFields::Standard { error_status, .. } => Ok(error_status),
            PduFields::Bulk { .. } => Err(invalid_op("error_status")),
        }
    }

    pub fn error_index(&self) -> Result<i32, Error> {
        match self.fields {
            PduFields::Standard { error_index, .. } => Ok(error_index),
            PduFields::Bulk { .. } => Err(invalid_op("error_index")),
        }
    }

    pub fn set_error_status(&mut self, error_status: i32, error_index: i32) -> Result<(), Error> {
        match &mut self.fields {
            PduFields::Standard {
                error_status: es,
                error_index: ei,
            } => {
                *es = error_status;
                *ei = error_index;
                Ok(())
            }
            PduFields::Bulk { .. } => Err(invalid_op("set_error_status")),
        }
    }

    pub fn non_repeaters(&self) -> Result<i32, Error> {
        match self.fields {
            PduFields::Bulk { non_repeaters, .. } => Ok(non_repeaters),
            PduFields::Standard { .. } => Err(invalid_op("non_repeaters")),
        }
    }

    pub fn max_repetitions(&self) -> Result<i32, Error> {
        match self.fields {
            PduFields::Bulk { max_repetitions, .. } => Ok(max_repetitions),
            PduFields::Standard { .. } => Err(invalid_op("max_repetitions")),
        }
    }

    pub fn set_bulk_params(&mut self, non_repeaters: i32, max_repetitions: i32) -> Result<(), Error> {
        match &mut self.fields {
            PduFields::Bulk {
                non_repeaters: nr,
                max_repetitions: mr,
            } => {
                *nr = non_repeaters;
                *mr = max_repetitions;
                Ok(())
            }
            PduFields::Standard { .. } => Err(invalid_op("set_bulk_params")),
        }
    }

    /// Sets the `sysUpTime`/`snmpTrapOID` pair carried by V2Trap, Inform
    /// and Inform-response PDUs.
    pub fn set_notification(&mut self, sys_up_time: u32, trap_oid: Oid) -> Result<(), Error> {
        if !self.pdu_type.carries_notification_fields() {
            return Err(invalid_op("set_notification"));
        }
        self.notification = Some(NotificationFields {
            sys_up_time,
            trap_oid,
        });
        Ok(())
    }

    pub fn sys_up_time(&self) -> Result<u32, Error> {
        if !self.pdu_type.carries_notification_fields() {
            return Err(invalid_op("sys_up_time"));
        }
        Ok(self.notification.as_ref().map_or(0, |n| n.sys_up_time))
    }

    pub fn trap_object_id(&self) -> Result<&Oid, Error> {
        if !self.pdu_type.carries_notification_fields() {
            return Err(invalid_op("trap_object_id"));
        }
        Ok(self.notification.as_ref().map_or(&NULL_OID, |n| &n.trap_oid))
    }

    /// Encodes the PDU to `buf`. Draws a fresh non-zero request-id first if
    /// one was never set, and splices the notification pair in as the
    /// first two variable bindings for V2Trap/Inform types.
    pub fn encode(&mut self, buf: &mut Vec<u8>) {
        if self.request_id == 0 {
            self.request_id = random_nonzero_i32();
        }

        let mut inner = Vec::new();
        push_integer(&mut inner, self.request_id as i64);
        match self.fields {
            PduFields::Standard {
                error_status,
                error_index,
            } => {
                push_integer(&mut inner, error_status as i64);
                push_integer(&mut inner, error_index as i64);
            }
            PduFields::Bulk {
                non_repeaters,
                max_repetitions,
            } => {
                push_integer(&mut inner, non_repeaters as i64);
                push_integer(&mut inner, max_repetitions as i64);
            }
        }

        let effective_vbs = self.effective_var_binds_for_encode();
        encode_vb_list(&effective_vbs, &mut inner);

        crate::ber::build_header(buf, self.pdu_type.tag(), inner.len());
        buf.extend_from_slice(&inner);
    }

    fn effective_var_binds_for_encode(&self) -> Vec<VarBind> {
        if !self.pdu_type.carries_notification_fields() {
            return self.var_binds.clone();
        }
        let Some(notification) = &self.notification else {
            return self.var_binds.clone();
        };
        let already_spliced = self
            .var_binds
            .first()
            .map(|vb| vb.oid == *SYS_UP_TIME)
            .unwrap_or(false);
        if already_spliced {
            return self.var_binds.clone();
        }
        let mut out = Vec::with_capacity(self.var_binds.len() + 2);
        out.push(VarBind::new(
            SYS_UP_TIME.clone(),
            SmiValue::TimeTicks(notification.sys_up_time),
        ));
        out.push(VarBind::new(
            SNMP_TRAP_OID.clone(),
            SmiValue::ObjectIdentifier(notification.trap_oid.clone()),
        ));
        out.extend(self.var_binds.iter().cloned());
        out
    }

    /// Decodes a PDU at `buf[*offset]`, advancing past it.
    pub fn decode(buf: &BerBuffer, offset: &mut usize) -> Result<Self, Error> {
        let (found, len) = crate::ber::parse_header(buf, offset)?;
        let pdu_type = PduType::from_tag(found)
            .ok_or_else(|| Error::from(Kind::InvalidPduType { tag: found.to_byte() }))?;
        let end = *offset + len;

        let request_id = parse_integer(buf, offset)? as i32;
        let slot_a = parse_integer(buf, offset)? as i32;
        let slot_b = parse_integer(buf, offset)? as i32;
        let fields = if pdu_type == PduType::GetBulkRequest {
            PduFields::Bulk {
                non_repeaters: slot_a,
                max_repetitions: slot_b,
            }
        } else {
            PduFields::Standard {
                error_status: slot_a,
                error_index: slot_b,
            }
        };

        let mut var_binds = decode_vb_list(buf, offset)?;
        if *offset != end {
            return Err(Kind::decoding("PDU length mismatch").into());
        }

        let notification = if pdu_type.carries_notification_fields() && var_binds.len() >= 2 {
            if var_binds[0].oid == *SYS_UP_TIME {
                let ts_vb = var_binds.remove(0);
                let oid_vb = var_binds.remove(0);
                let sys_up_time = match ts_vb.value {
                    SmiValue::TimeTicks(ts) => ts,
                    _ => 0,
                };
                let trap_oid = match oid_vb.value {
                    SmiValue::ObjectIdentifier(oid) => oid,
                    _ => Oid::null(),
                };
                Some(NotificationFields {
                    sys_up_time,
                    trap_oid,
                })
            } else {
                None
            }
        } else {
            None
        };

        Ok(Self {
            pdu_type,
            request_id,
            fields,
            var_binds,
            notification,
        })
    }
}

// Placeholder referenced by `trap_object_id` when no notification has been
// set yet; kept as a `'static` so the accessor can return a plain
// reference rather than allocating on every call.
static NULL_OID: once_cell::sync::Lazy<Oid> = once_cell::sync::Lazy::new(Oid::null);

fn invalid_op(what: &'static str) -> Error {
    Kind::InvalidPduOperation { what }.into()
}

fn random_nonzero_i32() -> i32 {
    loop {
        let candidate = rand::thread_rng().gen::<i32>();
        if candidate != 0 {
            return candidate;
        }
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

impl PartialEq for Pdu {
    fn eq(&self, other: &Self) -> bool {
        if self.pdu_type != other.pdu_type || self.request_id != other.request_id {
            return false;
        }
        let mut mine: Vec<&Oid> = self.var_binds.iter().map(|vb| &vb.oid).collect();
        let mut theirs: Vec<&Oid> = other.var_binds.iter().map(|vb| &vb.oid).collect();
        mine.sort_by(|a, b| a.compare_exact(b));
        theirs.sort_by(|a, b| a.compare_exact(b));
        mine == theirs
    }
}

impl Eq for Pdu {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_get_request() {
        let mut pdu = Pdu::new(PduType::GetRequest);
        pdu.add_vb(Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(), SmiValue::Null);
        let mut buf = Vec::new();
        pdu.encode(&mut buf);
        let ber = BerBuffer::from(buf);
        let mut offset = 0;
        let decoded = Pdu::decode(&ber, &mut offset).unwrap();
        assert_eq!(decoded, pdu);
        assert_eq!(offset, ber.len());
    }

    #[test]
    fn get_bulk_defaults() {
        let pdu = Pdu::new(PduType::GetBulkRequest);
        assert_eq!(pdu.non_repeaters().unwrap(), 0);
        assert_eq!(pdu.max_repetitions().unwrap(), 100);
        assert!(pdu.error_status().is_err());
    }

    #[test]
    fn get_bulk_round_trip_matches_rfc_vector() {
        let mut pdu = Pdu::new(PduType::GetBulkRequest);
        pdu.set_request_id(1414684022);
        pdu.set_bulk_params(1, 2).unwrap();
        pdu.add_vb(Oid::parse("1.3.6.1.2.1.1.3").unwrap(), SmiValue::Null);
        pdu.add_vb(Oid::parse("1.3.6.1.2.1.4.22.1.2").unwrap(), SmiValue::Null);
        pdu.add_vb(Oid::parse("1.3.6.1.2.1.4.22.1.4").unwrap(), SmiValue::Null);

        let mut buf = Vec::new();
        pdu.encode(&mut buf);
        assert_eq!(
            buf,
            vec![
                0xA5, 0x39, 0x02, 0x04, 0x54, 0x52, 0x5d, 0x76, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02,
                0x30, 0x2b, 0x30, 0x0b, 0x06, 0x07, 0x2b, 0x06, 0x01, 0x02, 0x01, 0x01, 0x03, 0x05,
                0x00, 0x30, 0x0d, 0x06, 0x09, 0x2b, 0x06, 0x01, 0x02, 0x01, 0x04, 0x16, 0x01, 0x02,
                0x05, 0x00, 0x30, 0x0d, 0x06, 0x09, 0x2b, 0x06, 0x01, 0x02, 0x01, 0x04, 0x16, 0x01,
                0x04, 0x05, 0x00,
            ]
        );
    }

    #[test]
    fn v2trap_splices_notification_fields() {
        let mut pdu = Pdu::new(PduType::V2Trap);
        pdu.set_notification(11_932, Oid::parse("1.3.6.1.6.3.1.1.5.1").unwrap())
            .unwrap();
        pdu.add_vb(Oid::parse("1.3.6.1.2.1.1.5.0").unwrap(), SmiValue::OctetString(b"host".to_vec()));

        let mut buf = Vec::new();
        pdu.encode(&mut buf);
        let ber = BerBuffer::from(buf);
        let mut offset = 0;
        let decoded = Pdu::decode(&ber, &mut offset).unwrap();

        assert_eq!(decoded.sys_up_time().unwrap(), 11_932);
        assert_eq!(
            decoded.trap_object_id().unwrap(),
            &Oid::parse("1.3.6.1.6.3.1.1.5.1").unwrap()
        );
        assert_eq!(decoded.var_binds().len(), 1);
    }

    #[test]
    fn equality_ignores_values() {
        let mut a = Pdu::new(PduType::GetRequest);
        a.set_request_id(7);
        a.add_vb(Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(), SmiValue::Null);

        let mut b = Pdu::new(PduType::GetRequest);
        b.set_request_id(7);
        b.add_vb(
            Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(),
            SmiValue::OctetString(b"router".to_vec()),
        );

        assert_eq!(a, b);
    }

    #[test]
    fn invalid_operation_on_wrong_variant() {
        let pdu = Pdu::new(PduType::GetBulkRequest);
        assert!(pdu.error_status().is_err());
        let pdu = Pdu::new(PduType::GetRequest);
        assert!(pdu.non_repeaters().is_err());
        assert!(pdu.trap_object_id().is_err());
    }
}
