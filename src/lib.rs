//! A client-side SNMPv1/v2c/v3 message codec, USM security, and UDP
//! transport.
//!
//! The crate is layered bottom-up: [`ber`] is the TLV codec, [`smi`] and
//! [`oid`] are the value model built on it, [`pdu`] assembles variable
//! bindings into a PDU, [`message`] wraps a PDU in a v1/v2c community
//! envelope or a v3 USM envelope ([`usm`]), and [`transport`] drives a UDP
//! socket through the request/retry state machine described in the design
//! document. [`trap`] is the one-shot notification sender. [`target`]
//! holds the per-agent parameters ([`target::CommunityTarget`] /
//! [`target::SecureTarget`]) that [`transport`] and [`trap`] consume.
//!
//! The five functions below are the surface this crate exposes to a
//! higher-level "simple" API (MIB-aware walking, output formatting) that
//! is out of scope here.

pub mod ber;
pub mod constants;
pub mod error;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod smi;
pub mod target;
pub mod trap;
pub mod transport;
pub mod usm;

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

pub use error::{Error, Kind};
pub use oid::Oid;
pub use pdu::{Pdu, PduType, VarBind};
pub use smi::SmiValue;

use message::Version;
use target::{CommunityTarget, SecureTarget};

/// The agent-parameters half of a request: which envelope to build and
/// which credentials to populate it with.
pub enum Target {
    Community(CommunityTarget),
    Secure(SecureTarget),
}

impl Target {
    fn community_version(&self) -> Option<Version> {
        match self {
            Target::Community(t) if t.version_is_v2c => Some(Version::V2c),
            Target::Community(_) => Some(Version::V1),
            Target::Secure(_) => None,
        }
    }
}

fn dispatch(socket: &UdpSocket, peer: SocketAddr, target: &mut Target, pdu: Pdu, timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
    match (target.community_version(), target) {
        (Some(version), Target::Community(community)) => transport::sync::request_community(socket, peer, version, community, pdu, timeout, max_retries),
        (None, Target::Secure(secure)) => transport::sync::request_secure(socket, peer, secure, pdu, timeout, max_retries),
        _ => unreachable!("community_version() and the Target variant always agree"),
    }
}

fn get_request(oids: &[Oid], pdu_type: PduType) -> Pdu {
    let mut pdu = Pdu::new(pdu_type);
    for oid in oids {
        pdu.add_vb(oid.clone(), SmiValue::Null);
    }
    pdu
}

/// SNMP GET: fetches the values at `oids`.
pub fn get(socket: &UdpSocket, peer: SocketAddr, target: &mut Target, oids: &[Oid], timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
    dispatch(socket, peer, target, get_request(oids, PduType::GetRequest), timeout, max_retries)
}

/// SNMP GET-NEXT: fetches the lexicographic successor of each OID in
/// `oids`.
pub fn get_next(socket: &UdpSocket, peer: SocketAddr, target: &mut Target, oids: &[Oid], timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
    dispatch(socket, peer, target, get_request(oids, PduType::GetNextRequest), timeout, max_retries)
}

/// SNMP GET-BULK (v2c/v3 only): `non_repeaters` OIDs are walked once,
/// the remainder up to `max_repetitions` times each.
pub fn get_bulk(socket: &UdpSocket, peer: SocketAddr, target: &mut Target, oids: &[Oid], non_repeaters: i32, max_repetitions: i32, timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
    let mut pdu = get_request(oids, PduType::GetBulkRequest);
    pdu.set_bulk_params(non_repeaters, max_repetitions)?;
    dispatch(socket, peer, target, pdu, timeout, max_retries)
}

/// SNMP SET: writes `bindings` and returns the agent's Response PDU.
pub fn set(socket: &UdpSocket, peer: SocketAddr, target: &mut Target, bindings: Vec<(Oid, SmiValue)>, timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
    let mut pdu = Pdu::new(PduType::SetRequest);
    for (oid, value) in bindings {
        pdu.add_vb(oid, value);
    }
    dispatch(socket, peer, target, pdu, timeout, max_retries)
}

/// Sends a one-shot trap/notification; see [`trap`] for the per-version
/// entry points this wraps.
pub fn send_trap(socket: &UdpSocket, peer: SocketAddr, target: &mut Target, notification: Notification) -> Result<(), Error> {
    match (target, notification) {
        (Target::Community(community), Notification::V1(trap_pdu)) => trap::send_v1(socket, peer, &community.community, &trap_pdu),
        (Target::Community(community), Notification::V2(pdu)) => trap::send_v2c(socket, peer, &community.community, pdu),
        (Target::Secure(secure), Notification::V2(pdu)) => trap::send_v3(socket, peer, secure, pdu),
        (Target::Secure(_), Notification::V1(_)) => Err(Kind::InvalidTargetParameters {
            reason: "a v1 Trap-PDU cannot be sent over a v3 target".to_string(),
        }
        .into()),
    }
}

/// The notification payload passed to [`send_trap`]: a v1 Trap-PDU (its own
/// wire layout) or a v2/v3 V2Trap-PDU (the standard PDU shape).
pub enum Notification {
    V1(pdu::TrapV1Pdu),
    V2(Pdu),
}
