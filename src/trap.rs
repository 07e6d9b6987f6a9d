//! One-shot, fire-and-forget notification sending: encode, send, done. No
//! retry and no reply is read back, unlike [`crate::transport`].

use std::net::{SocketAddr, UdpSocket};

use crate::ber::tag;
use crate::error::{Error, Kind};
use crate::message::{push_integer, push_octet_string, V3Message, Version};
use crate::pdu::{Pdu, PduType, TrapV1Pdu};
use crate::target::SecureTarget;

/// Sends a v1 Trap-PDU under the given community.
pub fn send_v1(socket: &UdpSocket, peer: SocketAddr, community: &str, trap: &TrapV1Pdu) -> Result<(), Error> {
    let mut inner = Vec::new();
    push_integer(&mut inner, Version::V1.to_i64());
    push_octet_string(&mut inner, community.as_bytes());
    trap.encode(&mut inner);

    let mut buf = Vec::new();
    crate::ber::build_header(&mut buf, tag::SEQUENCE, inner.len());
    buf.extend_from_slice(&inner);

    socket.send_to(&buf, peer).map_err(|e| network_error(peer, &e))?;
    Ok(())
}

/// Sends a v2c V2Trap-PDU under the given community. `pdu` must already
/// carry `sysUpTime`/`snmpTrapOID` (via [`Pdu::set_notification`]) or have
/// them spliced automatically on encode.
pub fn send_v2c(socket: &UdpSocket, peer: SocketAddr, community: &str, pdu: Pdu) -> Result<(), Error> {
    require_v2trap(&pdu)?;
    let mut message = crate::message::CommunityMessage::new(Version::V2c, community, pdu);
    let bytes = message.encode()?;
    socket.send_to(&bytes, peer).map_err(|e| network_error(peer, &e))?;
    Ok(())
}

/// Sends a v3 V2Trap-PDU. `target`'s cached USM keys are (re)derived if
/// necessary; engine state is not mutated since a trap receives no reply
/// to discover from.
pub fn send_v3(socket: &UdpSocket, peer: SocketAddr, target: &mut SecureTarget, pdu: Pdu) -> Result<(), Error> {
    require_v2trap(&pdu)?;
    target.build_cached_security_keys()?;
    let auth_key = target.cached_auth_key().map(|k| k.to_vec());
    let priv_key = target.cached_priv_key().map(|k| k.to_vec());

    let mut message = V3Message {
        msg_id: rand::random::<i32>() & 0x7FFF_FFFF,
        max_msg_size: target.max_message_size,
        auth: target.auth_protocol != crate::usm::AuthProtocol::None,
        priv_enabled: target.priv_protocol != crate::usm::PrivProtocol::None,
        reportable: false,
        auth_protocol: target.auth_protocol,
        priv_protocol: target.priv_protocol,
        engine_id: target.engine_id.clone(),
        engine_boots: target.engine_boots,
        engine_time: target.adjusted_engine_time(),
        user_name: target.security_name.clone(),
        context_engine_id: target.effective_context_engine_id().to_vec(),
        context_name: target.context_name.clone(),
        pdu,
    };

    let bytes = message.encode(auth_key.as_deref(), priv_key.as_deref())?;
    socket.send_to(&bytes, peer).map_err(|e| network_error(peer, &e))?;
    Ok(())
}

fn require_v2trap(pdu: &Pdu) -> Result<(), Error> {
    if pdu.pdu_type() != PduType::V2Trap {
        return Err(Kind::InvalidPduType { tag: pdu.pdu_type().tag().to_byte() }.into());
    }
    Ok(())
}

fn network_error(peer: SocketAddr, err: &std::io::Error) -> Error {
    Kind::NetworkError {
        peer: peer.to_string(),
        message: err.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::Oid;
    use crate::smi::SmiValue;

    #[test]
    fn rejects_wrong_pdu_type_for_v2c_trap() {
        let pdu = Pdu::new(PduType::GetRequest);
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();
        assert!(send_v2c(&socket, peer, "public", pdu).is_err());
    }

    #[test]
    fn sends_v1_trap_over_loopback() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_read_timeout(Some(std::time::Duration::from_secs(2))).unwrap();
        let receiver_addr = receiver.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut trap = TrapV1Pdu::new(
            Oid::parse("1.3.6.1.4.1.9").unwrap(),
            [192, 0, 2, 1],
            crate::pdu::GenericTrap::ColdStart,
            0,
        );
        trap.add_vb(Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(), SmiValue::Null);

        send_v1(&sender, receiver_addr, "public", &trap).unwrap();

        let mut buf = vec![0u8; 2048];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        assert!(len > 0);
    }
}
