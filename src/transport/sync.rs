//! The blocking request path: one thread, one socket, one attempt at a
//! time.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::USM_STATS_UNKNOWN_ENGINE_IDS;
use crate::constants::USM_TIME_WINDOW_SECONDS;
use crate::error::{Error, Kind};
use crate::message::{CommunityMessage, V3Message, Version};
use crate::pdu::{Pdu, PduType};
use crate::target::{CommunityTarget, SecureTarget};

use super::{is_retryable, network_error, no_data, source_matches, timed_out};

/// Sends `bytes` to `peer` and blocks for a reply, retrying on timeout or a
/// source mismatch up to `max_retries` additional times. Returns the raw
/// reply payload and its source address.
fn send_and_receive(socket: &UdpSocket, peer: SocketAddr, bytes: &[u8], timeout: Duration, max_retries: u32, source_check: crate::target::SourceCheck) -> Result<Vec<u8>, Error> {
    socket.set_read_timeout(Some(timeout)).map_err(|e| network_error(peer, &e))?;

    let mut attempt = 0;
    loop {
        socket.send_to(bytes, peer).map_err(|e| network_error(peer, &e))?;

        let mut buf = vec![0u8; 65_535];
        match socket.recv_from(&mut buf) {
            Ok((len, src)) => {
                if len == 0 {
                    debug!(%peer, attempt, "zero-length datagram, retrying");
                    attempt += 1;
                    if attempt > max_retries {
                        return Err(timed_out(peer, attempt));
                    }
                    continue;
                }
                if !source_matches(peer, src, source_check) {
                    warn!(%peer, %src, "reply source mismatch, retrying");
                    attempt += 1;
                    if attempt > max_retries {
                        return Err(timed_out(peer, attempt));
                    }
                    continue;
                }
                buf.truncate(len);
                return Ok(buf);
            }
            Err(e) if is_retryable(&e) => {
                attempt += 1;
                if attempt > max_retries {
                    return Err(timed_out(peer, attempt));
                }
                continue;
            }
            Err(e) => return Err(network_error(peer, &e)),
        }
    }
}

/// Issues a v1/v2c request and returns the decoded reply PDU.
pub fn request_community(socket: &UdpSocket, peer: SocketAddr, version: Version, target: &CommunityTarget, pdu: Pdu, timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
    let request_id = pdu.request_id();
    let mut message = CommunityMessage::new(version, target.community.clone(), pdu);
    let bytes = message.encode()?;

    let reply_bytes = send_and_receive(socket, peer, &bytes, timeout, max_retries, target.source_check)?;
    if reply_bytes.is_empty() {
        return Err(no_data(peer));
    }

    let reply = CommunityMessage::decode(&reply_bytes, version)?;
    if reply.community != target.community {
        return Err(Kind::InvalidTargetParameters {
            reason: "community string in reply did not match request".to_string(),
        }
        .into());
    }
    if reply.pdu.request_id() != request_id {
        return Err(Kind::InvalidRequestId {
            expected: request_id,
            got: reply.pdu.request_id(),
        }
        .into());
    }
    Ok(reply.pdu)
}

/// Issues a v3/USM request. When the reply is a Report carrying
/// `usmStatsUnknownEngineIDs`, the discovery values are merged into
/// `target` and the Report is returned to the caller, which is expected to
/// re-issue the original request.
pub fn request_secure(socket: &UdpSocket, peer: SocketAddr, target: &mut SecureTarget, pdu: Pdu, timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
    let request_id = pdu.request_id();
    let is_discovery = target.is_discovery_probe();

    target.build_cached_security_keys()?;
    let auth_key = target.cached_auth_key().map(|k| k.to_vec());
    let priv_key = target.cached_priv_key().map(|k| k.to_vec());

    let mut message = V3Message {
        msg_id: rand::random::<i32>() & 0x7FFF_FFFF,
        max_msg_size: target.max_message_size,
        auth: target.auth_protocol != crate::usm::AuthProtocol::None && !is_discovery,
        priv_enabled: target.priv_protocol != crate::usm::PrivProtocol::None && !is_discovery,
        reportable: target.reportable,
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
    let reply_bytes = send_and_receive(socket, peer, &bytes, timeout, max_retries, crate::target::SourceCheck::IpAndPort)?;
    if reply_bytes.is_empty() {
        return Err(no_data(peer));
    }

    let decode_auth_key = auth_key.as_deref().map(|k| (target.auth_protocol, k));
    let decode_priv_key = priv_key.as_deref().map(|k| (target.priv_protocol, k));
    let reply = V3Message::decode(&reply_bytes, decode_auth_key, decode_priv_key)?;

    if reply.pdu.request_id() != request_id {
        return Err(Kind::InvalidRequestId {
            expected: request_id,
            got: reply.pdu.request_id(),
        }
        .into());
    }

    if is_report_of(&reply.pdu, &USM_STATS_UNKNOWN_ENGINE_IDS) {
        target.absorb_discovery(reply.engine_id.clone(), reply.engine_boots, reply.engine_time);
        return Ok(reply.pdu);
    }

    if is_discovery {
        return Ok(reply.pdu);
    }

    if reply.user_name != target.security_name {
        return Err(Kind::InvalidSecurityName.into());
    }
    if reply.engine_id != target.engine_id {
        return Err(Kind::InvalidEngineId.into());
    }
    if (reply.engine_time as i64 - target.adjusted_engine_time() as i64).abs() > USM_TIME_WINDOW_SECONDS {
        return Err(Kind::PacketOutsideTimeWindow.into());
    }
    if !target.reportable && reply.pdu.pdu_type() == PduType::Report {
        return Err(Kind::ReportOnNoReports.into());
    }

    Ok(reply.pdu)
}

fn is_report_of(pdu: &Pdu, oid: &crate::oid::Oid) -> bool {
    pdu.pdu_type() == PduType::Report && pdu.var_binds().first().map(|vb| &vb.oid == oid).unwrap_or(false)
}
