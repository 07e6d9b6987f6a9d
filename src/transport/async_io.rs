//! The tokio-backed async path: one outstanding request per transport,
//! enforced by a busy flag, with a one-shot timeout per attempt.
//!
//! This is the futures-driven rendering of the spec's single-slot
//! callback state machine: `tokio::time::timeout` plays the role of the
//! one-shot timer, and the `await` point plays the role of the
//! receive-complete callback. The busy flag still exists explicitly
//! because nothing about `&self` prevents two callers from racing a
//! second request onto the same socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::constants::{USM_STATS_UNKNOWN_ENGINE_IDS, USM_TIME_WINDOW_SECONDS};
use crate::error::{Error, Kind};
use crate::message::{CommunityMessage, V3Message, Version};
use crate::pdu::{Pdu, PduType};
use crate::target::{CommunityTarget, SecureTarget, SourceCheck};

use super::{network_error, no_data, source_matches, timed_out};

/// A single-slot async UDP transport. Wraps a bound, connected-enough
/// socket and a busy flag; `request_*` calls fail fast with
/// [`Kind::InvalidTargetParameters`] if a previous call on the same
/// instance has not finished.
pub struct AsyncTransport {
    socket: UdpSocket,
    busy: AtomicBool,
    terminated: AtomicBool,
}

impl AsyncTransport {
    pub async fn bind(local: SocketAddr) -> Result<Self, Error> {
        let socket = UdpSocket::bind(local).await.map_err(|e| network_error(local, &e))?;
        Ok(Self {
            socket,
            busy: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        })
    }

    /// Marks the transport closed; any in-flight operation observes
    /// `Terminated` the next time it checks.
    pub fn close(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    fn enter(&self) -> Result<(), Error> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(Kind::InvalidTargetParameters {
                reason: "transport is terminated".to_string(),
            }
            .into());
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(Kind::InvalidTargetParameters {
                reason: "transport already has a request in flight".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn leave(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    async fn send_and_receive(&self, peer: SocketAddr, bytes: &[u8], attempt_timeout: Duration, max_retries: u32, source_check: SourceCheck) -> Result<Vec<u8>, Error> {
        let mut attempt = 0;
        loop {
            if self.terminated.load(Ordering::SeqCst) {
                return Err(Kind::InvalidTargetParameters {
                    reason: "transport is terminated".to_string(),
                }
                .into());
            }

            self.socket.send_to(bytes, peer).await.map_err(|e| network_error(peer, &e))?;

            let mut buf = vec![0u8; 65_535];
            match timeout(attempt_timeout, self.socket.recv_from(&mut buf)).await {
                Ok(Ok((len, src))) => {
                    if len == 0 {
                        return Err(no_data(peer));
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
                Ok(Err(e)) => return Err(network_error(peer, &e)),
                Err(_elapsed) => {
                    debug!(%peer, attempt, "attempt timed out");
                    attempt += 1;
                    if attempt > max_retries {
                        return Err(timed_out(peer, attempt));
                    }
                    continue;
                }
            }
        }
    }

    pub async fn request_community(&self, peer: SocketAddr, version: Version, target: &CommunityTarget, pdu: Pdu, attempt_timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
        self.enter()?;
        let result = self.request_community_inner(peer, version, target, pdu, attempt_timeout, max_retries).await;
        self.leave();
        result
    }

    async fn request_community_inner(&self, peer: SocketAddr, version: Version, target: &CommunityTarget, pdu: Pdu, attempt_timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
        let request_id = pdu.request_id();
        let mut message = CommunityMessage::new(version, target.community.clone(), pdu);
        let bytes = message.encode()?;

        let reply_bytes = self.send_and_receive(peer, &bytes, attempt_timeout, max_retries, target.source_check).await?;
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

    pub async fn request_secure(&self, peer: SocketAddr, target: &mut SecureTarget, pdu: Pdu, attempt_timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
        self.enter()?;
        let result = self.request_secure_inner(peer, target, pdu, attempt_timeout, max_retries).await;
        self.leave();
        result
    }

    async fn request_secure_inner(&self, peer: SocketAddr, target: &mut SecureTarget, pdu: Pdu, attempt_timeout: Duration, max_retries: u32) -> Result<Pdu, Error> {
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
        let reply_bytes = self.send_and_receive(peer, &bytes, attempt_timeout, max_retries, SourceCheck::IpAndPort).await?;

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
}

fn is_report_of(pdu: &Pdu, oid: &crate::oid::Oid) -> bool {
    pdu.pdu_type() == PduType::Report && pdu.var_binds().first().map(|vb| &vb.oid == oid).unwrap_or(false)
}
