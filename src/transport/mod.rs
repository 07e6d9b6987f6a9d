//! The UDP transport state machine: a blocking synchronous path available
//! unconditionally, and a single-slot tokio-backed asynchronous path behind
//! the `async` feature.
//!
//! Both paths share the retry/timeout/source-verification rules in this
//! module; only how they wait for I/O differs.

pub mod sync;

#[cfg(feature = "async")]
pub mod async_io;

use std::io;
use std::net::SocketAddr;

use crate::error::{Error, Kind};
use crate::target::SourceCheck;

/// Default SNMP agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Whether an I/O error should consume a retry attempt or fail the request
/// immediately. Host/network unreachable, connection refused, and
/// connection reset are treated as fatal: retrying them wastes the retry
/// budget on an error that will not go away.
fn is_retryable(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn network_error(peer: SocketAddr, err: &io::Error) -> Error {
    Kind::NetworkError {
        peer: peer.to_string(),
        message: err.to_string(),
    }
    .into()
}

fn timed_out(peer: SocketAddr, attempts: u32) -> Error {
    Kind::RequestTimedOut {
        peer: peer.to_string(),
        attempts,
    }
    .into()
}

fn no_data(peer: SocketAddr) -> Error {
    Kind::NoDataReceived { peer: peer.to_string() }.into()
}

/// Checks a reply's source endpoint against the request's peer per the
/// target's [`SourceCheck`] setting.
pub(crate) fn source_matches(expected: SocketAddr, actual: SocketAddr, check: SourceCheck) -> bool {
    match check {
        SourceCheck::None => true,
        SourceCheck::IpOnly => expected.ip() == actual.ip(),
        SourceCheck::IpAndPort => expected == actual,
    }
}
