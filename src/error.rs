//! The closed error taxonomy shared by every layer of the crate.
//!
//! Codec errors surface from the lowest decoding frame to the transport
//! boundary without translation; the transport only adds context (attempt
//! count, peer) on top. [`Error`] is deliberately small and cheap to move:
//! the variant data lives on [`Kind`], boxed behind `Error` so that
//! `Result<T, Error>` stays a single pointer wide, mirroring how the
//! teacher crate boxes its own `DecodeErrorKind`/`EncodeErrorKind`.

use snafu::Snafu;
use std::boxed::Box;

/// Every error the crate can return. Match on [`Error::kind`] to branch on
/// the taxonomy documented on [`Kind`].
#[derive(Debug)]
pub struct Error(Box<Kind>);

impl Error {
    /// The specific failure that occurred.
    pub fn kind(&self) -> &Kind {
        &self.0
    }

    pub(crate) fn new(kind: Kind) -> Self {
        Self(Box::new(kind))
    }
}

impl<K: Into<Kind>> From<K> for Error {
    fn from(kind: K) -> Self {
        Self(Box::new(kind.into()))
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0.as_ref())
    }
}

/// The full set of distinguishable failures, per the design document's error
/// table. Variants that carry transport context (`peer`, `attempts`) are
/// only ever constructed from `transport::sync` / `transport::async_io`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Kind {
    /// Parsed version not in `{0, 1, 3}`, or it did not match the version
    /// expected by the envelope being decoded.
    #[snafu(display("invalid SNMP version: {version}"))]
    InvalidVersion { version: i64 },

    /// The BER tag on the PDU is outside the set accepted for the protocol
    /// version currently being decoded.
    #[snafu(display("PDU tag {tag:#x} is not valid for this SNMP version"))]
    InvalidPduType { tag: u8 },

    /// Accessing an error-status/index accessor on a GET-BULK PDU, a
    /// bulk-tuning accessor on a non-bulk PDU, or `trap_object_id` on a PDU
    /// type that carries no notification fields.
    #[snafu(display("{what} is not a valid operation on this PDU variant"))]
    InvalidPduOperation { what: &'static str },

    /// A BER header was malformed, a tag mismatched what was expected at a
    /// known decode position, or a VB value's tag is not a known SMI type.
    #[snafu(display("BER decoding error: {message}"))]
    DecodingError { message: String },

    /// A declared length would read past the end of the available buffer.
    #[snafu(display("buffer underflow: need {needed} bytes, have {available}"))]
    BufferUnderflow { needed: usize, available: usize },

    /// Malformed dotted-decimal OID text, or an encoded first byte that
    /// violates the `first*40+second` rule.
    #[snafu(display("invalid object identifier: {message}"))]
    InvalidOid { message: String },

    /// `msgAuthenticationParameters` was not exactly 12 bytes while auth was
    /// enabled.
    #[snafu(display("auth parameters must be 12 bytes, got {length}"))]
    InvalidAuthParametersLength { length: usize },

    /// `msgPrivacyParameters` did not match the length expected for the
    /// selected privacy protocol (8 bytes for DES and for AES-CFB).
    #[snafu(display("priv parameters must be {expected} bytes, got {actual}"))]
    InvalidPrivParametersLength { expected: usize, actual: usize },

    /// HMAC verification on an authenticated message failed.
    #[snafu(display("USM authentication failed"))]
    AuthenticationFailed,

    /// `msgSecurityModel` was not 3 (USM).
    #[snafu(display("unsupported security model: {model}"))]
    UnsupportedSecurityModel { model: i64 },

    /// The requested authentication protocol is not implemented.
    #[snafu(display("unsupported auth protocol: {protocol}"))]
    UnsupportedAuthProtocol { protocol: String },

    /// The requested privacy protocol is not implemented.
    #[snafu(display("unsupported privacy protocol: {protocol}"))]
    UnsupportedPrivProtocol { protocol: String },

    /// Privacy was requested without authentication; USM forbids the
    /// combination.
    #[snafu(display("privacy without authentication is not supported"))]
    UnsupportedNoAuthPriv,

    /// The engine id on a reply did not match the target parameters'.
    #[snafu(display("engine id mismatch"))]
    InvalidEngineId,

    /// The security (user) name on a reply did not match the target
    /// parameters'.
    #[snafu(display("security name mismatch"))]
    InvalidSecurityName,

    /// `msgAuthoritativeEngineTime` is older than the 1500 second freshness
    /// window and the in-flight request was not a discovery probe.
    #[snafu(display("packet outside the USM time window"))]
    PacketOutsideTimeWindow,

    /// The reply's `request-id` did not match the request that was sent.
    #[snafu(display("reply request-id {got} did not match sent request-id {expected}"))]
    InvalidRequestId { expected: i32, got: i32 },

    /// All retries were exhausted without a matching reply.
    #[snafu(display("request to {peer} timed out after {attempts} attempt(s)"))]
    RequestTimedOut { peer: String, attempts: u32 },

    /// A zero-length datagram was received.
    #[snafu(display("no data received from {peer}"))]
    NoDataReceived { peer: String },

    /// Host/network unreachable, connection refused, or connection reset.
    #[snafu(display("network error talking to {peer}: {message}"))]
    NetworkError { peer: String, message: String },

    /// A Report PDU arrived for a request sent with `reportable = false`.
    #[snafu(display("unexpected Report PDU received with reportable unset"))]
    ReportOnNoReports,

    /// During a multi-step walk, the same OID re-appeared with a different
    /// SMI tag than it carried on a previous step.
    #[snafu(display("OID value type changed mid-walk"))]
    OidValueTypeChanged,

    /// The fully encoded packet exceeds the agent's advertised
    /// `msgMaxSize`.
    #[snafu(display("encoded message size {size} exceeds max message size {max}"))]
    MaximumMessageSizeExceeded { size: usize, max: u32 },

    /// The target parameters object is not valid for use (missing secret,
    /// stale engine time, empty community, and so on).
    #[snafu(display("target parameters are not valid: {reason}"))]
    InvalidTargetParameters { reason: String },
}

impl Kind {
    pub(crate) fn decoding(message: impl Into<String>) -> Self {
        Kind::DecodingError {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_oid(message: impl Into<String>) -> Self {
        Kind::InvalidOid {
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
