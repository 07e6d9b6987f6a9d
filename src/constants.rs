//! Well-known OIDs the codec and transport layers splice in or compare
//! against, built once and shared.

use once_cell::sync::Lazy;

use crate::oid::Oid;

/// `sysUpTime.0`, spliced as the first variable binding of V2Trap, Inform
/// and Inform-response PDUs.
pub static SYS_UP_TIME: Lazy<Oid> = Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 2, 1, 1, 3, 0]));

/// `snmpTrapOID.0`, spliced as the second variable binding of the same PDU
/// types.
pub static SNMP_TRAP_OID: Lazy<Oid> =
    Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0]));

/// USM statistics counters, incremented by an agent and reported back to a
/// requester inside a Report PDU on discovery/authentication failure.
pub static USM_STATS_UNSUPPORTED_SEC_LEVELS: Lazy<Oid> =
    Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 6, 3, 15, 1, 1, 1, 0]));
pub static USM_STATS_NOT_IN_TIME_WINDOWS: Lazy<Oid> =
    Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 6, 3, 15, 1, 1, 2, 0]));
pub static USM_STATS_UNKNOWN_USER_NAMES: Lazy<Oid> =
    Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 6, 3, 15, 1, 1, 3, 0]));
pub static USM_STATS_UNKNOWN_ENGINE_IDS: Lazy<Oid> =
    Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 6, 3, 15, 1, 1, 4, 0]));
pub static USM_STATS_WRONG_DIGESTS: Lazy<Oid> =
    Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 6, 3, 15, 1, 1, 5, 0]));
pub static USM_STATS_DECRYPTION_ERRORS: Lazy<Oid> =
    Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 6, 3, 15, 1, 1, 6, 0]));

/// `snmpUnknownSecurityModels.0`/`snmpInvalidMsgs.0`, the MPv3 message
/// processing counters reported in the same fashion.
pub static SNMP_UNKNOWN_SECURITY_MODELS: Lazy<Oid> =
    Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 6, 3, 11, 2, 1, 1, 0]));
pub static SNMP_INVALID_MSGS: Lazy<Oid> =
    Lazy::new(|| Oid::from_parts(vec![1, 3, 6, 1, 6, 3, 11, 2, 1, 2, 0]));

/// The 1500-second USM time-window used to judge whether a reply's
/// `msgAuthoritativeEngineTime` is still fresh.
pub const USM_TIME_WINDOW_SECONDS: i64 = 1500;
