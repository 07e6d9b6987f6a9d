//! The Basic Encoding Rules codec for the ASN.1 SMI types used by SNMP.
//!
//! This is the innermost layer (component C1 in the design document): a
//! growable byte buffer, a TLV header codec built on it, and the minimal
//! integer encoding rules every other codec in the crate is built from.

pub mod buffer;
pub mod int;
pub mod tag;

pub use buffer::{build_header, build_length, parse_header, parse_length, BerBuffer};
pub use tag::{Class, Tag};
