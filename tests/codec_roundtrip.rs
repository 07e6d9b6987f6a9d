//! Codec round-trip and encoding-invariant properties (testable properties
//! 1-3 of the design document).

use rsnmp::ber::{build_length, parse_header, parse_length, BerBuffer};
use rsnmp::message::{CommunityMessage, Version};
use rsnmp::{Oid, Pdu, PduType, SmiValue};

fn sample_values() -> Vec<SmiValue> {
    vec![
        SmiValue::Integer32(0),
        SmiValue::Integer32(-1),
        SmiValue::Integer32(i32::MIN),
        SmiValue::Integer32(i32::MAX),
        SmiValue::OctetString(b"router".to_vec()),
        SmiValue::OctetString(Vec::new()),
        SmiValue::Null,
        SmiValue::ObjectIdentifier(Oid::parse("1.3.6.1.2.1.1.3.0").unwrap()),
        SmiValue::IpAddress([192, 0, 2, 1]),
        SmiValue::Counter32(u32::MAX),
        SmiValue::Gauge32(42),
        SmiValue::TimeTicks(1_234_567),
        SmiValue::Opaque(vec![0xDE, 0xAD, 0xBE, 0xEF]),
        SmiValue::Counter64(u64::MAX),
        SmiValue::NoSuchObject,
        SmiValue::NoSuchInstance,
        SmiValue::EndOfMibView,
    ]
}

#[test]
fn smi_value_round_trip() {
    for value in sample_values() {
        let mut buf = Vec::new();
        value.encode(&mut buf);
        let ber = BerBuffer::from(buf);
        let mut offset = 0;
        let decoded = SmiValue::decode(&ber, &mut offset).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(offset, ber.len());
    }
}

#[test]
fn pdu_round_trip_across_every_type() {
    for pdu_type in [
        PduType::GetRequest,
        PduType::GetNextRequest,
        PduType::Response,
        PduType::SetRequest,
        PduType::GetBulkRequest,
        PduType::InformRequest,
        PduType::V2Trap,
        PduType::Report,
    ] {
        let mut pdu = Pdu::new(pdu_type);
        for value in sample_values() {
            pdu.add_vb(Oid::parse("1.3.6.1.4.1.1.1").unwrap(), value);
        }
        let mut buf = Vec::new();
        pdu.encode(&mut buf);
        let ber = BerBuffer::from(buf);
        let mut offset = 0;
        let decoded = Pdu::decode(&ber, &mut offset).unwrap();
        assert_eq!(decoded, pdu);
        assert_eq!(offset, ber.len());
    }
}

#[test]
fn community_envelope_round_trip() {
    let mut pdu = Pdu::new(PduType::GetRequest);
    pdu.add_vb(Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(), SmiValue::Null);
    let mut message = CommunityMessage::new(Version::V2c, "public", pdu);
    let bytes = message.encode().unwrap();
    let decoded = CommunityMessage::decode(&bytes, Version::V2c).unwrap();
    assert_eq!(decoded.pdu, message.pdu);
}

#[test]
fn length_header_symmetry() {
    for n in [0usize, 1, 127, 128, 129, 255, 256, 65_535, 65_536, 1 << 20, (1usize << 31) - 1] {
        let mut buf = Vec::new();
        build_length(&mut buf, n);
        let ber = BerBuffer::from(buf);
        let mut offset = 0;
        assert_eq!(parse_length(&ber, &mut offset).unwrap(), n);
        assert_eq!(offset, ber.len());
    }
}

#[test]
fn integer_encoding_is_minimal() {
    for (value, expected_len) in [
        (SmiValue::Integer32(0), 1),
        (SmiValue::Integer32(127), 1),
        (SmiValue::Integer32(128), 2),
        (SmiValue::Integer32(-1), 1),
        (SmiValue::Integer32(-128), 1),
        (SmiValue::Integer32(-129), 2),
    ] {
        let mut buf = Vec::new();
        value.encode(&mut buf);
        let ber = BerBuffer::from(buf);
        let mut offset = 0;
        let (_tag, len) = parse_header(&ber, &mut offset).unwrap();
        assert_eq!(len, expected_len, "{value:?} encoded to unexpected length");
    }
}
