//! End-to-end scenarios against a loopback-UDP fake agent, covering the
//! design document's scenario list S1-S6.

use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};

use rsnmp::error::Kind;
use rsnmp::message::{CommunityMessage, V3Message, Version};
use rsnmp::pdu::{Pdu, PduType};
use rsnmp::target::SecureTarget;
use rsnmp::usm::{keys, AuthProtocol, PrivProtocol};
use rsnmp::{get, get_bulk, Oid, SmiValue, Target};

fn bind_pair() -> (UdpSocket, UdpSocket) {
    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    let agent = UdpSocket::bind("127.0.0.1:0").unwrap();
    (client, agent)
}

#[test]
fn s1_v2c_get_returns_sys_descr() {
    let (client, agent) = bind_pair();
    let agent_addr = agent.local_addr().unwrap();

    let responder = thread::spawn(move || {
        let mut buf = vec![0u8; 2048];
        let (len, src) = agent.recv_from(&mut buf).unwrap();
        let request = CommunityMessage::decode(&buf[..len], Version::V2c).unwrap();
        assert_eq!(request.pdu.pdu_type(), PduType::GetRequest);
        assert_eq!(request.pdu.var_binds()[0].oid, Oid::parse("1.3.6.1.2.1.1.1.0").unwrap());

        let mut reply_pdu = Pdu::new(PduType::Response);
        reply_pdu.set_request_id(request.pdu.request_id());
        reply_pdu.add_vb(
            Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(),
            SmiValue::OctetString(b"router".to_vec()),
        );
        let mut reply = CommunityMessage::new(Version::V2c, "public", reply_pdu);
        let bytes = reply.encode().unwrap();
        agent.send_to(&bytes, src).unwrap();
    });

    let mut target = Target::Community(rsnmp::target::CommunityTarget::new("public", true));
    let reply = get(
        &client,
        agent_addr,
        &mut target,
        &[Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()],
        Duration::from_secs(2),
        1,
    )
    .unwrap();

    assert_eq!(reply.var_binds()[0].value, SmiValue::OctetString(b"router".to_vec()));
    responder.join().unwrap();
}

#[test]
fn s2_v2c_get_bulk_returns_requested_repetitions() {
    let (client, agent) = bind_pair();
    let agent_addr = agent.local_addr().unwrap();

    let responder = thread::spawn(move || {
        let mut buf = vec![0u8; 2048];
        let (len, src) = agent.recv_from(&mut buf).unwrap();
        let request = CommunityMessage::decode(&buf[..len], Version::V2c).unwrap();
        assert_eq!(request.pdu.non_repeaters().unwrap(), 0);
        assert_eq!(request.pdu.max_repetitions().unwrap(), 3);

        let mut reply_pdu = Pdu::new(PduType::Response);
        reply_pdu.set_request_id(request.pdu.request_id());
        reply_pdu.add_vb(Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(), SmiValue::OctetString(b"a".to_vec()));
        reply_pdu.add_vb(Oid::parse("1.3.6.1.2.1.1.2.0").unwrap(), SmiValue::OctetString(b"b".to_vec()));
        reply_pdu.add_vb(Oid::parse("1.3.6.1.2.1.1.3.0").unwrap(), SmiValue::TimeTicks(42));
        let mut reply = CommunityMessage::new(Version::V2c, "public", reply_pdu);
        let bytes = reply.encode().unwrap();
        agent.send_to(&bytes, src).unwrap();
    });

    let mut target = Target::Community(rsnmp::target::CommunityTarget::new("public", true));
    let reply = get_bulk(
        &client,
        agent_addr,
        &mut target,
        &[Oid::parse("1.3.6.1.2.1.1").unwrap()],
        0,
        3,
        Duration::from_secs(2),
        1,
    )
    .unwrap();

    assert_eq!(reply.var_binds().len(), 3);
    responder.join().unwrap();
}

#[test]
fn s3_mismatched_request_id_is_rejected() {
    let (client, agent) = bind_pair();
    let agent_addr = agent.local_addr().unwrap();

    let responder = thread::spawn(move || {
        let mut buf = vec![0u8; 2048];
        let (len, src) = agent.recv_from(&mut buf).unwrap();
        let request = CommunityMessage::decode(&buf[..len], Version::V1).unwrap();

        let mut reply_pdu = Pdu::new(PduType::Response);
        reply_pdu.set_request_id(request.pdu.request_id().wrapping_add(1));
        reply_pdu.add_vb(Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(), SmiValue::Null);
        let mut reply = CommunityMessage::new(Version::V1, "public", reply_pdu);
        let bytes = reply.encode().unwrap();
        agent.send_to(&bytes, src).unwrap();
    });

    let mut target = Target::Community(rsnmp::target::CommunityTarget::new("public", false));
    let err = get(
        &client,
        agent_addr,
        &mut target,
        &[Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()],
        Duration::from_secs(2),
        0,
    )
    .unwrap_err();

    assert!(matches!(err.kind(), Kind::InvalidRequestId { .. }));
    responder.join().unwrap();
}

#[test]
fn s4_v3_auth_priv_round_trip_after_discovery() {
    let (client, agent) = bind_pair();
    let agent_addr = agent.local_addr().unwrap();
    let engine_id = b"agent-engine-0001".to_vec();

    let responder_engine_id = engine_id.clone();
    let responder = thread::spawn(move || {
        let auth_key = keys::localize(AuthProtocol::Sha1, b"authpassword1", &responder_engine_id).unwrap();
        let priv_key = keys::localize_priv_key(AuthProtocol::Sha1, PrivProtocol::Aes128, b"privpassword1", &responder_engine_id).unwrap();

        // Discovery probe: empty engine id, no auth.
        let mut buf = vec![0u8; 2048];
        let (len, src) = agent.recv_from(&mut buf).unwrap();
        let probe = V3Message::decode(&buf[..len], None, None).unwrap();
        assert!(probe.engine_id.is_empty());

        let mut report_pdu = Pdu::new(PduType::Report);
        report_pdu.set_request_id(probe.pdu.request_id());
        report_pdu.add_vb(rsnmp::constants::USM_STATS_UNKNOWN_ENGINE_IDS.clone(), SmiValue::Counter32(1));
        let mut report = V3Message {
            msg_id: probe.msg_id,
            max_msg_size: 65_535,
            auth: false,
            priv_enabled: false,
            reportable: false,
            auth_protocol: AuthProtocol::None,
            priv_protocol: PrivProtocol::None,
            engine_id: responder_engine_id.clone(),
            engine_boots: 5,
            engine_time: 12_000,
            user_name: String::new(),
            context_engine_id: Vec::new(),
            context_name: String::new(),
            pdu: report_pdu,
        };
        let report_bytes = report.encode(None, None).unwrap();
        agent.send_to(&report_bytes, src).unwrap();

        // Real request: authPriv.
        let (len, src) = agent.recv_from(&mut buf).unwrap();
        let request = V3Message::decode(&buf[..len], Some((AuthProtocol::Sha1, &auth_key)), Some((PrivProtocol::Aes128, &priv_key))).unwrap();
        assert!(request.auth && request.priv_enabled);
        assert_eq!(request.engine_id, responder_engine_id);
        assert_eq!(request.pdu.var_binds()[0].oid, Oid::parse("1.3.6.1.2.1.1.1.0").unwrap());

        let mut reply_pdu = Pdu::new(PduType::Response);
        reply_pdu.set_request_id(request.pdu.request_id());
        reply_pdu.add_vb(
            Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(),
            SmiValue::OctetString(b"discovered agent".to_vec()),
        );
        let mut reply = V3Message {
            msg_id: request.msg_id,
            max_msg_size: 65_535,
            auth: true,
            priv_enabled: true,
            reportable: false,
            auth_protocol: AuthProtocol::Sha1,
            priv_protocol: PrivProtocol::Aes128,
            engine_id: responder_engine_id.clone(),
            engine_boots: 5,
            engine_time: 12_000,
            user_name: "monitor".to_string(),
            context_engine_id: Vec::new(),
            context_name: String::new(),
            pdu: reply_pdu,
        };
        let reply_bytes = reply.encode(Some(&auth_key), Some(&priv_key)).unwrap();
        agent.send_to(&reply_bytes, src).unwrap();
    });

    let mut target = SecureTarget::auth_priv(
        "monitor",
        AuthProtocol::Sha1,
        b"authpassword1".to_vec(),
        PrivProtocol::Aes128,
        b"privpassword1".to_vec(),
    );

    let mut discovery = Target::Secure(target.clone());
    let discovery_reply = get(
        &client,
        agent_addr,
        &mut discovery,
        &[Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()],
        Duration::from_secs(2),
        1,
    )
    .unwrap();
    assert_eq!(discovery_reply.pdu_type(), PduType::Report);
    let Target::Secure(discovered) = discovery else { unreachable!() };
    target = discovered;
    assert!(target.is_fresh());

    let mut real = Target::Secure(target);
    let reply = get(
        &client,
        agent_addr,
        &mut real,
        &[Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()],
        Duration::from_secs(2),
        1,
    )
    .unwrap();
    assert_eq!(reply.var_binds()[0].value, SmiValue::OctetString(b"discovered agent".to_vec()));

    responder.join().unwrap();
}

#[test]
fn s5_tampered_auth_digest_is_rejected_without_retry() {
    let (client, agent) = bind_pair();
    let agent_addr = agent.local_addr().unwrap();
    let engine_id = b"tamper-scenario-engine".to_vec();
    let auth_key = keys::localize(AuthProtocol::Md5, b"authpassword1", &engine_id).unwrap();

    let responder_engine_id = engine_id.clone();
    let responder_auth_key = auth_key.clone();
    let responder = thread::spawn(move || {
        let mut buf = vec![0u8; 2048];
        let (len, src) = agent.recv_from(&mut buf).unwrap();
        let request = V3Message::decode(&buf[..len], Some((AuthProtocol::Md5, &responder_auth_key)), None).unwrap();

        let mut reply_pdu = Pdu::new(PduType::Response);
        reply_pdu.set_request_id(request.pdu.request_id());
        reply_pdu.add_vb(Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(), SmiValue::Null);
        let mut reply = V3Message {
            msg_id: request.msg_id,
            max_msg_size: 65_535,
            auth: true,
            priv_enabled: false,
            reportable: false,
            auth_protocol: AuthProtocol::Md5,
            priv_protocol: PrivProtocol::None,
            engine_id: responder_engine_id.clone(),
            engine_boots: 1,
            engine_time: 500,
            user_name: "monitor".to_string(),
            context_engine_id: Vec::new(),
            context_name: String::new(),
            pdu: reply_pdu,
        };
        let mut reply_bytes = reply.encode(Some(&responder_auth_key), None).unwrap();
        let last = reply_bytes.len() - 1;
        reply_bytes[last] ^= 0x01;
        agent.send_to(&reply_bytes, src).unwrap();
    });

    let mut target = SecureTarget::auth_no_priv("monitor", AuthProtocol::Md5, b"authpassword1".to_vec());
    target.absorb_discovery(engine_id, 1, 500);

    let mut wrapped = Target::Secure(target);
    let err = get(
        &client,
        agent_addr,
        &mut wrapped,
        &[Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()],
        Duration::from_secs(2),
        0,
    )
    .unwrap_err();

    assert!(matches!(err.kind(), Kind::DecodingError { .. } | Kind::AuthenticationFailed));
    responder.join().unwrap();
}

#[test]
fn s6_unresponsive_agent_times_out_after_all_retries() {
    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    let silent_agent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let agent_addr = silent_agent.local_addr().unwrap();

    let mut target = Target::Community(rsnmp::target::CommunityTarget::new("public", true));
    let started = Instant::now();
    let err = get(
        &client,
        agent_addr,
        &mut target,
        &[Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()],
        Duration::from_millis(200),
        2,
    )
    .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err.kind(), Kind::RequestTimedOut { .. }));
    assert!(elapsed >= Duration::from_millis(550), "elapsed was {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2_000), "elapsed was {elapsed:?}");
}
