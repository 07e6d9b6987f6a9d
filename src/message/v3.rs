//! The SNMPv3 envelope: header data, USM security parameters, and a scoped
//! PDU that is encrypted in place when privacy is enabled.
//!
//! Authentication is done functionally rather than by byte-patching: the
//! message is built once with a 12-zero-byte placeholder, the HMAC is
//! computed over that, and the message is built a second time with the
//! real digest in the same fixed-length field. The two builds are
//! byte-identical except for those 12 bytes, so this has the same result
//! as the "zero then overwrite in place" described for the wire format,
//! without a buffer that needs interior mutation.

use rand::RngCore;

use crate::ber::{tag, BerBuffer, Tag};
use crate::error::{Error, Kind};
use crate::pdu::Pdu;
use crate::usm::{auth, privacy, AuthProtocol, PrivProtocol};

use super::{parse_integer, parse_octet_string, push_integer, push_octet_string};

const SECURITY_MODEL_USM: i64 = 3;
const MSG_VERSION: i64 = 3;

const FLAG_AUTH: u8 = 0x01;
const FLAG_PRIV: u8 = 0x02;
const FLAG_REPORTABLE: u8 = 0x04;

/// A fully assembled SNMPv3 message.
#[derive(Clone, Debug)]
pub struct V3Message {
    pub msg_id: i32,
    pub max_msg_size: u32,
    pub auth: bool,
    pub priv_enabled: bool,
    pub reportable: bool,
    pub auth_protocol: AuthProtocol,
    pub priv_protocol: PrivProtocol,

    pub engine_id: Vec<u8>,
    pub engine_boots: i32,
    pub engine_time: i32,
    pub user_name: String,

    pub context_engine_id: Vec<u8>,
    pub context_name: String,
    pub pdu: Pdu,
}

impl V3Message {
    fn flags_byte(&self) -> u8 {
        let mut flags = 0u8;
        if self.auth {
            flags |= FLAG_AUTH;
        }
        if self.priv_enabled {
            flags |= FLAG_PRIV;
        }
        if self.reportable {
            flags |= FLAG_REPORTABLE;
        }
        flags
    }

    /// Encodes the message. `auth_key`/`priv_key` must be supplied whenever
    /// `self.auth`/`self.priv_enabled` are set.
    pub fn encode(&mut self, auth_key: Option<&[u8]>, priv_key: Option<&[u8]>) -> Result<Vec<u8>, Error> {
        if self.priv_enabled && !self.auth {
            return Err(Kind::UnsupportedNoAuthPriv.into());
        }

        let mut scoped_plaintext = Vec::new();
        push_octet_string(&mut scoped_plaintext, &self.context_engine_id);
        push_octet_string(&mut scoped_plaintext, self.context_name.as_bytes());
        self.pdu.encode(&mut scoped_plaintext);
        let mut scoped_seq = Vec::new();
        crate::ber::build_header(&mut scoped_seq, tag::SEQUENCE, scoped_plaintext.len());
        scoped_seq.extend_from_slice(&scoped_plaintext);

        let mut priv_params = Vec::new();
        let scoped_pdu_data = if self.priv_enabled {
            let key = priv_key.ok_or_else(|| missing_key("privacy"))?;
            let (ciphertext, params) = self.encrypt_scoped_pdu(key, &scoped_seq)?;
            priv_params = params;
            let mut wrapped = Vec::new();
            crate::ber::build_header(&mut wrapped, tag::OCTET_STRING, ciphertext.len());
            wrapped.extend_from_slice(&ciphertext);
            wrapped
        } else {
            scoped_seq
        };

        let build = |auth_params: &[u8]| -> Vec<u8> {
            let mut global = Vec::new();
            push_integer(&mut global, self.msg_id as i64);
            push_integer(&mut global, self.max_msg_size as i64);
            push_octet_string(&mut global, &[self.flags_byte()]);
            push_integer(&mut global, SECURITY_MODEL_USM);
            let mut global_seq = Vec::new();
            crate::ber::build_header(&mut global_seq, tag::SEQUENCE, global.len());
            global_seq.extend_from_slice(&global);

            let mut usm = Vec::new();
            push_octet_string(&mut usm, &self.engine_id);
            push_integer(&mut usm, self.engine_boots as i64);
            push_integer(&mut usm, self.engine_time as i64);
            push_octet_string(&mut usm, self.user_name.as_bytes());
            push_octet_string(&mut usm, auth_params);
            push_octet_string(&mut usm, &priv_params);
            let mut usm_seq = Vec::new();
            crate::ber::build_header(&mut usm_seq, tag::SEQUENCE, usm.len());
            usm_seq.extend_from_slice(&usm);
            let mut usm_wrapped = Vec::new();
            crate::ber::build_header(&mut usm_wrapped, tag::OCTET_STRING, usm_seq.len());
            usm_wrapped.extend_from_slice(&usm_seq);

            let mut inner = Vec::new();
            push_integer(&mut inner, MSG_VERSION);
            inner.extend_from_slice(&global_seq);
            inner.extend_from_slice(&usm_wrapped);
            inner.extend_from_slice(&scoped_pdu_data);

            let mut out = Vec::new();
            crate::ber::build_header(&mut out, tag::SEQUENCE, inner.len());
            out.extend_from_slice(&inner);
            out
        };

        if self.auth {
            let key = auth_key.ok_or_else(|| missing_key("authentication"))?;
            let placeholder = [0u8; auth::AUTH_PARAMS_LEN];
            let message_with_zeroed_auth = build(&placeholder);
            let digest = auth::compute(self.auth_protocol, key, &message_with_zeroed_auth)?;
            Ok(build(&digest))
        } else {
            Ok(build(&[]))
        }
    }

    fn encrypt_scoped_pdu(&self, key: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>), Error> {
        match self.priv_protocol {
            PrivProtocol::Des => {
                let local_counter = rand::thread_rng().next_u32();
                let (ciphertext, salt) = privacy::encrypt_des(key, self.engine_boots as u32, local_counter, plaintext)?;
                Ok((ciphertext, salt.to_vec()))
            }
            PrivProtocol::Aes128 | PrivProtocol::Aes192 | PrivProtocol::Aes256 => {
                let mut salt = [0u8; 8];
                rand::thread_rng().fill_bytes(&mut salt);
                let ciphertext = privacy::encrypt_aes(self.priv_protocol, key, self.engine_boots as u32, self.engine_time as u32, salt, plaintext)?;
                Ok((ciphertext, salt.to_vec()))
            }
            PrivProtocol::None => Err(Kind::UnsupportedPrivProtocol {
                protocol: "none".to_string(),
            }
            .into()),
        }
    }

    /// Decodes a message. `auth_key`/`priv_key` are consulted only when the
    /// message's own flags request authentication/privacy; a missing key
    /// for a flag that is set is not an error here — the caller may still
    /// want to inspect an unauthenticated discovery Report.
    pub fn decode(bytes: &[u8], auth_key: Option<(AuthProtocol, &[u8])>, priv_key: Option<(PrivProtocol, &[u8])>) -> Result<Self, Error> {
        let buf = BerBuffer::from(bytes.to_vec());
        let mut offset = 0;

        let (found, len) = crate::ber::parse_header(&buf, &mut offset)?;
        if !found.is(tag::SEQUENCE) {
            return Err(Kind::decoding("expected outer SEQUENCE").into());
        }
        let end = offset + len;

        let version = parse_integer(&buf, &mut offset)?;
        if version != MSG_VERSION {
            return Err(Kind::InvalidVersion { version }.into());
        }

        let (g_tag, g_len) = crate::ber::parse_header(&buf, &mut offset)?;
        if !g_tag.is(tag::SEQUENCE) {
            return Err(Kind::decoding("expected msgGlobalData SEQUENCE").into());
        }
        let g_end = offset + g_len;
        let msg_id = parse_integer(&buf, &mut offset)? as i32;
        let max_msg_size = parse_integer(&buf, &mut offset)? as u32;
        let flags_bytes = parse_octet_string(&buf, &mut offset)?;
        if flags_bytes.len() != 1 {
            return Err(Kind::decoding("msgFlags must be a single byte").into());
        }
        let flags = flags_bytes[0];
        let security_model = parse_integer(&buf, &mut offset)?;
        if security_model != SECURITY_MODEL_USM {
            return Err(Kind::UnsupportedSecurityModel { model: security_model }.into());
        }
        if offset != g_end {
            return Err(Kind::decoding("msgGlobalData length mismatch").into());
        }

        let (sp_tag, sp_len) = crate::ber::parse_header(&buf, &mut offset)?;
        if !sp_tag.is(tag::OCTET_STRING) {
            return Err(Kind::decoding("expected msgSecurityParameters OCTET STRING").into());
        }
        let sp_end = offset + sp_len;

        let (usm_tag, usm_len) = crate::ber::parse_header(&buf, &mut offset)?;
        if !usm_tag.is(tag::SEQUENCE) {
            return Err(Kind::decoding("expected USM parameters SEQUENCE").into());
        }
        let usm_end = offset + usm_len;

        let engine_id = parse_octet_string(&buf, &mut offset)?;
        let engine_boots = parse_integer(&buf, &mut offset)? as i32;
        let engine_time = parse_integer(&buf, &mut offset)? as i32;
        let user_name_bytes = parse_octet_string(&buf, &mut offset)?;
        let user_name = String::from_utf8_lossy(&user_name_bytes).into_owned();

        let (auth_header_tag, auth_len) = crate::ber::parse_header(&buf, &mut offset)?;
        if !auth_header_tag.is(tag::OCTET_STRING) {
            return Err(Kind::decoding("expected msgAuthenticationParameters OCTET STRING").into());
        }
        let auth_content_start = offset;
        let auth_params = buf.slice(offset, auth_len)?.to_vec();
        offset += auth_len;
        if flags & FLAG_AUTH != 0 && auth_params.len() != auth::AUTH_PARAMS_LEN {
            return Err(Kind::InvalidAuthParametersLength { length: auth_params.len() }.into());
        }

        let priv_params = parse_octet_string(&buf, &mut offset)?;
        if flags & FLAG_PRIV != 0 && priv_params.len() != 8 {
            return Err(Kind::InvalidPrivParametersLength {
                expected: 8,
                actual: priv_params.len(),
            }
            .into());
        }
        if offset != usm_end || offset != sp_end {
            return Err(Kind::decoding("USM security parameters length mismatch").into());
        }

        if flags & FLAG_AUTH != 0 && !engine_id.is_empty() {
            if let Some((protocol, key)) = auth_key {
                let mut zeroed = bytes.to_vec();
                for b in zeroed.iter_mut().skip(auth_content_start).take(auth_len) {
                    *b = 0;
                }
                let mut received = [0u8; auth::AUTH_PARAMS_LEN];
                received.copy_from_slice(&auth_params);
                auth::verify(protocol, key, &zeroed, &received)?;
            }
        }

        let scoped_tag = Tag::from_byte(buf.byte_at(offset)?)?;
        let (context_engine_id, context_name, pdu) = if scoped_tag.is(tag::SEQUENCE) {
            decode_scoped_plaintext(&buf, &mut offset)?
        } else if scoped_tag.is(tag::OCTET_STRING) {
            let ciphertext = parse_octet_string(&buf, &mut offset)?;
            let (protocol, key) = priv_key.ok_or_else(|| missing_key("privacy"))?;
            let plaintext = match protocol {
                PrivProtocol::Des => privacy::decrypt_des(key, &priv_params, &ciphertext)?,
                PrivProtocol::Aes128 | PrivProtocol::Aes192 | PrivProtocol::Aes256 => {
                    privacy::decrypt_aes(protocol, key, engine_boots as u32, engine_time as u32, &priv_params, &ciphertext)?
                }
                PrivProtocol::None => {
                    return Err(Kind::UnsupportedPrivProtocol {
                        protocol: "none".to_string(),
                    }
                    .into())
                }
            };
            let plain_buf = BerBuffer::from(plaintext);
            let mut plain_offset = 0;
            decode_scoped_plaintext(&plain_buf, &mut plain_offset)?
        } else {
            return Err(Kind::decoding("unexpected scopedPduData tag").into());
        };

        if offset != end {
            return Err(Kind::decoding("v3 message length mismatch").into());
        }

        Ok(Self {
            msg_id,
            max_msg_size,
            auth: flags & FLAG_AUTH != 0,
            priv_enabled: flags & FLAG_PRIV != 0,
            reportable: flags & FLAG_REPORTABLE != 0,
            auth_protocol: auth_key.map(|(p, _)| p).unwrap_or(AuthProtocol::None),
            priv_protocol: priv_key.map(|(p, _)| p).unwrap_or(PrivProtocol::None),
            engine_id,
            engine_boots,
            engine_time,
            user_name,
            context_engine_id,
            context_name,
            pdu,
        })
    }

    /// Builds a Response to this message (assumed to be an Inform): copies
    /// identity, security and context fields, switches the PDU to
    /// `Response`, disables `reportable`, and preserves the notification
    /// VBs already on `response_pdu`.
    pub fn build_inform_response(&self, response_pdu: Pdu) -> Self {
        Self {
            msg_id: self.msg_id,
            max_msg_size: self.max_msg_size,
            auth: self.auth,
            priv_enabled: self.priv_enabled,
            reportable: false,
            auth_protocol: self.auth_protocol,
            priv_protocol: self.priv_protocol,
            engine_id: self.engine_id.clone(),
            engine_boots: self.engine_boots,
            engine_time: self.engine_time,
            user_name: self.user_name.clone(),
            context_engine_id: self.context_engine_id.clone(),
            context_name: self.context_name.clone(),
            pdu: response_pdu,
        }
    }
}

fn decode_scoped_plaintext(buf: &BerBuffer, offset: &mut usize) -> Result<(Vec<u8>, String, Pdu), Error> {
    let (found, len) = crate::ber::parse_header(buf, offset)?;
    if !found.is(tag::SEQUENCE) {
        return Err(Kind::decoding("expected scopedPDU SEQUENCE").into());
    }
    let end = *offset + len;
    let context_engine_id = parse_octet_string(buf, offset)?;
    let context_name_bytes = parse_octet_string(buf, offset)?;
    let context_name = String::from_utf8_lossy(&context_name_bytes).into_owned();
    let pdu = Pdu::decode(buf, offset)?;
    if *offset != end {
        return Err(Kind::decoding("scopedPDU length mismatch").into());
    }
    Ok((context_engine_id, context_name, pdu))
}

fn missing_key(what: &str) -> Error {
    Kind::InvalidTargetParameters {
        reason: format!("{what} key required but not supplied"),
    }
    .into()
}
