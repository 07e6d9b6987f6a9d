//! RFC 3414 Appendix A key derivation: password-to-key expansion, then
//! localization against an authoritative engine id.

use digest::Digest;
use md5::Md5;
use sha1::Sha1;

use crate::error::{Error, Kind};
use crate::usm::{AuthProtocol, PrivProtocol};

const EXPANSION_LENGTH: usize = 1_048_576;

/// Expands `password` into a 1 MiB cyclic buffer and hashes it (RFC 3414
/// Appendix A.2's `password_to_key`), then localizes the result against
/// `engine_id` as `Kul = HASH(Ku || engine_id || Ku)`.
pub fn localize(protocol: AuthProtocol, password: &[u8], engine_id: &[u8]) -> Result<Vec<u8>, Error> {
    match protocol {
        AuthProtocol::Md5 => Ok(localize_with::<Md5>(password, engine_id)),
        AuthProtocol::Sha1 => Ok(localize_with::<Sha1>(password, engine_id)),
        AuthProtocol::None => Err(Kind::UnsupportedAuthProtocol {
            protocol: "none".to_string(),
        }
        .into()),
    }
}

/// Localizes `priv_secret` and sizes the result to exactly `priv_protocol`'s
/// required key length: truncated when the digest is longer than needed
/// (SHA-1's 20 bytes feeding AES-128's 16), extended per RFC 3826 when it
/// is shorter (MD5's 16 or SHA-1's 20 bytes feeding AES-192's 24 or
/// AES-256's 32).
pub fn localize_priv_key(auth_protocol: AuthProtocol, priv_protocol: PrivProtocol, priv_secret: &[u8], engine_id: &[u8]) -> Result<Vec<u8>, Error> {
    let localized = localize(auth_protocol, priv_secret, engine_id)?;
    let needed = priv_protocol.key_len();
    if localized.len() >= needed {
        return Ok(localized[..needed].to_vec());
    }
    extend(auth_protocol, &localized, needed)
}

/// RFC 3826 key extension: repeatedly hashes the most recently produced
/// digest-length block and appends it until `len` bytes are available,
/// then truncates to exactly `len`.
fn extend(protocol: AuthProtocol, localized: &[u8], len: usize) -> Result<Vec<u8>, Error> {
    let mut out = localized.to_vec();
    while out.len() < len {
        let block = match protocol {
            AuthProtocol::Md5 => extend_block::<Md5>(&out),
            AuthProtocol::Sha1 => extend_block::<Sha1>(&out),
            AuthProtocol::None => {
                return Err(Kind::UnsupportedAuthProtocol {
                    protocol: "none".to_string(),
                }
                .into())
            }
        };
        out.extend_from_slice(&block);
    }
    out.truncate(len);
    Ok(out)
}

fn extend_block<D: Digest>(produced_so_far: &[u8]) -> Vec<u8> {
    let digest_len = <D as Digest>::output_size();
    let start = produced_so_far.len().saturating_sub(digest_len);
    let mut hasher = D::new();
    hasher.update(&produced_so_far[start..]);
    hasher.finalize().to_vec()
}

fn localize_with<D: Digest>(password: &[u8], engine_id: &[u8]) -> Vec<u8> {
    let ku = password_to_key::<D>(password);
    let mut hasher = D::new();
    hasher.update(&ku);
    hasher.update(engine_id);
    hasher.update(&ku);
    hasher.finalize().to_vec()
}

fn password_to_key<D: Digest>(password: &[u8]) -> Vec<u8> {
    assert!(!password.is_empty(), "USM secrets must be non-empty");
    let mut hasher = D::new();
    let mut chunk = [0u8; 64];
    let mut produced = 0;
    let mut cursor = 0usize;
    while produced < EXPANSION_LENGTH {
        for slot in chunk.iter_mut() {
            *slot = password[cursor % password.len()];
            cursor += 1;
        }
        hasher.update(chunk);
        produced += chunk.len();
    }
    hasher.finalize().to_vec()
}
