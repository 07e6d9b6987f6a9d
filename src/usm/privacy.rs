//! Scoped-PDU privacy: DES-CBC with zero padding, and AES in CFB-128 mode.
//!
//! Both ciphers are driven through the RustCrypto `cipher` traits; the only
//! protocol-specific parts are how the IV and the on-wire privacy
//! parameters are built from the engine's boots/time counters.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};
use des::Des;

use crate::error::{Error, Kind};
use crate::usm::PrivProtocol;

type DesCbcEnc = cbc::Encryptor<Des>;
type DesCbcDec = cbc::Decryptor<Des>;

/// Encrypts `plaintext` under DES-CBC. `local_counter` is the caller's
/// per-packet monotonic counter (starts at a random value).
///
/// Returns `(ciphertext, priv_params)`; `priv_params` (the salt) must be
/// carried on the wire so the receiver can reconstruct the IV.
pub fn encrypt_des(kul: &[u8], engine_boots: u32, local_counter: u32, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; 8]), Error> {
    let (des_key, pre_iv) = des_key_parts(kul)?;
    let mut salt = [0u8; 8];
    salt[0..4].copy_from_slice(&engine_boots.to_be_bytes());
    salt[4..8].copy_from_slice(&local_counter.to_be_bytes());
    let iv = xor8(&salt, &pre_iv);

    let mut padded = plaintext.to_vec();
    let remainder = padded.len() % 8;
    if remainder != 0 {
        padded.resize(padded.len() + (8 - remainder), 0);
    }
    let ciphertext = DesCbcEnc::new(&des_key.into(), &iv.into()).encrypt_padded_vec_mut::<NoPadding>(&padded);
    Ok((ciphertext, salt))
}

/// Decrypts a DES-CBC scoped PDU given the 8-byte `priv_params` salt from
/// the packet.
pub fn decrypt_des(kul: &[u8], priv_params: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    if priv_params.len() != 8 {
        return Err(Kind::InvalidPrivParametersLength {
            expected: 8,
            actual: priv_params.len(),
        }
        .into());
    }
    let (des_key, pre_iv) = des_key_parts(kul)?;
    let salt: [u8; 8] = priv_params.try_into().unwrap();
    let iv = xor8(&salt, &pre_iv);
    if ciphertext.len() % 8 != 0 {
        return Err(Kind::decoding("DES ciphertext is not a multiple of the block size").into());
    }
    DesCbcDec::new(&des_key.into(), &iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| Kind::decoding("DES decryption failed").into())
}

fn des_key_parts(kul: &[u8]) -> Result<([u8; 8], [u8; 8]), Error> {
    if kul.len() < 16 {
        return Err(Kind::decoding("DES privacy key must be at least 16 bytes after localization").into());
    }
    let mut key = [0u8; 8];
    let mut pre_iv = [0u8; 8];
    key.copy_from_slice(&kul[0..8]);
    pre_iv.copy_from_slice(&kul[8..16]);
    Ok((key, pre_iv))
}

fn xor8(a: &[u8; 8], b: &[u8; 8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    for i in 0..8 {
        out[i] = a[i] ^ b[i];
    }
    out
}

/// Encrypts `plaintext` under AES-CFB128. `salt` is an 8-byte random value
/// the caller must generate fresh per packet; it is also the on-wire
/// `msgPrivacyParameters`.
pub fn encrypt_aes(protocol: PrivProtocol, key: &[u8], engine_boots: u32, engine_time: u32, salt: [u8; 8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let iv = aes_iv(engine_boots, engine_time, &salt);
    let iv = GenericArray::from_slice(&iv);
    let mut buf = plaintext.to_vec();
    match protocol {
        PrivProtocol::Aes128 => cfb_mode::Encryptor::<Aes128>::new(GenericArray::from_slice(key), iv).apply_keystream(&mut buf),
        PrivProtocol::Aes192 => cfb_mode::Encryptor::<Aes192>::new(GenericArray::from_slice(key), iv).apply_keystream(&mut buf),
        PrivProtocol::Aes256 => cfb_mode::Encryptor::<Aes256>::new(GenericArray::from_slice(key), iv).apply_keystream(&mut buf),
        _ => return Err(unsupported(protocol)),
    }
    Ok(buf)
}

pub fn decrypt_aes(protocol: PrivProtocol, key: &[u8], engine_boots: u32, engine_time: u32, priv_params: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    if priv_params.len() != 8 {
        return Err(Kind::InvalidPrivParametersLength {
            expected: 8,
            actual: priv_params.len(),
        }
        .into());
    }
    let salt: [u8; 8] = priv_params.try_into().unwrap();
    let iv = aes_iv(engine_boots, engine_time, &salt);
    let iv = GenericArray::from_slice(&iv);
    let mut buf = ciphertext.to_vec();
    match protocol {
        PrivProtocol::Aes128 => cfb_mode::Decryptor::<Aes128>::new(GenericArray::from_slice(key), iv).apply_keystream(&mut buf),
        PrivProtocol::Aes192 => cfb_mode::Decryptor::<Aes192>::new(GenericArray::from_slice(key), iv).apply_keystream(&mut buf),
        PrivProtocol::Aes256 => cfb_mode::Decryptor::<Aes256>::new(GenericArray::from_slice(key), iv).apply_keystream(&mut buf),
        _ => return Err(unsupported(protocol)),
    }
    Ok(buf)
}

fn aes_iv(engine_boots: u32, engine_time: u32, salt: &[u8; 8]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[0..4].copy_from_slice(&engine_boots.to_be_bytes());
    iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
    iv[8..16].copy_from_slice(salt);
    iv
}

fn unsupported(protocol: PrivProtocol) -> Error {
    Kind::UnsupportedPrivProtocol {
        protocol: format!("{protocol:?}"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn des_round_trip() {
        let kul = vec![0x7Au8; 16];
        let plaintext = b"scoped PDU bytes, not a multiple of 8 in length!";
        let (ciphertext, salt) = encrypt_des(&kul, 3, 42, plaintext).unwrap();
        let decrypted = decrypt_des(&kul, &salt, &ciphertext).unwrap();
        assert!(decrypted.starts_with(plaintext));
    }

    #[test]
    fn aes128_round_trip() {
        let key = vec![0x5Cu8; 16];
        let plaintext = b"scoped PDU plaintext for AES-CFB128";
        let salt = [9u8; 8];
        let ciphertext = encrypt_aes(PrivProtocol::Aes128, &key, 7, 12_345, salt, plaintext).unwrap();
        let decrypted = decrypt_aes(PrivProtocol::Aes128, &key, 7, 12_345, &salt, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn aes256_round_trip() {
        let key = vec![0x11u8; 32];
        let plaintext = b"another scoped PDU";
        let salt = [1u8; 8];
        let ciphertext = encrypt_aes(PrivProtocol::Aes256, &key, 1, 2, salt, plaintext).unwrap();
        let decrypted = decrypt_aes(PrivProtocol::Aes256, &key, 1, 2, &salt, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }
}
