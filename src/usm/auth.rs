//! HMAC-MD5-96 / HMAC-SHA1-96 authentication: compute over the fully
//! BER-encoded message with the auth-parameters field zeroed, truncate to
//! 12 bytes, overwrite in place; verify by repeating the computation and
//! comparing in constant time.

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;

use crate::error::{Error, Kind};
use crate::usm::AuthProtocol;

/// Length of `msgAuthenticationParameters` when authentication is enabled.
pub const AUTH_PARAMS_LEN: usize = 12;

pub fn compute(protocol: AuthProtocol, key: &[u8], message: &[u8]) -> Result<[u8; AUTH_PARAMS_LEN], Error> {
    let digest = match protocol {
        AuthProtocol::Md5 => {
            let mut mac = Hmac::<Md5>::new_from_slice(key).map_err(|_| invalid_key())?;
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        AuthProtocol::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| invalid_key())?;
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        AuthProtocol::None => {
            return Err(Kind::UnsupportedAuthProtocol {
                protocol: "none".to_string(),
            }
            .into())
        }
    };
    let mut out = [0u8; AUTH_PARAMS_LEN];
    out.copy_from_slice(&digest[..AUTH_PARAMS_LEN]);
    Ok(out)
}

/// Verifies `received` against a fresh HMAC of `message` (which the caller
/// must have already zeroed the auth-parameters field of).
pub fn verify(
    protocol: AuthProtocol,
    key: &[u8],
    message: &[u8],
    received: &[u8; AUTH_PARAMS_LEN],
) -> Result<(), Error> {
    let expected = compute(protocol, key, message)?;
    let mut diff = 0u8;
    for (a, b) in expected.iter().zip(received.iter()) {
        diff |= a ^ b;
    }
    if diff == 0 {
        Ok(())
    } else {
        Err(Kind::AuthenticationFailed.into())
    }
}

fn invalid_key() -> Error {
    Kind::decoding("HMAC key has an invalid length").into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_and_verify_round_trip() {
        let key = vec![0x11; 16];
        let message = b"\x30\x10\x02\x01\x03...placeholder-message";
        let digest = compute(AuthProtocol::Md5, &key, message).unwrap();
        assert!(verify(AuthProtocol::Md5, &key, message, &digest).is_ok());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let key = vec![0x22; 20];
        let message = b"original message bytes";
        let digest = compute(AuthProtocol::Sha1, &key, message).unwrap();
        assert!(verify(AuthProtocol::Sha1, &key, b"tampered message bytes!", &digest).is_err());
    }
}
