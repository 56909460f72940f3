// RSA key exchange.
//
// The client offers a fresh 2048-bit RSA public key (PKCS#1 PEM) under
// `sys_info`; the controller answers with the common key, RSA-OAEP
// encrypted (SHA-1 hash and MGF1, empty label) and base64 encoded.
// The private key lives only for the duration of this exchange.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::rngs::OsRng;
use rsa::pkcs1::{EncodeRsaPublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use tracing::{debug, trace};

use crate::cipher::{Cipher, SessionKey};
use crate::error::Error;
use crate::frame::{self, Frame, keyword};
use crate::transport::Transport;

/// RSA modulus size offered to the controller.
pub const RSA_BITS: usize = 2048;

/// Generate the ephemeral keypair off the async runtime.
pub async fn generate_keypair() -> Result<RsaPrivateKey, Error> {
    tokio::task::spawn_blocking(|| RsaPrivateKey::new(&mut OsRng, RSA_BITS))
        .await
        .map_err(|e| Error::Crypto(format!("key generation task failed: {e}")))?
        .map_err(|e| Error::Crypto(format!("RSA key generation failed: {e}")))
}

/// PKCS#1 PEM text of the public half.
pub fn public_key_pem(private_key: &RsaPrivateKey) -> Result<String, Error> {
    RsaPublicKey::from(private_key)
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| Error::Crypto(format!("PEM encoding failed: {e}")))
}

/// Pull the base64 common key out of a `sys_info` reply, if this is one.
pub fn common_key_field(text: &str) -> Option<String> {
    let frame = Frame::parse(text)?;
    if frame.keyword != keyword::SYS_INFO {
        return None;
    }
    frame
        .payload?
        .get("common_key")?
        .as_str()
        .map(String::from)
}

/// Unwrap the base64 RSA-OAEP/SHA-1 common key into the session key.
pub fn unwrap_common_key(private_key: &RsaPrivateKey, encoded: &str) -> Result<SessionKey, Error> {
    let ciphertext = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Crypto(format!("common key is not valid base64: {e}")))?;

    let secret = private_key
        .decrypt(Oaep::new::<Sha1>(), &ciphertext)
        .map_err(|e| Error::Crypto(format!("RSA-OAEP decrypt failed: {e}")))?;

    SessionKey::from_slice(&secret)
}

/// Run the key exchange on a freshly opened transport.
///
/// Frames that are not a `sys_info` reply with a `common_key` are ignored.
/// Running out of time is a handshake failure; a key that will not
/// unwrap is a [`Error::Crypto`] and the connection must be rebuilt.
pub async fn perform(transport: &mut Transport, timeout: Duration) -> Result<Cipher, Error> {
    let private_key = generate_keypair().await?;
    let pem = public_key_pem(&private_key)?;

    debug!("offering public key");
    transport
        .send(frame::control(keyword::SYS_INFO, &pem))
        .await?;

    let encoded = loop {
        let text = match transport.receive(timeout).await {
            Ok(text) => text,
            Err(Error::Timeout { timeout }) => {
                return Err(Error::Handshake {
                    reason: format!("no common key within {timeout:?}"),
                });
            }
            Err(e) => return Err(e),
        };
        match common_key_field(&text) {
            Some(encoded) => break encoded,
            None => trace!("ignoring frame while waiting for common key"),
        }
    };

    let key = unwrap_common_key(&private_key, &encoded)?;
    debug!("handshake complete, common key received");
    Ok(Cipher::new(key))
}

#[cfg(test)]
mod tests {
    use rsa::pkcs1::DecodeRsaPublicKey;

    use super::*;

    fn test_keypair() -> RsaPrivateKey {
        // Smaller modulus keeps the test fast; OAEP/SHA-1 fits a 16-byte secret.
        RsaPrivateKey::new(&mut OsRng, 1024).unwrap()
    }

    fn wrap(private_key: &RsaPrivateKey, secret: &[u8]) -> String {
        let public = RsaPublicKey::from(private_key);
        let ciphertext = public
            .encrypt(&mut OsRng, Oaep::new::<Sha1>(), secret)
            .unwrap();
        STANDARD.encode(ciphertext)
    }

    #[test]
    fn derivation_is_deterministic_and_iv_equals_key() {
        let private_key = test_keypair();
        let secret = *b"fedcba9876543210";
        let encoded = wrap(&private_key, &secret);

        let first = unwrap_common_key(&private_key, &encoded).unwrap();
        let second = unwrap_common_key(&private_key, &encoded).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.key(), &secret);
        assert_eq!(first.key(), first.iv());
    }

    #[test]
    fn public_key_pem_is_pkcs1() {
        let private_key = test_keypair();
        let pem = public_key_pem(&private_key).unwrap();

        assert!(pem.starts_with("-----BEGIN RSA PUBLIC KEY-----\n"));
        assert!(pem.trim_end().ends_with("-----END RSA PUBLIC KEY-----"));
        assert!(!pem.contains('\r'));

        let parsed = RsaPublicKey::from_pkcs1_pem(&pem).unwrap();
        assert_eq!(parsed, RsaPublicKey::from(&private_key));
    }

    #[test]
    fn extracts_common_key_from_sys_info_reply() {
        let text = r#"[null,null,["sys_info",{"common_key":"QUJD","ver":"1.2"}]]"#;
        assert_eq!(common_key_field(text).as_deref(), Some("QUJD"));
    }

    #[test]
    fn ignores_frames_without_common_key() {
        assert!(common_key_field("garbage").is_none());
        assert!(common_key_field(r#"[null,null,["sys_info",{"ver":"1.2"}]]"#).is_none());
        assert!(common_key_field(r#"[null,null,["sys_info","text"]]"#).is_none());
        assert!(common_key_field(r#"[null,null,["notice",{"common_key":"QUJD"}]]"#).is_none());
        assert!(common_key_field(r#"[null,null]"#).is_none());
    }

    #[test]
    fn wrong_private_key_is_a_crypto_error() {
        let ours = test_keypair();
        let theirs = test_keypair();
        let encoded = wrap(&theirs, b"fedcba9876543210");
        assert!(matches!(
            unwrap_common_key(&ours, &encoded),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn bad_base64_is_a_crypto_error() {
        let private_key = test_keypair();
        assert!(matches!(
            unwrap_common_key(&private_key, "!!not base64!!"),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn secret_of_wrong_length_is_a_crypto_error() {
        let private_key = test_keypair();
        let encoded = wrap(&private_key, &[9; 24]);
        assert!(matches!(
            unwrap_common_key(&private_key, &encoded),
            Err(Error::Crypto(_))
        ));
    }
}
