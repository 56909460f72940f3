// AES-128-CBC envelope codec.
//
// The controller uses the negotiated common key as both the AES key and
// the CBC IV. That must be reproduced exactly or the firmware rejects
// every envelope.

use std::fmt;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::error::Error;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Length of the common key in bytes.
pub const KEY_LEN: usize = 16;

/// The 16-byte common key negotiated during the handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a key from the unwrapped common-key secret.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            Error::Crypto(format!(
                "common key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// AES key bytes.
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// CBC initialization vector. Same bytes as [`key`](Self::key).
    pub fn iv(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Encrypts and decrypts command payloads under one session key.
#[derive(Debug, Clone)]
pub struct Cipher {
    key: SessionKey,
}

impl Cipher {
    pub fn new(key: SessionKey) -> Self {
        Self { key }
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.key
    }

    /// UTF-8 encode, PKCS#7 pad, AES-128-CBC encrypt, hex encode.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let ciphertext = Aes128CbcEnc::new(self.key.key().into(), self.key.iv().into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        hex::encode(ciphertext)
    }

    /// Hex decode, AES-128-CBC decrypt, strip PKCS#7 padding, UTF-8 decode.
    ///
    /// Any failure here means the two ends disagree on the key.
    pub fn decrypt(&self, hex_ciphertext: &str) -> Result<String, Error> {
        let ciphertext = hex::decode(hex_ciphertext)
            .map_err(|e| Error::Crypto(format!("malformed hex ciphertext: {e}")))?;

        let plaintext = Aes128CbcDec::new(self.key.key().into(), self.key.iv().into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| Error::Crypto("bad padding after decrypt".into()))?;

        String::from_utf8(plaintext)
            .map_err(|e| Error::Crypto(format!("decrypted payload is not UTF-8: {e}")))
    }
}
