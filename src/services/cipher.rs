//! AES-128-CBC codec for the delivery provider's payloads
//!
//! The provider encrypts every API response with a fixed key and IV and
//! expects player tokens produced the same way. Both directions are pure;
//! each call works on its own buffer.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::services::hex::{bytes_to_hex, hex_to_bytes};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

const BLOCK_SIZE: usize = 16;

/// Payload authorizing a player session
#[derive(Debug, Clone, Serialize)]
pub struct TokenPayload {
    pub id: String,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
    #[serde(rename = "r")]
    pub referrer: String,
}

#[derive(Debug, Clone)]
pub struct RpmCipher {
    key: [u8; BLOCK_SIZE],
    iv: [u8; BLOCK_SIZE],
}

impl RpmCipher {
    /// Build from a hex key and raw IV bytes; both must be exactly 16 bytes
    pub fn new(key_hex: &str, iv: &[u8]) -> PipelineResult<Self> {
        let key_bytes = hex_to_bytes(key_hex);
        let key: [u8; BLOCK_SIZE] = key_bytes.as_slice().try_into().map_err(|_| {
            PipelineError::Decryption(format!("key must be 16 bytes, got {}", key_bytes.len()))
        })?;
        let iv: [u8; BLOCK_SIZE] = iv.try_into().map_err(|_| {
            PipelineError::Decryption(format!("IV must be 16 bytes, got {}", iv.len()))
        })?;

        Ok(Self { key, iv })
    }

    /// Decrypt a hex ciphertext into UTF-8 text
    pub fn decrypt(&self, hex_ciphertext: &str) -> PipelineResult<String> {
        let mut buf = hex_to_bytes(hex_ciphertext);

        if buf.is_empty() {
            return Err(PipelineError::Decryption("Invalid hex data".to_string()));
        }
        if buf.len() % BLOCK_SIZE != 0 {
            return Err(PipelineError::Decryption(format!(
                "ciphertext length {} is not a multiple of {}",
                buf.len(),
                BLOCK_SIZE
            )));
        }

        let plaintext = Aes128CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map_err(|_| PipelineError::Decryption("bad PKCS#7 padding".to_string()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| PipelineError::Decryption(format!("plaintext is not UTF-8: {}", e)))
    }

    /// Serialize, pad and encrypt a token payload, hex encoded.
    /// Deterministic: the provider uses a fixed IV.
    pub fn encrypt_token(&self, payload: &TokenPayload) -> PipelineResult<String> {
        let json = serde_json::to_vec(payload)?;
        Ok(self.encrypt(&json))
    }

    /// PKCS#7-pad and encrypt raw bytes, hex encoded
    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        bytes_to_hex(&ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "6b69656d7469656e6d75613931316361";
    const IV: &[u8] = b"1234567890oiuytr";

    fn cipher() -> RpmCipher {
        RpmCipher::new(KEY_HEX, IV).unwrap()
    }

    fn payload() -> TokenPayload {
        TokenPayload {
            id: "player42".to_string(),
            width: 1920,
            height: 1080,
            referrer: "https://rpmshare.rpmstream.live".to_string(),
        }
    }

    #[test]
    fn test_rejects_bad_key_and_iv() {
        assert!(RpmCipher::new("abcd", IV).is_err());
        assert!(RpmCipher::new(KEY_HEX, b"short").is_err());
    }

    #[test]
    fn test_token_round_trip() {
        let cipher = cipher();
        let token = cipher.encrypt_token(&payload()).unwrap();

        assert_eq!(token.len() % 32, 0);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let plain = cipher.decrypt(&token).unwrap();
        assert_eq!(
            plain,
            r#"{"id":"player42","w":1920,"h":1080,"r":"https://rpmshare.rpmstream.live"}"#
        );
    }

    #[test]
    fn test_token_is_deterministic() {
        let cipher = cipher();
        assert_eq!(
            cipher.encrypt_token(&payload()).unwrap(),
            cipher.encrypt_token(&payload()).unwrap()
        );
    }

    #[test]
    fn test_decrypt_rejects_empty_and_unaligned() {
        let cipher = cipher();
        assert!(matches!(
            cipher.decrypt("not hex at all"),
            Err(PipelineError::Decryption(_))
        ));
        assert!(matches!(
            cipher.decrypt("00112233"),
            Err(PipelineError::Decryption(_))
        ));
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails_or_garbles() {
        let token = cipher().encrypt_token(&payload()).unwrap();
        let other = RpmCipher::new("00112233445566778899aabbccddeeff", IV).unwrap();
        match other.decrypt(&token) {
            Ok(text) => assert!(!text.contains("player42")),
            Err(e) => assert!(matches!(e, PipelineError::Decryption(_))),
        }
    }
}
