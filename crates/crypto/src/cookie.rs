//! Authenticate-then-encrypt cookie codec, in the tradition of
//! `gorilla/securecookie`: a payload is HMAC-signed for tamper evidence, then
//! the signed envelope is sealed with AES-256-GCM so that the payload itself
//! is confidential, not just integrity-protected.
//!
//! The codec is payload-agnostic — it seals and opens opaque byte strings.
//! Callers serialize their own record (e.g. the gateway's `Client`) before
//! calling [`CookieCodec::seal`] and deserialize after [`CookieCodec::open`].

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

const HASH_KEY_LEN: usize = 64;
const BLOCK_KEY_LEN: usize = 32;
const SIGNATURE_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Every failure mode (malformed base64, truncated envelope, AEAD tag
/// mismatch, signature mismatch) collapses to this single variant. The cause
/// is never distinguished to the caller, so a forged or tampered cookie gives
/// an attacker no oracle to refine their attempt against.
#[derive(Debug, Error)]
#[error("invalid cookie")]
pub struct InvalidCookie;

/// The two independent secrets behind the cookie codec, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CookieCodec {
    hash_key: [u8; HASH_KEY_LEN],
    block_key: [u8; BLOCK_KEY_LEN],
}

impl std::fmt::Debug for CookieCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CookieCodec([REDACTED])")
    }
}

impl CookieCodec {
    /// Build a codec from explicit key material.
    #[must_use]
    pub fn new(hash_key: [u8; HASH_KEY_LEN], block_key: [u8; BLOCK_KEY_LEN]) -> Self {
        Self {
            hash_key,
            block_key,
        }
    }

    /// Load keys from `COOKIE_SECRET_HASH_KEY` (64 bytes) and
    /// `COOKIE_SECRET_BLOCK_KEY` (32 bytes), each hex- or base64-encoded.
    ///
    /// If either variable is absent, random per-process keys are generated
    /// and a warning is logged: cookies minted in this mode will not decode
    /// across a process restart or across replicas, which is acceptable for
    /// local development only.
    #[must_use]
    pub fn from_env() -> Self {
        let hash_key = std::env::var("COOKIE_SECRET_HASH_KEY")
            .ok()
            .and_then(|raw| decode_fixed::<HASH_KEY_LEN>(&raw));
        let block_key = std::env::var("COOKIE_SECRET_BLOCK_KEY")
            .ok()
            .and_then(|raw| decode_fixed::<BLOCK_KEY_LEN>(&raw));

        match (hash_key, block_key) {
            (Some(hash_key), Some(block_key)) => Self::new(hash_key, block_key),
            _ => {
                tracing::warn!(
                    "COOKIE_SECRET_HASH_KEY/COOKIE_SECRET_BLOCK_KEY not set or invalid; \
                     generating random per-process cookie keys (dev mode only — cookies \
                     will not survive a restart or be shared across replicas)"
                );
                Self::new(random_key(), random_key())
            }
        }
    }

    /// Sign and encrypt `payload`, returning a URL-safe base64 cookie value.
    pub fn seal(&self, payload: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.hash_key).expect("HMAC accepts any key length");
        mac.update(payload);
        let signature = mac.finalize().into_bytes();

        let mut signed = Vec::with_capacity(payload.len() + SIGNATURE_LEN);
        signed.extend_from_slice(payload);
        signed.extend_from_slice(&signature);

        let cipher =
            Aes256Gcm::new_from_slice(&self.block_key).expect("AES-256 key is always 32 bytes");
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, signed.as_ref())
            .expect("AES-GCM encryption over an in-memory buffer cannot fail");

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);

        B64.encode(sealed)
    }

    /// Verify and decrypt a cookie value produced by [`Self::seal`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCookie`] if the value fails to decode, decrypt, or
    /// verify for any reason.
    pub fn open(&self, cookie_value: &str) -> Result<Vec<u8>, InvalidCookie> {
        let sealed = B64.decode(cookie_value.trim()).map_err(|_| InvalidCookie)?;
        if sealed.len() < NONCE_LEN {
            return Err(InvalidCookie);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher =
            Aes256Gcm::new_from_slice(&self.block_key).expect("AES-256 key is always 32 bytes");
        let signed = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| InvalidCookie)?;

        if signed.len() < SIGNATURE_LEN {
            return Err(InvalidCookie);
        }
        let (payload, signature) = signed.split_at(signed.len() - SIGNATURE_LEN);

        let mut mac =
            HmacSha256::new_from_slice(&self.hash_key).expect("HMAC accepts any key length");
        mac.update(payload);
        mac.verify_slice(signature).map_err(|_| InvalidCookie)?;

        Ok(payload.to_vec())
    }
}

fn random_key<const N: usize>() -> [u8; N] {
    let mut key = [0u8; N];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

fn decode_fixed<const N: usize>(raw: &str) -> Option<[u8; N]> {
    let trimmed = raw.trim();
    let bytes = if trimmed.len() == N * 2 {
        hex::decode(trimmed).ok()?
    } else {
        base64::engine::general_purpose::STANDARD
            .decode(trimmed)
            .ok()?
    };
    if bytes.len() != N {
        return None;
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec() -> CookieCodec {
        CookieCodec::new([0x11; HASH_KEY_LEN], [0x22; BLOCK_KEY_LEN])
    }

    #[test]
    fn roundtrip_seal_open() {
        let codec = test_codec();
        let payload = br#"{"id":"abc","serial_number":7}"#;
        let sealed = codec.seal(payload);
        let opened = codec.open(&sealed).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let codec = test_codec();
        let sealed = codec.seal(b"hello");
        let mut raw = B64.decode(&sealed).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = B64.encode(raw);
        assert!(codec.open(&tampered).is_err());
    }

    #[test]
    fn wrong_keys_cannot_open() {
        let codec_a = CookieCodec::new([0x11; HASH_KEY_LEN], [0x22; BLOCK_KEY_LEN]);
        let codec_b = CookieCodec::new([0x33; HASH_KEY_LEN], [0x44; BLOCK_KEY_LEN]);
        let sealed = codec_a.seal(b"payload");
        assert!(codec_b.open(&sealed).is_err());
    }

    #[test]
    fn garbage_input_is_invalid_cookie() {
        let codec = test_codec();
        assert!(codec.open("not-base64!!!").is_err());
        assert!(codec.open("").is_err());
    }

    #[test]
    fn decode_fixed_accepts_hex_and_base64() {
        let hex_key = "ab".repeat(32);
        let decoded: [u8; 32] = decode_fixed(&hex_key).unwrap();
        assert_eq!(decoded, [0xab; 32]);

        let b64_key = base64::engine::general_purpose::STANDARD.encode([0xcd; 32]);
        let decoded: [u8; 32] = decode_fixed(&b64_key).unwrap();
        assert_eq!(decoded, [0xcd; 32]);
    }
}
