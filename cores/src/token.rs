//! Stateless request tokens.
//!
//! A [`PaymentRequest`] is sealed with AES-256-GCM and hex encoded so it can
//! travel inside a URL path segment and be recovered later by the image
//! function without any storage. The nonce is synthetic, derived from the
//! plaintext with HMAC-SHA256, so the same request always yields the same
//! token. Decoding checks the GCM tag and then recomputes the nonce; any
//! mismatch is a [`TokenError`] and never a partially decoded request.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::payment_request::PaymentRequest;

type HmacSha256 = Hmac<Sha256>;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const NONCE_KEY_LABEL: &[u8] = b"swish-token nonce";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("cipher key must be 32 bytes encoded as 64 hex chars or base64")]
    InvalidKey,
    #[error("token is not lowercase hex: {0}")]
    Hex(String),
    #[error("token is too short")]
    TooShort,
    #[error("token failed authentication")]
    Unauthenticated,
    #[error("token payload is malformed: {0}")]
    Payload(String),
    #[error("failed to seal token")]
    Seal,
}

/// 256-bit key shared by the slash command and image functions.
#[derive(Clone)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Accepts 64 hex characters or standard base64 of exactly 32 bytes.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let trimmed = raw.trim();
        let bytes = if trimmed.len() == KEY_LEN * 2 {
            hex::decode(trimmed).ok()
        } else {
            None
        };
        let bytes = match bytes {
            Some(bytes) => bytes,
            None => Base64.decode(trimmed).map_err(|_| TokenError::InvalidKey)?,
        };
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| TokenError::InvalidKey)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey([REDACTED])")
    }
}

pub struct TokenCodec {
    cipher: Aes256Gcm,
    nonce_key: [u8; 32],
}

impl TokenCodec {
    pub fn new(key: &CipherKey) -> Result<Self, TokenError> {
        let cipher = <Aes256Gcm as KeyInit>::new(Key::<Aes256Gcm>::from_slice(&key.0));
        let nonce_key = hmac_sha256(&key.0, NONCE_KEY_LABEL)?;
        Ok(Self { cipher, nonce_key })
    }

    pub fn encode(&self, request: &PaymentRequest) -> Result<String, TokenError> {
        let fields = (&request.payee, request.amount, &request.message);
        let plaintext = serde_json::to_vec(&fields)
            .map_err(|error| TokenError::Payload(error.to_string()))?;
        let nonce = self.synthetic_nonce(&plaintext)?;
        let sealed = self.cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| TokenError::Seal)?;
        let mut token = Vec::with_capacity(NONCE_LEN + sealed.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&sealed);
        Ok(hex::encode(token))
    }

    /// Only the lowercase form produced by [`TokenCodec::encode`] is accepted.
    pub fn decode(&self, token: &str) -> Result<PaymentRequest, TokenError> {
        if token.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(TokenError::Hex("uppercase characters".into()));
        }
        let bytes = hex::decode(token).map_err(|error| TokenError::Hex(error.to_string()))?;
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(TokenError::TooShort);
        }
        let (nonce, sealed) = bytes.split_at(NONCE_LEN);
        let plaintext = self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| TokenError::Unauthenticated)?;
        if self.synthetic_nonce(&plaintext)?.as_slice() != nonce {
            return Err(TokenError::Unauthenticated);
        }
        let (payee, amount, message): (String, u64, String) = serde_json::from_slice(&plaintext)
            .map_err(|error| TokenError::Payload(error.to_string()))?;
        let request = PaymentRequest {
            payee,
            amount,
            message,
        };
        if !request.is_valid() {
            return Err(TokenError::Payload("request fields out of range".into()));
        }
        Ok(request)
    }

    fn synthetic_nonce(&self, plaintext: &[u8]) -> Result<[u8; NONCE_LEN], TokenError> {
        let digest = hmac_sha256(&self.nonce_key, plaintext)?;
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&digest[..NONCE_LEN]);
        Ok(nonce)
    }
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<[u8; 32], TokenError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| TokenError::Seal)?;
    mac.update(message);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    Ok(digest)
}
