//! Signed admin session credential.
//!
//! Cookie format: `base64url(json(AdminSession)) "." hex(HMAC-SHA256(secret, base64url-part))`.
//! The signature is checked in constant time before the payload is parsed,
//! so a tampered cookie never reaches the JSON decoder.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared_types::AdminSession;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Why a session cookie was rejected. All variants are treated as corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("missing signature separator")]
    Malformed,
    #[error("session payload is not base64url")]
    BadEncoding,
    #[error("session signature mismatch")]
    BadSignature,
    #[error("session payload is not a valid session: {0}")]
    BadPayload(String),
    #[error("session key rejected by HMAC")]
    InvalidKey,
}

/// Signs and verifies session cookies.
#[derive(Clone)]
pub struct SessionCodec {
    secret: Vec<u8>,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a cookie value for `session`.
    pub fn encode(&self, session: &AdminSession) -> Result<String, SessionError> {
        let json =
            serde_json::to_vec(session).map_err(|e| SessionError::BadPayload(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self.sign(payload.as_bytes())?;
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify and parse a cookie value.
    pub fn decode(&self, cookie: &str) -> Result<AdminSession, SessionError> {
        let (payload, signature) = cookie.rsplit_once('.').ok_or(SessionError::Malformed)?;

        let expected = self.sign(payload.as_bytes())?;
        if !constant_time_compare(signature, &expected) {
            return Err(SessionError::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::BadEncoding)?;
        serde_json::from_slice(&json).map_err(|e| SessionError::BadPayload(e.to_string()))
    }

    fn sign(&self, data: &[u8]) -> Result<String, SessionError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SessionError::InvalidKey)?;
        mac.update(data);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Constant-time string comparison to prevent timing attacks.
///
/// Lengths are compared in constant time too; shorter input is padded with a
/// byte that guarantees a mismatch.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}
