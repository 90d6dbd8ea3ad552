//! Key binding JWT.
//!
//! Signed by the holder over the presentation it is appended to, the key
//! binding JWT proves possession of the holder key to one audience, for one
//! nonce.
use serde::{Deserialize, Serialize};

use crate::{
    jws::{self, Algorithm, Header, JwsSigner, JwsVerifier},
    KeyBindingError, SdAlg,
};

/// `typ` header of key binding JWTs.
pub const KB_JWT_TYPE: &str = "kb+jwt";

/// Holder chosen parameters of a key binding JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindingProperties {
    pub alg: Algorithm,

    /// Issuance time, seconds since the epoch.
    pub iat: i64,

    pub aud: String,

    pub nonce: String,
}

impl KeyBindingProperties {
    /// Properties issued now.
    pub fn new(alg: Algorithm, aud: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            alg,
            iat: chrono::Utc::now().timestamp(),
            aud: aud.into(),
            nonce: nonce.into(),
        }
    }

    pub fn with_issued_at(mut self, iat: i64) -> Self {
        self.iat = iat;
        self
    }
}

/// Payload of a key binding JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindingClaims {
    pub iat: i64,
    pub aud: String,
    pub nonce: String,

    /// Digest of the presentation, up to and including its last `~`.
    pub sd_hash: String,
}

/// What a verifier requires from a key binding JWT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindingExpectation {
    pub audience: String,
    pub nonce: String,
}

impl KeyBindingExpectation {
    pub fn new(audience: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            nonce: nonce.into(),
        }
    }
}

pub fn sd_hash(sd_alg: SdAlg, presentation: &str) -> String {
    sd_alg.hash(presentation)
}

pub fn create_key_binding_jwt(
    properties: &KeyBindingProperties,
    sd_hash: String,
    signer: &impl JwsSigner,
) -> Result<String, KeyBindingError> {
    let header = Header::new(properties.alg).with_type(KB_JWT_TYPE);
    let claims = KeyBindingClaims {
        iat: properties.iat,
        aud: properties.aud.clone(),
        nonce: properties.nonce.clone(),
        sd_hash,
    };

    Ok(jws::encode_sign(&header, &claims, signer)?)
}

/// Verifies a key binding JWT against the presentation digest it must
/// carry.
///
/// `iat` must be within `max_clock_skew` seconds of `now`, in either
/// direction.
pub fn verify_key_binding_jwt(
    kb_jwt: &str,
    verifier: &impl JwsVerifier,
    expected_sd_hash: &str,
    expectation: &KeyBindingExpectation,
    now: i64,
    max_clock_skew: i64,
) -> Result<KeyBindingClaims, KeyBindingError> {
    let (header, payload) = jws::decode_verify(kb_jwt, verifier)?;

    if header.type_.as_deref() != Some(KB_JWT_TYPE) {
        return Err(KeyBindingError::WrongType(header.type_));
    }

    let claims: KeyBindingClaims = serde_json::from_value(payload)?;

    if claims.aud != expectation.audience {
        return Err(KeyBindingError::AudienceMismatch);
    }

    if claims.nonce != expectation.nonce {
        return Err(KeyBindingError::NonceMismatch);
    }

    if claims.sd_hash != expected_sd_hash {
        return Err(KeyBindingError::SdHashMismatch);
    }

    let max_clock_skew = u64::try_from(max_clock_skew).unwrap_or(0);
    if now.abs_diff(claims.iat) > max_clock_skew {
        return Err(KeyBindingError::IssuedAtOutOfRange(claims.iat));
    }

    Ok(claims)
}
