use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    digest,
    jws::{self, Header, JwsVerifier},
    kb, ClaimAccess, ClaimPath, DecodeError, JsonPointerBuf, KeyBindingClaims, KeyBindingError,
    KeyBindingExpectation, RevealedClaims, SdJwt, SelectError, VerifyError,
};

/// Verification options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationOptions {
    /// Accepted distance between the key binding JWT `iat` and `now`, in
    /// seconds.
    pub max_clock_skew: i64,

    /// Verification time, seconds since the epoch. Defaults to the current
    /// time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now: Option<i64>,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            max_clock_skew: 300,
            now: None,
        }
    }
}

impl VerificationOptions {
    fn now(&self) -> i64 {
        self.now.unwrap_or_else(|| chrono::Utc::now().timestamp())
    }
}

/// Claims of a verified SD-JWT.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedSdJwt {
    /// Header of the issuer-signed JWT.
    pub header: Header,

    /// Issuer claims with the presented disclosures revealed.
    pub claims: Map<String, Value>,

    /// Location of each presented disclosure in `claims`.
    pub disclosed_paths: Vec<JsonPointerBuf>,

    pub key_binding: Option<KeyBindingClaims>,
}

impl VerifiedSdJwt {
    /// Revealed claim at a `$.name.name` path.
    pub fn claim(&self, path: &str) -> Result<Option<&Value>, SelectError> {
        let path = ClaimPath::parse(path)?;
        let keys: Vec<&str> = path.segments().iter().map(String::as_str).collect();
        Ok(self.claims.value_at(&keys))
    }
}

/// Checks the issuer signature and the disclosures of SD-JWTs from one
/// issuer.
#[derive(Debug, Clone)]
pub struct SdJwtVerifier<V> {
    issuer: V,
    options: VerificationOptions,
}

impl<V: JwsVerifier> SdJwtVerifier<V> {
    pub fn new(issuer: V) -> Self {
        Self::with_options(issuer, VerificationOptions::default())
    }

    pub fn with_options(issuer: V, options: VerificationOptions) -> Self {
        Self { issuer, options }
    }

    pub fn options(&self) -> &VerificationOptions {
        &self.options
    }

    /// Verifies the issuer signature and reveals the presented disclosures.
    ///
    /// Fails with [`KeyBindingError::UnverifiedKeyBinding`] if the SD-JWT
    /// carries a key binding JWT, which only
    /// [`verify_with_key_binding`](Self::verify_with_key_binding) checks.
    pub fn verify(&self, sd_jwt: &SdJwt) -> Result<VerifiedSdJwt, VerifyError> {
        if sd_jwt.key_binding_jwt().is_some() {
            log::warn!("key binding JWT presented without expectations");
            return Err(KeyBindingError::UnverifiedKeyBinding.into());
        }

        self.verify_issuer_signed(sd_jwt)
    }

    fn verify_issuer_signed(&self, sd_jwt: &SdJwt) -> Result<VerifiedSdJwt, VerifyError> {
        let (header, payload) = jws::decode_verify(sd_jwt.jwt(), &self.issuer)?;
        let payload = match payload {
            Value::Object(payload) => payload,
            _ => return Err(DecodeError::PayloadNotObject.into()),
        };

        let sd_alg = digest::sd_alg(&payload)?;
        let RevealedClaims {
            claims,
            disclosed_paths,
        } = crate::reveal::reveal(&payload, sd_alg, sd_jwt.disclosures())?;

        Ok(VerifiedSdJwt {
            header,
            claims,
            disclosed_paths,
            key_binding: None,
        })
    }

    /// Like [`verify`](Self::verify), but requires a key binding JWT signed
    /// by `holder` for `expectation`.
    pub fn verify_with_key_binding(
        &self,
        sd_jwt: &SdJwt,
        holder: &impl JwsVerifier,
        expectation: &KeyBindingExpectation,
    ) -> Result<VerifiedSdJwt, VerifyError> {
        let mut verified = self.verify_issuer_signed(sd_jwt)?;

        let kb_jwt = sd_jwt
            .key_binding_jwt()
            .ok_or(KeyBindingError::MissingKeyBinding)?;
        let expected_sd_hash = sd_jwt.sd_hash()?;

        let claims = kb::verify_key_binding_jwt(
            kb_jwt,
            holder,
            &expected_sd_hash,
            expectation,
            self.options.now(),
            self.options.max_clock_skew,
        )
        .map_err(|e| {
            log::warn!("key binding rejected: {e}");
            e
        })?;

        verified.key_binding = Some(claims);
        Ok(verified)
    }
}
