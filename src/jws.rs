use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

use crate::error::JwsError;

// RFC 7515 - JSON Web Signature (JWS)
//
// Only the compact serialization is needed here. The cryptography itself is
// abstracted behind `JwsSigner` and `JwsVerifier`.

/// Signature algorithm of the `alg` header parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECDSA using P-256 and SHA-256
    ES256,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ES256 => "ES256",
        }
    }
}

impl FromStr for Algorithm {
    type Err = JwsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ES256" => Ok(Self::ES256),
            other => Err(JwsError::UnsupportedAlgorithm(other.to_owned())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// JOSE header.
///
/// Parameters other than `alg`, `typ` and `kid` are ignored when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "alg")]
    pub algorithm: Algorithm,

    #[serde(rename = "typ", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(rename = "kid", default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

impl Header {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            type_: None,
            key_id: None,
        }
    }

    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Decodes a base64url header, distinguishing a missing `alg` from an
    /// unknown one.
    fn decode(header_b64: &str) -> Result<Self, JwsError> {
        let bytes = BASE64_URL_SAFE_NO_PAD.decode(header_b64)?;
        let header: serde_json::Map<String, Value> =
            serde_json::from_slice(&bytes).map_err(|_| JwsError::InvalidJws)?;

        match header.get("alg") {
            None => return Err(JwsError::MissingAlgorithm),
            Some(Value::String(alg)) => {
                Algorithm::from_str(alg)?;
            }
            Some(_) => return Err(JwsError::InvalidJws),
        }

        Ok(serde_json::from_value(Value::Object(header))?)
    }
}

/// Signing capability.
///
/// Implementations hold their own secret key and produce the raw signature
/// over the JWS signing input.
pub trait JwsSigner {
    fn algorithm(&self) -> Algorithm;

    fn sign_bytes(&self, signing_input: &[u8]) -> Result<Vec<u8>, JwsError>;
}

impl<T: ?Sized + JwsSigner> JwsSigner for &T {
    fn algorithm(&self) -> Algorithm {
        T::algorithm(*self)
    }

    fn sign_bytes(&self, signing_input: &[u8]) -> Result<Vec<u8>, JwsError> {
        T::sign_bytes(*self, signing_input)
    }
}

/// Verification capability.
pub trait JwsVerifier {
    fn algorithm(&self) -> Algorithm;

    fn verify_bytes(&self, signing_input: &[u8], signature: &[u8]) -> Result<(), JwsError>;
}

impl<T: ?Sized + JwsVerifier> JwsVerifier for &T {
    fn algorithm(&self) -> Algorithm {
        T::algorithm(*self)
    }

    fn verify_bytes(&self, signing_input: &[u8], signature: &[u8]) -> Result<(), JwsError> {
        T::verify_bytes(*self, signing_input, signature)
    }
}

/// Signs `payload` and returns the compact JWS.
pub fn encode_sign<T: Serialize + ?Sized>(
    header: &Header,
    payload: &T,
    signer: &impl JwsSigner,
) -> Result<String, JwsError> {
    if header.algorithm != signer.algorithm() {
        return Err(JwsError::AlgorithmMismatch);
    }

    let header_b64 = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let payload_b64 = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = signer.sign_bytes(signing_input.as_bytes())?;

    Ok(format!(
        "{signing_input}.{}",
        BASE64_URL_SAFE_NO_PAD.encode(signature)
    ))
}

pub fn split_jws(jws: &str) -> Result<(&str, &str, &str), JwsError> {
    let mut parts = jws.splitn(3, '.');
    Ok(match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(c)) if !c.contains('.') => (a, b, c),
        _ => return Err(JwsError::InvalidJws),
    })
}

pub struct DecodedJws<'a> {
    pub header: Header,
    pub signing_input: &'a [u8],
    pub payload: Value,
    pub signature: Vec<u8>,
}

/// Decodes the header, JSON payload and signature of a compact JWS.
pub fn decode_jws(jws: &str) -> Result<DecodedJws, JwsError> {
    let (header_b64, payload_b64, signature_b64) = split_jws(jws)?;
    let header = Header::decode(header_b64)?;
    let payload = serde_json::from_slice(&BASE64_URL_SAFE_NO_PAD.decode(payload_b64)?)?;
    let signature = BASE64_URL_SAFE_NO_PAD.decode(signature_b64)?;
    let signing_input = &jws.as_bytes()[..header_b64.len() + 1 + payload_b64.len()];

    Ok(DecodedJws {
        header,
        signing_input,
        payload,
        signature,
    })
}

pub fn decode_verify(jws: &str, verifier: &impl JwsVerifier) -> Result<(Header, Value), JwsError> {
    let DecodedJws {
        header,
        signing_input,
        payload,
        signature,
    } = decode_jws(jws)?;

    if header.algorithm != verifier.algorithm() {
        return Err(JwsError::AlgorithmMismatch);
    }

    verifier.verify_bytes(signing_input, &signature)?;
    Ok((header, payload))
}

/// Decodes a compact JWS without checking its signature.
pub fn decode_unverified(jws: &str) -> Result<(Header, Value), JwsError> {
    let DecodedJws {
        header, payload, ..
    } = decode_jws(jws)?;
    Ok((header, payload))
}

#[cfg(feature = "p256")]
pub use es256::{Es256Signer, Es256Verifier};

#[cfg(feature = "p256")]
mod es256 {
    use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
    use p256::ecdsa::{signature::Signer, signature::Verifier, Signature, SigningKey, VerifyingKey};
    use rand::{CryptoRng, RngCore};
    use serde_json::{json, Value};

    use super::{Algorithm, JwsSigner, JwsVerifier};
    use crate::error::JwsError;

    const P256: &str = "P-256";
    const EC_UNCOMPRESSED_POINT_TAG: &[u8] = &[0x04];

    /// ES256 signer over a P-256 secret key.
    #[derive(Clone)]
    pub struct Es256Signer {
        key: SigningKey,
    }

    impl Es256Signer {
        pub fn new(key: SigningKey) -> Self {
            Self { key }
        }

        pub fn generate() -> Self {
            let mut rng = rand::rngs::OsRng {};
            Self::generate_from(&mut rng)
        }

        pub fn generate_from(rng: &mut (impl CryptoRng + RngCore)) -> Self {
            Self::new(SigningKey::random(rng))
        }

        /// Reads a private EC JWK (`d` is required).
        pub fn from_jwk(jwk: &Value) -> Result<Self, JwsError> {
            check_ec_params(jwk)?;
            let d = coordinate(jwk, "d")?;
            let key = SigningKey::from_slice(&d)
                .map_err(|_| JwsError::InvalidKey("invalid P-256 secret key".to_owned()))?;
            Ok(Self::new(key))
        }

        pub fn verifier(&self) -> Es256Verifier {
            Es256Verifier::new(VerifyingKey::from(&self.key))
        }

        pub fn public_jwk(&self) -> Value {
            self.verifier().public_jwk()
        }
    }

    impl JwsSigner for Es256Signer {
        fn algorithm(&self) -> Algorithm {
            Algorithm::ES256
        }

        fn sign_bytes(&self, signing_input: &[u8]) -> Result<Vec<u8>, JwsError> {
            let signature: Signature = self.key.sign(signing_input);
            Ok(signature.to_bytes().to_vec())
        }
    }

    /// ES256 verifier over a P-256 public key.
    #[derive(Debug, Clone)]
    pub struct Es256Verifier {
        key: VerifyingKey,
    }

    impl Es256Verifier {
        pub fn new(key: VerifyingKey) -> Self {
            Self { key }
        }

        /// Reads a public EC JWK.
        pub fn from_jwk(jwk: &Value) -> Result<Self, JwsError> {
            check_ec_params(jwk)?;
            let x = coordinate(jwk, "x")?;
            let y = coordinate(jwk, "y")?;
            let pk_data = [EC_UNCOMPRESSED_POINT_TAG, x.as_slice(), y.as_slice()].concat();
            let key = VerifyingKey::from_sec1_bytes(&pk_data)
                .map_err(|_| JwsError::InvalidKey("invalid P-256 public key".to_owned()))?;
            Ok(Self::new(key))
        }

        pub fn public_jwk(&self) -> Value {
            let encoded_point = self.key.to_encoded_point(false);
            let mut jwk = json!({ "kty": "EC", "crv": P256 });
            if let (Some(x), Some(y)) = (encoded_point.x(), encoded_point.y()) {
                jwk["x"] = BASE64_URL_SAFE_NO_PAD.encode(x).into();
                jwk["y"] = BASE64_URL_SAFE_NO_PAD.encode(y).into();
            }
            jwk
        }
    }

    impl JwsVerifier for Es256Verifier {
        fn algorithm(&self) -> Algorithm {
            Algorithm::ES256
        }

        fn verify_bytes(&self, signing_input: &[u8], signature: &[u8]) -> Result<(), JwsError> {
            let signature =
                Signature::from_slice(signature).map_err(|_| JwsError::InvalidSignature)?;
            self.key
                .verify(signing_input, &signature)
                .map_err(|_| JwsError::InvalidSignature)
        }
    }

    fn check_ec_params(jwk: &Value) -> Result<(), JwsError> {
        if jwk.get("kty").and_then(Value::as_str) != Some("EC") {
            return Err(JwsError::InvalidKey("expected an EC key".to_owned()));
        }
        match jwk.get("crv").and_then(Value::as_str) {
            Some(P256) => Ok(()),
            Some(other) => Err(JwsError::InvalidKey(format!("curve not implemented: {other}"))),
            None => Err(JwsError::InvalidKey("missing curve".to_owned())),
        }
    }

    fn coordinate(jwk: &Value, name: &str) -> Result<Vec<u8>, JwsError> {
        let encoded = jwk
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| JwsError::InvalidKey(format!("missing `{name}`")))?;
        BASE64_URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| JwsError::InvalidKey(format!("`{name}` is not base64url")))
    }
}
