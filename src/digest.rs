use std::{cell::RefCell, fmt, str::FromStr};

use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Digest;

use crate::{DecodeError, SD_ALG_CLAIM_NAME};

/// Elements of the _sd_alg claim
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SdAlg {
    /// SHA-256 Algorithm for hashing disclosures
    #[default]
    Sha256,
}

impl SdAlg {
    const SHA256_STR: &'static str = "sha-256";

    /// String encoding of _sd_alg field
    pub fn to_str(&self) -> &'static str {
        match self {
            SdAlg::Sha256 => Self::SHA256_STR,
        }
    }

    /// Hash an encoded disclosure token.
    ///
    /// The digest is computed over the bytes of the base64url token as
    /// transmitted, not over the decoded JSON array.
    pub fn hash(&self, disclosure: &str) -> String {
        match self {
            Self::Sha256 => {
                let digest = sha2::Sha256::digest(disclosure.as_bytes());
                BASE64_URL_SAFE_NO_PAD.encode(digest)
            }
        }
    }
}

impl FromStr for SdAlg {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SdAlg::try_from(s)
    }
}

impl TryFrom<&str> for SdAlg {
    type Error = DecodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            Self::SHA256_STR => SdAlg::Sha256,
            other => return Err(DecodeError::UnknownSdAlg(other.to_owned())),
        })
    }
}

impl From<SdAlg> for &'static str {
    fn from(value: SdAlg) -> Self {
        value.to_str()
    }
}

impl fmt::Display for SdAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_str().fmt(f)
    }
}

impl Serialize for SdAlg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SdAlg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Reads the `_sd_alg` claim of an SD-JWT payload.
pub fn sd_alg(claims: &serde_json::Map<String, serde_json::Value>) -> Result<SdAlg, DecodeError> {
    let alg_name = claims
        .get(SD_ALG_CLAIM_NAME)
        .and_then(serde_json::Value::as_str)
        .ok_or(DecodeError::MissingSdAlg)?;

    SdAlg::try_from(alg_name)
}

/// Source of disclosure salts.
pub trait SaltProvider {
    /// Returns a fresh base64url (unpadded) salt.
    fn salt(&self) -> String;
}

const DEFAULT_SALT_SIZE: usize = 128 / 8;

fn generate_salt(rng: &mut (impl CryptoRng + RngCore)) -> String {
    let mut salt_bytes = [0u8; DEFAULT_SALT_SIZE];
    rng.fill_bytes(&mut salt_bytes);
    BASE64_URL_SAFE_NO_PAD.encode(salt_bytes)
}

/// 128-bit salts from the operating system's CSPRNG.
///
/// Stateless, so one provider can be shared between threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSaltProvider;

impl SaltProvider for RandomSaltProvider {
    fn salt(&self) -> String {
        let mut rng = rand::rngs::OsRng {};
        generate_salt(&mut rng)
    }
}

/// 128-bit salts drawn from a caller supplied RNG, typically a seeded one.
#[derive(Debug)]
pub struct RngSaltProvider<R> {
    rng: RefCell<R>,
}

impl<R: CryptoRng + RngCore> RngSaltProvider<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng: RefCell::new(rng),
        }
    }
}

impl<R: CryptoRng + RngCore> SaltProvider for RngSaltProvider<R> {
    fn salt(&self) -> String {
        generate_salt(&mut *self.rng.borrow_mut())
    }
}

/// Always returns the same salt.
///
/// Salts must be unique per disclosure, so this is only suitable for
/// reproducing known test vectors.
#[derive(Debug, Clone)]
pub struct FixedSaltProvider(String);

impl FixedSaltProvider {
    pub fn new(salt: impl Into<String>) -> Self {
        Self(salt.into())
    }
}

impl SaltProvider for FixedSaltProvider {
    fn salt(&self) -> String {
        self.0.clone()
    }
}

impl<T: ?Sized + SaltProvider> SaltProvider for &T {
    fn salt(&self) -> String {
        T::salt(*self)
    }
}

/// Salt generation and disclosure hashing.
#[derive(Debug, Clone, Default)]
pub struct DigestCreator<S = RandomSaltProvider> {
    sd_alg: SdAlg,
    salt_provider: S,
}

impl DigestCreator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SaltProvider> DigestCreator<S> {
    pub fn with_salt_provider(salt_provider: S) -> Self {
        Self {
            sd_alg: SdAlg::default(),
            salt_provider,
        }
    }

    pub fn sd_alg(&self) -> SdAlg {
        self.sd_alg
    }

    pub fn new_salt(&self) -> String {
        self.salt_provider.salt()
    }

    pub fn hash_and_encode(&self, token: &str) -> String {
        self.sd_alg.hash(token)
    }
}
