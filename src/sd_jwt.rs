use std::{fmt, str::FromStr};

use serde_json::{Map, Value};

use crate::{
    digest,
    jws::{self, Header, JwsSigner},
    kb, DecodeError, Disclosure, EncodeError, KeyBindingError, KeyBindingProperties, SaltProvider,
    SdJwtFactory, SdObject, SelectError, UnsignedSdJwt,
};

const SEPARATOR: char = '~';

/// SD-JWT in its compact form:
/// `<issuer-signed JWT>~<disclosure>~...~<disclosure>~[<key binding JWT>]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SdJwt {
    jwt: String,
    disclosures: Vec<Disclosure>,
    key_binding_jwt: Option<String>,
}

impl SdJwt {
    pub fn new(jwt: String, disclosures: Vec<Disclosure>) -> Self {
        Self {
            jwt,
            disclosures,
            key_binding_jwt: None,
        }
    }

    /// Compiles `claims`, signs the payload and attaches every disclosure.
    pub fn issue<S: SaltProvider>(
        factory: &SdJwtFactory<S>,
        claims: &SdObject,
        header: &Header,
        signer: &impl JwsSigner,
    ) -> Result<Self, EncodeError> {
        let UnsignedSdJwt {
            payload,
            disclosures,
        } = factory.create(claims)?;
        let jwt = jws::encode_sign(header, &payload, signer)?;
        Ok(Self::new(jwt, disclosures))
    }

    /// Parses the compact form, decoding every disclosure.
    pub fn parse(s: &str) -> Result<Self, DecodeError> {
        let mut parts: Vec<&str> = s.split(SEPARATOR).collect();
        if parts.len() < 2 {
            return Err(DecodeError::UnableToDeserializeStringFormat);
        }

        let key_binding_jwt = parts.pop().filter(|kb| !kb.is_empty()).map(ToOwned::to_owned);
        let jwt = parts.remove(0);
        if jwt.is_empty() {
            return Err(DecodeError::UnableToDeserializeStringFormat);
        }

        let disclosures = parts
            .into_iter()
            .map(Disclosure::decode)
            .collect::<Result<_, _>>()?;

        Ok(Self {
            jwt: jwt.to_owned(),
            disclosures,
            key_binding_jwt,
        })
    }

    /// Issuer-signed JWT.
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    pub fn disclosures(&self) -> &[Disclosure] {
        &self.disclosures
    }

    pub fn key_binding_jwt(&self) -> Option<&str> {
        self.key_binding_jwt.as_deref()
    }

    /// Payload of the issuer-signed JWT, without checking its signature.
    pub fn payload_unverified(&self) -> Result<Map<String, Value>, DecodeError> {
        match jws::decode_unverified(&self.jwt)?.1 {
            Value::Object(claims) => Ok(claims),
            _ => Err(DecodeError::PayloadNotObject),
        }
    }

    /// Keeps only the disclosures revealing the claims at `paths`.
    ///
    /// Any key binding JWT is dropped, it no longer matches.
    pub fn present<P: AsRef<str>>(&self, paths: &[P]) -> Result<Self, SelectError> {
        let payload = self.payload_unverified()?;
        let disclosures = crate::select_disclosures(&payload, &self.disclosures, paths)?
            .into_iter()
            .cloned()
            .collect();

        Ok(Self::new(self.jwt.clone(), disclosures))
    }

    /// Compact form without the key binding JWT, ending with `~`.
    pub fn presentation(&self) -> String {
        let mut out = self.jwt.clone();
        out.push(SEPARATOR);
        for disclosure in &self.disclosures {
            out.push_str(disclosure.as_str());
            out.push(SEPARATOR);
        }
        out
    }

    /// Digest of [`presentation`](Self::presentation) under the payload's
    /// `_sd_alg`.
    pub fn sd_hash(&self) -> Result<String, DecodeError> {
        let sd_alg = digest::sd_alg(&self.payload_unverified()?)?;
        Ok(kb::sd_hash(sd_alg, &self.presentation()))
    }

    /// Appends a key binding JWT signed by the holder, replacing any
    /// previous one.
    pub fn bind(
        mut self,
        properties: &KeyBindingProperties,
        signer: &impl JwsSigner,
    ) -> Result<Self, KeyBindingError> {
        let sd_hash = self.sd_hash()?;
        self.key_binding_jwt = Some(kb::create_key_binding_jwt(properties, sd_hash, signer)?);
        Ok(self)
    }
}

impl FromStr for SdJwt {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SdJwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.presentation())?;
        if let Some(kb) = &self.key_binding_jwt {
            f.write_str(kb)?;
        }
        Ok(())
    }
}
