use std::fmt;

use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use serde_json::Value;

use crate::{DecodeError, SdAlg};

/// Encodes a disclosure as compact JSON, base64url without padding.
///
/// `name` is `Some` for an object property (`[salt, name, value]`) and
/// `None` for an array item (`[salt, value]`).
pub fn encode(salt: &str, name: Option<&str>, value: &Value) -> String {
    let array = match name {
        Some(name) => serde_json::json!([salt, name, value]),
        None => serde_json::json!([salt, value]),
    };

    // Serializing a `Value` cannot fail.
    BASE64_URL_SAFE_NO_PAD.encode(array.to_string())
}

/// Decodes a disclosure token into `(salt, name, value)`.
pub fn decode(token: &str) -> Result<(String, Option<String>, Value), DecodeError> {
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| DecodeError::MalformedDisclosure)?;
    let array: Vec<Value> =
        serde_json::from_slice(&bytes).map_err(|_| DecodeError::MalformedDisclosure)?;

    let mut items = array.into_iter();
    match (items.next(), items.next(), items.next(), items.next()) {
        (Some(Value::String(salt)), Some(value), None, None) => Ok((salt, None, value)),
        (Some(Value::String(salt)), Some(Value::String(name)), Some(value), None) => {
            Ok((salt, Some(name), value))
        }
        _ => Err(DecodeError::MalformedDisclosure),
    }
}

/// What a disclosure reveals.
#[derive(Debug, Clone, PartialEq)]
pub enum DisclosureKind {
    /// Object member, `[salt, name, value]`
    Property { name: String, value: Value },

    /// Array element, `[salt, value]`
    ArrayItem(Value),
}

impl DisclosureKind {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Property { name, .. } => Some(name),
            Self::ArrayItem(_) => None,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Self::Property { value, .. } | Self::ArrayItem(value) => value,
        }
    }
}

/// A decoded disclosure, together with the exact token it was read from.
///
/// The token is kept verbatim because digests are computed over it; two
/// tokens decoding to the same triple (e.g. differing in JSON whitespace)
/// have different digests.
#[derive(Debug, Clone, PartialEq)]
pub struct Disclosure {
    encoded: String,
    pub salt: String,
    pub kind: DisclosureKind,
}

impl Disclosure {
    /// Builds a disclosure and its canonical compact encoding.
    pub fn new(salt: impl Into<String>, name: Option<&str>, value: Value) -> Self {
        let salt = salt.into();
        let encoded = encode(&salt, name, &value);
        let kind = match name {
            Some(name) => DisclosureKind::Property {
                name: name.to_owned(),
                value,
            },
            None => DisclosureKind::ArrayItem(value),
        };

        Self {
            encoded,
            salt,
            kind,
        }
    }

    pub fn property(salt: impl Into<String>, name: &str, value: Value) -> Self {
        Self::new(salt, Some(name), value)
    }

    pub fn array_item(salt: impl Into<String>, value: Value) -> Self {
        Self::new(salt, None, value)
    }

    pub fn decode(token: &str) -> Result<Self, DecodeError> {
        let (salt, name, value) = decode(token)?;
        let kind = match name {
            Some(name) => DisclosureKind::Property { name, value },
            None => DisclosureKind::ArrayItem(value),
        };

        Ok(Self {
            encoded: token.to_owned(),
            salt,
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn claim_name(&self) -> Option<&str> {
        self.kind.name()
    }

    pub fn value(&self) -> &Value {
        self.kind.value()
    }

    pub fn digest(&self, sd_alg: SdAlg) -> String {
        sd_alg.hash(&self.encoded)
    }
}

impl AsRef<str> for Disclosure {
    fn as_ref(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Disclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}
