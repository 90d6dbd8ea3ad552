use serde_json::{Map, Value};

use crate::{
    DigestCreator, Disclosure, EncodeError, RandomSaltProvider, SaltProvider, SdElement, SdObject,
    ARRAY_CLAIM_ITEM_PROPERTY_NAME, SD_ALG_CLAIM_NAME, SD_CLAIM_NAME,
};

/// Compiled claim tree, ready to be signed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedSdJwt {
    /// JWT claims with digests in place of concealed claims.
    pub payload: Map<String, Value>,

    /// Disclosures, inner ones before the recursive disclosures embedding
    /// them.
    pub disclosures: Vec<Disclosure>,
}

/// Compiles claim trees into SD-JWT payloads and disclosures.
#[derive(Debug, Clone, Default)]
pub struct SdJwtFactory<S = RandomSaltProvider> {
    digests: DigestCreator<S>,
}

impl SdJwtFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SaltProvider> SdJwtFactory<S> {
    pub fn with_salt_provider(salt_provider: S) -> Self {
        Self {
            digests: DigestCreator::with_salt_provider(salt_provider),
        }
    }

    pub fn digest_creator(&self) -> &DigestCreator<S> {
        &self.digests
    }

    /// Compiles `claims` depth first.
    ///
    /// Plain claims are copied, flat claims are replaced by a digest (an
    /// `_sd` entry in objects, a `{"...": digest}` item in arrays), and
    /// recursive claims are compiled and then concealed as a whole.
    pub fn create(&self, claims: &SdObject) -> Result<UnsignedSdJwt, EncodeError> {
        let mut disclosures = Vec::with_capacity(claims.expected_digests());
        let mut payload = self.compile_object(claims, &mut disclosures)?;
        payload.insert(
            SD_ALG_CLAIM_NAME.to_owned(),
            self.digests.sd_alg().to_str().into(),
        );

        log::debug!(
            "compiled {} claims into {} disclosures",
            claims.len(),
            disclosures.len()
        );

        Ok(UnsignedSdJwt {
            payload,
            disclosures,
        })
    }

    fn compile_object(
        &self,
        object: &SdObject,
        disclosures: &mut Vec<Disclosure>,
    ) -> Result<Map<String, Value>, EncodeError> {
        let mut output = Map::new();
        let mut sd = Vec::new();

        for (name, element) in object {
            match element {
                SdElement::Plain(value) => {
                    check_reserved_keys(value)?;
                    output.insert(name.clone(), value.clone());
                }
                SdElement::Flat(value) => {
                    check_reserved_keys(value)?;
                    sd.push(self.disclose(Some(name), value.clone(), disclosures));
                }
                SdElement::Object(inner) => {
                    let inner = self.compile_object(inner, disclosures)?;
                    output.insert(name.clone(), Value::Object(inner));
                }
                SdElement::Array(items) => {
                    let items = self.compile_array(items, disclosures)?;
                    output.insert(name.clone(), Value::Array(items));
                }
                SdElement::RecursiveObject(inner) => {
                    let inner = Value::Object(self.compile_object(inner, disclosures)?);
                    sd.push(self.disclose(Some(name), inner, disclosures));
                }
                SdElement::RecursiveArray(items) => {
                    let items = Value::Array(self.compile_array(items, disclosures)?);
                    sd.push(self.disclose(Some(name), items, disclosures));
                }
            }
        }

        if !sd.is_empty() {
            output.insert(SD_CLAIM_NAME.to_owned(), Value::Array(sd));
        }

        Ok(output)
    }

    fn compile_array(
        &self,
        items: &[SdElement],
        disclosures: &mut Vec<Disclosure>,
    ) -> Result<Vec<Value>, EncodeError> {
        let mut output = Vec::with_capacity(items.len());

        for item in items {
            let value = match item {
                SdElement::Plain(value) => {
                    check_reserved_keys(value)?;
                    value.clone()
                }
                SdElement::Flat(value) => {
                    check_reserved_keys(value)?;
                    let digest = self.disclose(None, value.clone(), disclosures);
                    array_item_marker(digest)
                }
                SdElement::Object(inner) => Value::Object(self.compile_object(inner, disclosures)?),
                SdElement::Array(inner) => Value::Array(self.compile_array(inner, disclosures)?),
                SdElement::RecursiveObject(inner) => {
                    let inner = Value::Object(self.compile_object(inner, disclosures)?);
                    array_item_marker(self.disclose(None, inner, disclosures))
                }
                SdElement::RecursiveArray(inner) => {
                    let inner = Value::Array(self.compile_array(inner, disclosures)?);
                    array_item_marker(self.disclose(None, inner, disclosures))
                }
            };
            output.push(value);
        }

        Ok(output)
    }

    /// Creates a disclosure, records it and returns its digest.
    fn disclose(&self, name: Option<&str>, value: Value, disclosures: &mut Vec<Disclosure>) -> Value {
        let disclosure = Disclosure::new(self.digests.new_salt(), name, value);
        let digest = self.digests.hash_and_encode(disclosure.as_str());
        log::trace!("disclosure {} has digest {digest}", disclosure.as_str());
        disclosures.push(disclosure);
        Value::String(digest)
    }
}

fn array_item_marker(digest: Value) -> Value {
    let mut object = Map::new();
    object.insert(ARRAY_CLAIM_ITEM_PROPERTY_NAME.to_owned(), digest);
    Value::Object(object)
}

/// Rejects values that would be mistaken for SD-JWT structure when revealed.
fn check_reserved_keys(value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::Object(object) => {
            for (key, value) in object {
                if matches!(
                    key.as_str(),
                    SD_CLAIM_NAME | SD_ALG_CLAIM_NAME | ARRAY_CLAIM_ITEM_PROPERTY_NAME
                ) {
                    return Err(EncodeError::ReservedClaimName(key.clone()));
                }
                check_reserved_keys(value)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_reserved_keys),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedSaltProvider, SdAlg, SdObjectBuilder};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sd_digests(object: &Value) -> Vec<&str> {
        object[SD_CLAIM_NAME]
            .as_array()
            .map(|sd| sd.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn plain_claims_are_copied() {
        let claims = SdObjectBuilder::new()
            .plain("iss", "https://example.com/issuer")
            .plain("array", json!(["GR", "DE"]))
            .build()
            .unwrap();

        let UnsignedSdJwt {
            payload,
            disclosures,
        } = SdJwtFactory::new().create(&claims).unwrap();

        assert!(disclosures.is_empty());
        assert_eq!(
            Value::Object(payload),
            json!({
                "iss": "https://example.com/issuer",
                "array": ["GR", "DE"],
                "_sd_alg": "sha-256"
            })
        );
    }

    #[test]
    fn flat_claim_with_fixed_salt() {
        let claims = SdObjectBuilder::new()
            .flat("family_name", "Möbius")
            .build()
            .unwrap();

        let factory = SdJwtFactory::with_salt_provider(FixedSaltProvider::new("6qMQvRL5haj"));
        let UnsignedSdJwt {
            payload,
            disclosures,
        } = factory.create(&claims).unwrap();

        assert_eq!(disclosures.len(), 1);
        assert_eq!(
            disclosures[0].as_str(),
            "WyI2cU1RdlJMNWhhaiIsImZhbWlseV9uYW1lIiwiTcO2Yml1cyJd"
        );
        assert_eq!(
            Value::Object(payload),
            json!({
                "_sd": [disclosures[0].digest(SdAlg::Sha256)],
                "_sd_alg": "sha-256"
            })
        );
    }

    #[test]
    fn flat_array_items_become_markers() {
        let claims = SdObjectBuilder::new()
            .array("nationalities", |n| n.flat("DE").plain("GR").flat(123))
            .build()
            .unwrap();

        let UnsignedSdJwt {
            payload,
            disclosures,
        } = SdJwtFactory::new().create(&claims).unwrap();

        assert_eq!(disclosures.len(), 2);
        assert_eq!(disclosures[0].kind, crate::DisclosureKind::ArrayItem(json!("DE")));
        assert_eq!(
            payload["nationalities"],
            json!([
                {"...": disclosures[0].digest(SdAlg::Sha256)},
                "GR",
                {"...": disclosures[1].digest(SdAlg::Sha256)}
            ])
        );
        assert!(payload.get(SD_CLAIM_NAME).is_none());
    }

    #[test]
    fn recursive_object_embeds_processed_subtree() {
        let claims = SdObjectBuilder::new()
            .recursive_object("address", |address| {
                address
                    .flat("street_address", "Schulstr. 12")
                    .plain("country", "DE")
            })
            .build()
            .unwrap();

        let UnsignedSdJwt {
            payload,
            disclosures,
        } = SdJwtFactory::new().create(&claims).unwrap();

        // inner disclosure first, then the wrapper
        assert_eq!(disclosures.len(), 2);
        let (inner, wrapper) = (&disclosures[0], &disclosures[1]);
        assert_eq!(inner.claim_name(), Some("street_address"));
        assert_eq!(wrapper.claim_name(), Some("address"));

        let inner_digest = inner.digest(SdAlg::Sha256);
        let wrapper_digest = wrapper.digest(SdAlg::Sha256);
        assert_eq!(
            wrapper.value(),
            &json!({ "_sd": [inner_digest], "country": "DE" })
        );
        assert_eq!(sd_digests(&Value::Object(payload)), [wrapper_digest.as_str()]);
        assert!(!sd_digests(wrapper.value()).contains(&wrapper_digest.as_str()));
    }

    #[test]
    fn recursive_array_embeds_markers() {
        let claims = SdObjectBuilder::new()
            .recursive_array("nationalities", |n| n.flat("DE").plain("GR"))
            .build()
            .unwrap();

        let UnsignedSdJwt {
            payload,
            disclosures,
        } = SdJwtFactory::new().create(&claims).unwrap();

        assert_eq!(disclosures.len(), 2);
        assert_eq!(
            disclosures[1].value(),
            &json!([{"...": disclosures[0].digest(SdAlg::Sha256)}, "GR"])
        );
        assert!(payload.get("nationalities").is_none());
        assert_eq!(
            sd_digests(&Value::Object(payload)),
            [disclosures[1].digest(SdAlg::Sha256).as_str()]
        );
    }

    #[test]
    fn reserved_keys_in_values_are_rejected() {
        for value in [
            json!({"_sd": ["abc"]}),
            json!([{"nested": {"...": "abc"}}]),
            json!({"_sd_alg": "sha-256"}),
        ] {
            let claims = SdObjectBuilder::new().flat("claim", value.clone()).build().unwrap();
            assert!(matches!(
                SdJwtFactory::new().create(&claims),
                Err(EncodeError::ReservedClaimName(_))
            ));

            let claims = SdObjectBuilder::new().plain("claim", value).build().unwrap();
            assert!(matches!(
                SdJwtFactory::new().create(&claims),
                Err(EncodeError::ReservedClaimName(_))
            ));
        }
    }
}
