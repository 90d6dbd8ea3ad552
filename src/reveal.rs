use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    select::concealed_array_item, Disclosure, DisclosureKind, JsonPointerBuf, RevealError, SdAlg,
    ARRAY_CLAIM_ITEM_PROPERTY_NAME, SD_ALG_CLAIM_NAME, SD_CLAIM_NAME,
};

/// Claims of an SD-JWT payload with the presented disclosures applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealedClaims {
    /// Claims without any SD-JWT structure left.
    pub claims: Map<String, Value>,

    /// Where each presented disclosure was found, in presentation order.
    pub disclosed_paths: Vec<JsonPointerBuf>,
}

/// Replaces the digests of `payload` by the values of `disclosures`.
///
/// Digests without a matching disclosure are removed. Every disclosure must
/// be referenced exactly once by the payload or by another disclosure.
pub fn reveal(
    payload: &Map<String, Value>,
    sd_alg: SdAlg,
    disclosures: &[Disclosure],
) -> Result<RevealedClaims, RevealError> {
    let mut in_progress: IndexMap<String, InProgressDisclosure> =
        IndexMap::with_capacity(disclosures.len());
    for disclosure in disclosures {
        let disclosure = InProgressDisclosure::new(disclosure, sd_alg);
        log::trace!("disclosure {} has digest {}", disclosure.disclosure, disclosure.hash);
        if in_progress.insert(disclosure.hash.clone(), disclosure).is_some() {
            return Err(RevealError::DuplicateDisclosure);
        }
    }

    let mut claims = payload.clone();
    claims.remove(SD_ALG_CLAIM_NAME);
    reveal_object(&JsonPointerBuf::default(), &mut claims, &mut in_progress)?;

    let mut disclosed_paths = Vec::with_capacity(in_progress.len());
    for (_, disclosure) in in_progress {
        match disclosure.pointer {
            Some(pointer) => disclosed_paths.push(pointer),
            None => {
                log::warn!("disclosure {} is not referenced by the payload", disclosure.disclosure);
                return Err(RevealError::DisclosureNotInPayload(
                    disclosure.disclosure.as_str().to_owned(),
                ));
            }
        }
    }

    log::debug!("revealed {} disclosures", disclosed_paths.len());

    Ok(RevealedClaims {
        claims,
        disclosed_paths,
    })
}

#[derive(Debug)]
struct InProgressDisclosure<'a> {
    disclosure: &'a Disclosure,
    hash: String,
    pointer: Option<JsonPointerBuf>,
}

impl<'a> InProgressDisclosure<'a> {
    fn new(disclosure: &'a Disclosure, sd_alg: SdAlg) -> Self {
        InProgressDisclosure {
            disclosure,
            hash: disclosure.digest(sd_alg),
            pointer: None,
        }
    }

    /// Marks the disclosure as found at `pointer`.
    fn consume(&mut self, pointer: JsonPointerBuf) -> Result<&'a DisclosureKind, RevealError> {
        if self.pointer.replace(pointer).is_some() {
            return Err(RevealError::DisclosureUsedMultipleTimes);
        }
        Ok(&self.disclosure.kind)
    }
}

fn reveal_value(
    pointer: &JsonPointerBuf,
    value: &mut Value,
    disclosures: &mut IndexMap<String, InProgressDisclosure>,
) -> Result<(), RevealError> {
    match value {
        Value::Object(object) => reveal_object(pointer, object, disclosures),
        Value::Array(array) => reveal_array(pointer, array, disclosures),
        _ => Ok(()),
    }
}

fn reveal_array(
    pointer: &JsonPointerBuf,
    array: &mut Vec<Value>,
    disclosures: &mut IndexMap<String, InProgressDisclosure>,
) -> Result<(), RevealError> {
    for mut item in std::mem::take(array) {
        let mut item_pointer = pointer.clone();
        item_pointer.push_index(array.len());

        if let Some(hash) = concealed_array_item(&item) {
            let Some(in_progress) = disclosures.get_mut(hash) else {
                // not disclosed
                continue;
            };

            if matches!(in_progress.disclosure.kind, DisclosureKind::Property { .. }) {
                return Err(RevealError::ExpectedArrayItemDisclosure);
            }
            item = in_progress.consume(item_pointer.clone())?.value().clone();
        } else if item
            .as_object()
            .is_some_and(|o| o.contains_key(ARRAY_CLAIM_ITEM_PROPERTY_NAME))
        {
            return Err(RevealError::InvalidDigest);
        }

        reveal_value(&item_pointer, &mut item, disclosures)?;
        array.push(item);
    }

    Ok(())
}

fn reveal_object(
    pointer: &JsonPointerBuf,
    object: &mut Map<String, Value>,
    disclosures: &mut IndexMap<String, InProgressDisclosure>,
) -> Result<(), RevealError> {
    if let Some(sd_claims) = object.remove(SD_CLAIM_NAME) {
        for (key, value) in reveal_sd_claim(pointer, &sd_claims, disclosures)? {
            if matches!(
                key.as_str(),
                SD_CLAIM_NAME | SD_ALG_CLAIM_NAME | ARRAY_CLAIM_ITEM_PROPERTY_NAME
            ) || object.contains_key(&key)
            {
                return Err(RevealError::ClaimCollision(key));
            }
            object.insert(key, value);
        }
    }

    // Revealed values are visited too, they may hold nested digests.
    for (key, sub_value) in object.iter_mut() {
        let mut pointer = pointer.clone();
        pointer.push(key);
        reveal_value(&pointer, sub_value, disclosures)?;
    }

    Ok(())
}

fn reveal_sd_claim(
    pointer: &JsonPointerBuf,
    sd_claim: &Value,
    disclosures: &mut IndexMap<String, InProgressDisclosure>,
) -> Result<Vec<(String, Value)>, RevealError> {
    let hashes = sd_claim.as_array().ok_or(RevealError::SdClaimNotArray)?;

    let mut found_disclosures = vec![];

    for disclosure_hash in hashes {
        let disclosure_hash = disclosure_hash.as_str().ok_or(RevealError::InvalidDigest)?;

        if let Some(in_progress) = disclosures.get_mut(disclosure_hash) {
            let disclosure = in_progress.disclosure;
            match &disclosure.kind {
                DisclosureKind::ArrayItem(_) => {
                    return Err(RevealError::ExpectedObjectEntryDisclosure)
                }
                DisclosureKind::Property { name, value } => {
                    let mut pointer = pointer.clone();
                    pointer.push(name);
                    in_progress.consume(pointer)?;
                    found_disclosures.push((name.clone(), value.clone()));
                }
            }
        }
    }

    Ok(found_disclosures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload_with(sd: &[&Disclosure], extra: Value) -> Map<String, Value> {
        let mut payload = extra.as_object().cloned().unwrap_or_default();
        payload.insert(
            SD_CLAIM_NAME.to_owned(),
            sd.iter().map(|d| Value::from(d.digest(SdAlg::Sha256))).collect(),
        );
        payload.insert(SD_ALG_CLAIM_NAME.to_owned(), json!("sha-256"));
        payload
    }

    #[test]
    fn reveal_rfc_example() {
        let payload = json!({
            "_sd": [
                "C9inp6YoRaEXR427zYJP7Qrk1WH_8bdwOA_YUrUnGQU",
                "Kuet1yAa0HIQvYnOVd59hcViO9Ug6J2kSfqYRBeowvE",
                "MMldOFFzB2d0umlmpTIaGerhWdU_PpYfLvKhh_f_9aY",
                "X6ZAYOII2vPN40V7xExZwVwz7yRmLNcVwt5DL8RLv4g",
                "Y34zmIo0QLLOtdMpXGwjBgLvr17yEhhYT0FGofR-aIE",
                "fyGp0WTwwPv2JDQln1lSiaeobZsMWA10bQ5989-9DTs",
                "ommFAicVT8LGHCB0uywx7fYuo3MHYKO15cz-RZEYM5Q",
                "s0BKYsLWxQQeU8tVlltM7MKsIRTrEIa1PkJmqxBBf5U"
            ],
            "iss": "https://example.com/issuer",
            "iat": 1683000000,
            "exp": 1883000000,
            "address": {
                "_sd": [
                    "6aUhzYhZ7SJ1kVmagQAO3u2ETN2CC1aHheZpKnaF0_E",
                    "AzLlFobkJ2xiaupREPyoJz-9-NSldB6Cgjr7fUyoHzg",
                    "PzzcVu0qbMuBGSjulfewzkesD9zutOExn5EWNwkrQ-k",
                    "b2Dkw0jcIF9rGg8_PF8ZcvncW7zwZj5ryBWvXfrpzek",
                    "cPYJHIZ8Vu-f9CCyVub2UfgEk8jvvXezwK1p_JneeXQ",
                    "glT3hrSU7fSWgwF5UDZmWwBTw32gnUldIhi8hGVCaV4",
                    "rvJd6iq6T5ejmsBMoGwuNXh9qAAFATAci40oidEeVsA",
                    "uNHoWYhXsZhVJCNE2Dqy-zqt7t69gJKy5QaFv7GrMX4"
                ]
            },
            "_sd_alg": "sha-256"
        });
        let disclosures = [
            "WyJHMDJOU3JRZmpGWFE3SW8wOXN5YWpBIiwgInJlZ2lvbiIsICJcdTZlMmZcdTUzM2EiXQ",
            "WyJsa2x4RjVqTVlsR1RQVW92TU5JdkNBIiwgImNvdW50cnkiLCAiSlAiXQ",
        ]
        .map(|token| Disclosure::decode(token).unwrap());

        let revealed = reveal(payload.as_object().unwrap(), SdAlg::Sha256, &disclosures).unwrap();

        assert_eq!(
            Value::Object(revealed.claims),
            json!({
                "iss": "https://example.com/issuer",
                "iat": 1683000000,
                "exp": 1883000000,
                "address": {
                    "region": "港区",
                    "country": "JP"
                }
            })
        );
        assert_eq!(
            revealed
                .disclosed_paths
                .iter()
                .map(JsonPointerBuf::as_str)
                .collect::<Vec<_>>(),
            ["/address/region", "/address/country"]
        );
    }

    #[test]
    fn reveal_array_items() {
        let de = Disclosure::array_item("salt1", json!("DE"));
        let fr = Disclosure::array_item("salt2", json!("FR"));
        let payload = json!({
            "nationalities": [
                {"...": de.digest(SdAlg::Sha256)},
                "GR",
                {"...": fr.digest(SdAlg::Sha256)}
            ],
            "_sd_alg": "sha-256"
        });

        let revealed = reveal(payload.as_object().unwrap(), SdAlg::Sha256, &[fr]).unwrap();
        assert_eq!(Value::Object(revealed.claims), json!({"nationalities": ["GR", "FR"]}));
        assert_eq!(revealed.disclosed_paths[0].as_str(), "/nationalities/1");
    }

    #[test]
    fn reveal_recursive_disclosures() {
        let street = Disclosure::property("salt1", "street_address", json!("Schulstr. 12"));
        let address = Disclosure::property(
            "salt2",
            "address",
            json!({"_sd": [street.digest(SdAlg::Sha256)], "country": "DE"}),
        );
        let payload = payload_with(&[&address], json!({}));

        let revealed =
            reveal(&payload, SdAlg::Sha256, &[street.clone(), address.clone()]).unwrap();
        assert_eq!(
            Value::Object(revealed.claims),
            json!({"address": {"street_address": "Schulstr. 12", "country": "DE"}})
        );

        let revealed = reveal(&payload, SdAlg::Sha256, &[address.clone()]).unwrap();
        assert_eq!(
            Value::Object(revealed.claims),
            json!({"address": {"country": "DE"}})
        );

        // the inner disclosure cannot be reached without its wrapper
        assert!(matches!(
            reveal(&payload, SdAlg::Sha256, &[street]),
            Err(RevealError::DisclosureNotInPayload(_))
        ));
    }

    #[test]
    fn reject_inconsistent_disclosures() {
        let name = Disclosure::property("salt1", "given_name", json!("John"));
        let item = Disclosure::array_item("salt2", json!("DE"));

        let payload = payload_with(&[&name], json!({}));
        assert!(matches!(
            reveal(&payload, SdAlg::Sha256, &[name.clone(), name.clone()]),
            Err(RevealError::DuplicateDisclosure)
        ));

        let payload = payload_with(&[&name, &name], json!({}));
        assert!(matches!(
            reveal(&payload, SdAlg::Sha256, &[name.clone()]),
            Err(RevealError::DisclosureUsedMultipleTimes)
        ));

        let payload = payload_with(&[&name], json!({"given_name": "Jane"}));
        assert!(matches!(
            reveal(&payload, SdAlg::Sha256, &[name.clone()]),
            Err(RevealError::ClaimCollision(claim)) if claim == "given_name"
        ));

        let payload = payload_with(&[&item], json!({}));
        assert!(matches!(
            reveal(&payload, SdAlg::Sha256, &[item.clone()]),
            Err(RevealError::ExpectedObjectEntryDisclosure)
        ));

        let payload = json!({"list": [{"...": name.digest(SdAlg::Sha256)}]});
        assert!(matches!(
            reveal(payload.as_object().unwrap(), SdAlg::Sha256, &[name.clone()]),
            Err(RevealError::ExpectedArrayItemDisclosure)
        ));

        let payload = json!({"_sd": "abc"});
        assert!(matches!(
            reveal(payload.as_object().unwrap(), SdAlg::Sha256, &[]),
            Err(RevealError::SdClaimNotArray)
        ));
    }
}
