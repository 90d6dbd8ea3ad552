//! Holder side selection of the disclosures to present.
use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::{
    digest, ClaimAccess, ClaimPath, Disclosure, SdAlg, SelectError,
    ARRAY_CLAIM_ITEM_PROPERTY_NAME, SD_CLAIM_NAME,
};

/// Selects the disclosures revealing the claims at `paths`.
///
/// Paths use the `$.name.name` syntax. A path crossing a recursively
/// disclosed object also selects that object's disclosure, and the last
/// claim of a path is revealed with everything nested under it. The result
/// keeps the order of `disclosures`, without duplicates.
///
/// A path naming no claim selects nothing.
pub fn select_disclosures<'a, D, P>(
    payload: &Map<String, Value>,
    disclosures: &'a [D],
    paths: &[P],
) -> Result<Vec<&'a D>, SelectError>
where
    D: AsRef<str>,
    P: AsRef<str>,
{
    let paths = paths
        .iter()
        .map(|path| ClaimPath::parse(path.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let decoded = disclosures
        .iter()
        .map(|token| {
            let token = token.as_ref();
            Disclosure::decode(token)
                .map_err(|_| SelectError::DisclosureNotDecodable(token.to_owned()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let index = match decoded.first() {
        Some(first) => {
            let sd_alg = digest::sd_alg(payload)
                .map_err(|_| SelectError::DisclosureNotDigestable(first.as_str().to_owned()))?;
            DigestIndex::new(&decoded, sd_alg)
        }
        None => DigestIndex::default(),
    };

    let mut selected = BTreeSet::new();
    for path in &paths {
        if !index.select_path(payload, path, &mut selected) {
            log::debug!("no claim at {path}");
        }
    }

    Ok(selected.into_iter().map(|i| &disclosures[i]).collect())
}

/// Decoded disclosures by digest.
#[derive(Default)]
struct DigestIndex<'a> {
    by_digest: HashMap<String, (usize, &'a Disclosure)>,
}

impl<'a> DigestIndex<'a> {
    fn new(disclosures: &'a [Disclosure], sd_alg: SdAlg) -> Self {
        Self {
            by_digest: disclosures
                .iter()
                .enumerate()
                .map(|(i, disclosure)| (disclosure.digest(sd_alg), (i, disclosure)))
                .collect(),
        }
    }

    /// Finds the member `name` of `object`, plain or concealed.
    fn member<'v>(
        &self,
        object: &'v Map<String, Value>,
        name: &str,
        selected: &mut BTreeSet<usize>,
    ) -> Option<&'v Value>
    where
        'a: 'v,
    {
        if let Some(value) = object.get(name) {
            return Some(value);
        }

        object
            .string_array(SD_CLAIM_NAME)
            .into_iter()
            .filter_map(|digest| self.by_digest.get(digest))
            .find(|(_, disclosure)| disclosure.claim_name() == Some(name))
            .map(|(i, disclosure)| {
                selected.insert(*i);
                disclosure.value()
            })
    }

    fn select_path(
        &self,
        payload: &Map<String, Value>,
        path: &ClaimPath,
        selected: &mut BTreeSet<usize>,
    ) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };

        // Disclosures crossed on the way are only kept if the path resolves.
        let mut crossed = BTreeSet::new();
        let mut current = payload;
        for name in parents {
            match self
                .member(current, name, &mut crossed)
                .and_then(Value::as_object)
            {
                Some(object) => current = object,
                None => return false,
            }
        }

        match self.member(current, last, &mut crossed) {
            Some(value) => {
                self.select_nested(value, &mut crossed);
                selected.append(&mut crossed);
                true
            }
            None => false,
        }
    }

    /// Selects every disclosure reachable from `value`.
    fn select_nested(&self, value: &Value, selected: &mut BTreeSet<usize>) {
        match value {
            Value::Object(object) => {
                for digest in object.string_array(SD_CLAIM_NAME) {
                    self.select_digest(digest, selected);
                }
                for (key, value) in object {
                    if key != SD_CLAIM_NAME {
                        self.select_nested(value, selected);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    match concealed_array_item(item) {
                        Some(digest) => self.select_digest(digest, selected),
                        None => self.select_nested(item, selected),
                    }
                }
            }
            _ => {}
        }
    }

    fn select_digest(&self, digest: &str, selected: &mut BTreeSet<usize>) {
        if let Some((i, disclosure)) = self.by_digest.get(digest) {
            if selected.insert(*i) {
                self.select_nested(disclosure.value(), selected);
            }
        }
    }
}

pub(crate) fn concealed_array_item(item: &Value) -> Option<&str> {
    let object = item.as_object()?;

    if object.len() != 1 {
        return None;
    }

    object.get(ARRAY_CLAIM_ITEM_PROPERTY_NAME)?.as_str()
}
