//! Claim tree: which claims of a credential are selectively disclosable.
//!
//! A tree is assembled with [`SdObjectBuilder`], which keeps claims in
//! declaration order and rejects duplicate or reserved names, and is then
//! compiled by [`SdJwtFactory`](crate::SdJwtFactory).
//!
//! ```
//! use sd_jwt::SdObjectBuilder;
//! use serde_json::json;
//!
//! let claims = SdObjectBuilder::new()
//!     .plain("iss", "https://example.com/issuer")
//!     .flat("given_name", "John")
//!     .object("address", |address| {
//!         address
//!             .flat("street_address", "Schulstr. 12")
//!             .plain("country", "DE")
//!     })
//!     .recursive_array("nationalities", |nationalities| nationalities.flat("DE").plain("GR"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(claims.expected_digests(), 4);
//! assert_eq!(claims.to_plain_json()["address"], json!({
//!     "street_address": "Schulstr. 12",
//!     "country": "DE"
//! }));
//! ```
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{EncodeError, ARRAY_CLAIM_ITEM_PROPERTY_NAME, SD_ALG_CLAIM_NAME, SD_CLAIM_NAME};

/// Node of a claim tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SdElement {
    /// Always visible.
    Plain(Value),

    /// Hidden behind a single disclosure.
    Flat(Value),

    /// Visible object whose members carry their own policy.
    Object(SdObject),

    /// Visible array whose elements carry their own policy.
    Array(Vec<SdElement>),

    /// Object processed like [`SdElement::Object`] and then hidden as a
    /// whole behind one more disclosure.
    RecursiveObject(SdObject),

    /// Array processed like [`SdElement::Array`] and then hidden as a
    /// whole behind one more disclosure.
    RecursiveArray(Vec<SdElement>),
}

impl SdElement {
    /// JSON value of this node with every disclosure revealed.
    pub fn to_plain_json(&self) -> Value {
        match self {
            Self::Plain(value) | Self::Flat(value) => value.clone(),
            Self::Object(object) | Self::RecursiveObject(object) => {
                Value::Object(object.to_plain_json())
            }
            Self::Array(items) | Self::RecursiveArray(items) => {
                Value::Array(items.iter().map(Self::to_plain_json).collect())
            }
        }
    }

    /// Number of disclosures compiling this node produces.
    pub fn expected_digests(&self) -> usize {
        match self {
            Self::Plain(_) => 0,
            Self::Flat(_) => 1,
            Self::Object(object) => object.expected_digests(),
            Self::Array(items) => items.iter().map(Self::expected_digests).sum(),
            Self::RecursiveObject(object) => 1 + object.expected_digests(),
            Self::RecursiveArray(items) => 1 + items.iter().map(Self::expected_digests).sum::<usize>(),
        }
    }
}

/// Ordered set of named claims with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SdObject(IndexMap<String, SdElement>);

impl SdObject {
    /// Starts an empty [`SdObjectBuilder`].
    pub fn builder() -> SdObjectBuilder {
        SdObjectBuilder::new()
    }

    /// Claim named `name`.
    pub fn get(&self, name: &str) -> Option<&SdElement> {
        self.0.get(name)
    }

    /// Claims in declaration order.
    pub fn iter(&self) -> indexmap::map::Iter<String, SdElement> {
        self.0.iter()
    }

    /// Number of claims at this level.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object of these claims with every disclosure revealed.
    pub fn to_plain_json(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(name, element)| (name.clone(), element.to_plain_json()))
            .collect()
    }

    /// Number of disclosures compiling this object produces.
    pub fn expected_digests(&self) -> usize {
        self.0.values().map(SdElement::expected_digests).sum()
    }
}

impl<'a> IntoIterator for &'a SdObject {
    type Item = (&'a String, &'a SdElement);
    type IntoIter = indexmap::map::Iter<'a, String, SdElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        SD_CLAIM_NAME | SD_ALG_CLAIM_NAME | ARRAY_CLAIM_ITEM_PROPERTY_NAME
    )
}

/// Accumulates the claims of one object level.
///
/// The first contract violation is kept and returned by
/// [`build`](Self::build); later calls are ignored.
#[derive(Debug, Default)]
pub struct SdObjectBuilder {
    claims: IndexMap<String, SdElement>,
    error: Option<EncodeError>,
}

impl SdObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, name: impl Into<String>, element: SdElement) -> Self {
        if self.error.is_some() {
            return self;
        }

        let name = name.into();
        if is_reserved(&name) {
            self.error = Some(EncodeError::ReservedClaimName(name));
        } else if self.claims.contains_key(&name) {
            self.error = Some(EncodeError::DuplicateClaim(name));
        } else {
            self.claims.insert(name, element);
        }

        self
    }

    pub fn plain(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.element(name, SdElement::Plain(value.into()))
    }

    pub fn flat(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.element(name, SdElement::Flat(value.into()))
    }

    pub fn object(
        self,
        name: impl Into<String>,
        f: impl FnOnce(SdObjectBuilder) -> SdObjectBuilder,
    ) -> Self {
        self.nested(name, f, SdElement::Object)
    }

    pub fn recursive_object(
        self,
        name: impl Into<String>,
        f: impl FnOnce(SdObjectBuilder) -> SdObjectBuilder,
    ) -> Self {
        self.nested(name, f, SdElement::RecursiveObject)
    }

    pub fn array(
        self,
        name: impl Into<String>,
        f: impl FnOnce(SdArrayBuilder) -> SdArrayBuilder,
    ) -> Self {
        self.nested_array(name, f, SdElement::Array)
    }

    pub fn recursive_array(
        self,
        name: impl Into<String>,
        f: impl FnOnce(SdArrayBuilder) -> SdArrayBuilder,
    ) -> Self {
        self.nested_array(name, f, SdElement::RecursiveArray)
    }

    fn nested(
        mut self,
        name: impl Into<String>,
        f: impl FnOnce(SdObjectBuilder) -> SdObjectBuilder,
        wrap: fn(SdObject) -> SdElement,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }

        match f(SdObjectBuilder::new()).build() {
            Ok(object) => self.element(name, wrap(object)),
            Err(e) => {
                self.error = Some(e);
                self
            }
        }
    }

    fn nested_array(
        mut self,
        name: impl Into<String>,
        f: impl FnOnce(SdArrayBuilder) -> SdArrayBuilder,
        wrap: fn(Vec<SdElement>) -> SdElement,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }

        match f(SdArrayBuilder::new()).build() {
            Ok(items) => self.element(name, wrap(items)),
            Err(e) => {
                self.error = Some(e);
                self
            }
        }
    }

    pub fn build(self) -> Result<SdObject, EncodeError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(SdObject(self.claims)),
        }
    }
}

/// Accumulates the elements of one array level.
#[derive(Debug, Default)]
pub struct SdArrayBuilder {
    items: Vec<SdElement>,
    error: Option<EncodeError>,
}

impl SdArrayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, element: SdElement) -> Self {
        if self.error.is_none() {
            self.items.push(element);
        }
        self
    }

    pub fn plain(self, value: impl Into<Value>) -> Self {
        self.element(SdElement::Plain(value.into()))
    }

    pub fn flat(self, value: impl Into<Value>) -> Self {
        self.element(SdElement::Flat(value.into()))
    }

    pub fn object(self, f: impl FnOnce(SdObjectBuilder) -> SdObjectBuilder) -> Self {
        self.nested(f, SdElement::Object)
    }

    pub fn recursive_object(self, f: impl FnOnce(SdObjectBuilder) -> SdObjectBuilder) -> Self {
        self.nested(f, SdElement::RecursiveObject)
    }

    pub fn array(self, f: impl FnOnce(SdArrayBuilder) -> SdArrayBuilder) -> Self {
        self.nested_array(f, SdElement::Array)
    }

    pub fn recursive_array(self, f: impl FnOnce(SdArrayBuilder) -> SdArrayBuilder) -> Self {
        self.nested_array(f, SdElement::RecursiveArray)
    }

    fn nested(
        mut self,
        f: impl FnOnce(SdObjectBuilder) -> SdObjectBuilder,
        wrap: fn(SdObject) -> SdElement,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }

        match f(SdObjectBuilder::new()).build() {
            Ok(object) => self.element(wrap(object)),
            Err(e) => {
                self.error = Some(e);
                self
            }
        }
    }

    fn nested_array(
        mut self,
        f: impl FnOnce(SdArrayBuilder) -> SdArrayBuilder,
        wrap: fn(Vec<SdElement>) -> SdElement,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }

        match f(SdArrayBuilder::new()).build() {
            Ok(items) => self.element(wrap(items)),
            Err(e) => {
                self.error = Some(e);
                self
            }
        }
    }

    pub fn build(self) -> Result<Vec<SdElement>, EncodeError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain_claims() -> SdObjectBuilder {
        SdObjectBuilder::new()
            .plain("string", "name")
            .plain("number", 36524)
            .plain("bool", true)
            .plain("array", json!(["GR", "DE"]))
    }

    #[test]
    fn declaration_order_is_kept() {
        let object = plain_claims().build().unwrap();
        let names: Vec<&str> = object.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["string", "number", "bool", "array"]);
        assert_eq!(
            Value::Object(object.to_plain_json()),
            json!({"string": "name", "number": 36524, "bool": true, "array": ["GR", "DE"]})
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = SdObjectBuilder::new()
            .plain("name", "a")
            .flat("name", "b")
            .build();
        assert!(matches!(result, Err(EncodeError::DuplicateClaim(name)) if name == "name"));
    }

    #[test]
    fn nested_errors_propagate() {
        let result = SdObjectBuilder::new()
            .object("address", |address| {
                address.flat("locality", "a").plain("locality", "b")
            })
            .plain("country", "DE")
            .build();
        assert!(matches!(result, Err(EncodeError::DuplicateClaim(name)) if name == "locality"));

        let result = SdObjectBuilder::new()
            .array("list", |list| list.object(|o| o.plain("_sd", json!([]))))
            .build();
        assert!(matches!(result, Err(EncodeError::ReservedClaimName(name)) if name == "_sd"));
    }

    #[test]
    fn reserved_names_are_rejected() {
        for name in ["_sd", "_sd_alg", "..."] {
            assert!(matches!(
                SdObjectBuilder::new().flat(name, 1).build(),
                Err(EncodeError::ReservedClaimName(_))
            ));
        }
    }

    #[test]
    fn expected_digests() {
        assert_eq!(plain_claims().build().unwrap().expected_digests(), 0);

        let address = SdObjectBuilder::new()
            .object("address", |address| {
                address
                    .flat("street_address", "Schulstr. 12")
                    .flat("locality", "Schulpforta")
                    .flat("region", "Sachsen-Anhalt")
                    .plain("country", "DE")
                    .recursive_object("deep object embedded", |deep| {
                        deep.plain("deep", "deep value")
                            .flat("deep_disclosed", "deep disclosed claim")
                    })
            })
            .build()
            .unwrap();
        assert_eq!(address.expected_digests(), 5);

        let nested = SdObjectBuilder::new()
            .array("array", |array| {
                array
                    .array(|inner| {
                        inner.plain(1).flat(2).recursive_object(|o| {
                            o.flat("nested object in array key", "nested object in array value")
                        })
                    })
                    .plain("other value")
            })
            .build()
            .unwrap();
        assert_eq!(nested.expected_digests(), 3);
        assert_eq!(
            nested.get("array").map(SdElement::to_plain_json),
            Some(json!([
                [1, 2, {"nested object in array key": "nested object in array value"}],
                "other value"
            ]))
        );
    }
}
