use std::{fmt, str::FromStr};

use serde_json::{Map, Value};

use crate::SelectError;

/// Read access to a JSON claim set.
pub trait ClaimAccess {
    /// Value found by following `keys` through nested objects.
    fn value_at(&self, keys: &[&str]) -> Option<&Value>;

    /// String entries of the array under `key`; other entries are skipped.
    fn string_array(&self, key: &str) -> Vec<&str>;
}

impl ClaimAccess for Map<String, Value> {
    fn value_at(&self, keys: &[&str]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        let mut current = self.get(*first)?;
        for key in rest {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    fn string_array(&self, key: &str) -> Vec<&str> {
        match self.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Claim path such as `$.address.street_address`.
///
/// The root `$` is mandatory and is followed by one or more dot separated
/// claim names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimPath(Vec<String>);

impl ClaimPath {
    const ROOT: &'static str = "$";

    /// Parses `$.name.name`, rejecting paths without the `$` root.
    ///
    /// ```
    /// use sd_jwt::{ClaimPath, SelectError};
    ///
    /// let path = ClaimPath::parse("$.address.locality").unwrap();
    /// assert_eq!(path.segments(), ["address", "locality"]);
    /// assert_eq!(path.to_string(), "$.address.locality");
    ///
    /// assert!(matches!(ClaimPath::parse("address"), Err(SelectError::PathNotFromRoot(_))));
    /// assert!(matches!(ClaimPath::parse("$"), Err(SelectError::InvalidPath(_))));
    /// ```
    pub fn parse(path: &str) -> Result<Self, SelectError> {
        let mut segments = path.split('.');

        match segments.next() {
            Some(Self::ROOT) => {}
            Some("") | None => return Err(SelectError::InvalidPath(path.to_owned())),
            Some(_) => return Err(SelectError::PathNotFromRoot(path.to_owned())),
        }

        let segments: Vec<String> = segments.map(ToOwned::to_owned).collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(SelectError::InvalidPath(path.to_owned()));
        }

        Ok(Self(segments))
    }

    /// Path from claim names, without the `$` root.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Claim names, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last claim name, and the names leading to its enclosing object.
    pub fn split_last(&self) -> Option<(&str, &[String])> {
        self.0
            .split_last()
            .map(|(last, parent)| (last.as_str(), parent))
    }
}

impl FromStr for ClaimPath {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ClaimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::ROOT)?;
        for segment in &self.0 {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

/// JSON pointer ([RFC 6901](https://www.rfc-editor.org/rfc/rfc6901)).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JsonPointerBuf(String);

impl JsonPointerBuf {
    pub fn push(&mut self, token: &str) {
        self.0.reserve(token.len() + 1);
        self.0.push('/');
        for c in token.chars() {
            match c {
                '~' => self.0.push_str("~0"),
                '/' => self.0.push_str("~1"),
                _ => self.0.push(c),
            }
        }
    }

    pub fn push_index(&mut self, i: usize) {
        self.0.push('/');
        self.0.push_str(&i.to_string());
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonPointerBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
