//! Shared types for Ebb.
//!
//! Every stored object is addressed by one [`ObjectId`] in both backing
//! stores: the blob store holds its bytes, the metadata store holds a
//! [`Metadata`] hash for the same id.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Metadata field holding the owner token checked on deletion.
pub const OWNER_FIELD: &str = "owner";

// ---------------------------------------------------------------------------
// Object id
// ---------------------------------------------------------------------------

/// Opaque, caller-supplied identifier shared by a blob and its metadata.
///
/// Uniqueness and unguessability are the caller's job. The only checks here
/// keep the id usable as a file name and a store key: it must be non-empty,
/// at most [`ObjectId::MAX_LEN`] bytes, and free of path separators, `..`
/// and control characters.
#[derive(Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Longest accepted id, in bytes.
    pub const MAX_LEN: usize = 255;

    /// Validate and wrap an id.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidObjectId> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidObjectId::Empty);
        }
        if id.len() > Self::MAX_LEN {
            return Err(InvalidObjectId::TooLong(id.len()));
        }
        if id == "." || id == ".." {
            return Err(InvalidObjectId::Reserved(id));
        }
        if let Some(c) = id
            .chars()
            .find(|c| *c == '/' || *c == '\\' || c.is_control())
        {
            return Err(InvalidObjectId::BadChar(c));
        }
        Ok(Self(id))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = InvalidObjectId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ObjectId {
    type Error = InvalidObjectId;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

/// Reasons an id is rejected by [`ObjectId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidObjectId {
    #[error("object id is empty")]
    Empty,

    #[error("object id is {0} bytes, limit is 255")]
    TooLong(usize),

    #[error("object id {0:?} is reserved")]
    Reserved(String),

    #[error("object id contains forbidden character {0:?}")]
    BadChar(char),
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Field name → value mapping stored alongside an object.
///
/// Values are kept exactly as the metadata store returns them: strings.
/// Nothing here guesses a field's logical type. Callers that want a number
/// or a flag decode it explicitly with [`Metadata::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapping holding only the owner token.
    pub fn with_owner(owner: impl Into<String>) -> Self {
        let mut meta = Self::new();
        meta.insert(OWNER_FIELD, owner);
        meta
    }

    /// Set a field, returning the previous value if any.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), value.into())
    }

    /// Builder-style [`Metadata::insert`].
    pub fn field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    /// Raw string value of a field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// The owner token, if the record carries one.
    pub fn owner(&self) -> Option<&str> {
        self.get(OWNER_FIELD)
    }

    /// Decode a field into `T`.
    ///
    /// Returns `Ok(None)` when the field is absent and an error when it is
    /// present but does not parse.
    pub fn parse<T>(&self, field: &str) -> Result<Option<T>, FieldParseError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.0.get(field) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| FieldParseError {
                field: field.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for Metadata {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Metadata {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A metadata field held a value that does not decode as the requested type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field {field:?} = {value:?}: {reason}")]
pub struct FieldParseError {
    pub field: String,
    pub value: String,
    pub reason: String,
}
