use crate::document::values_equal;
use bson::Bson;
use std::fmt;
use uuid::Uuid;

pub type CollectionName = String;

/// Field name holding a document's identifier.
pub const ID_FIELD: &str = "_id";

/// The `_id` value of a document.
///
/// Equality follows value semantics, so `Int32(1)` and `Int64(1)` name the same document.
#[derive(Debug, Clone)]
pub struct DocumentId(pub Bson);

impl DocumentId {
    /// Generates a fresh identifier (UUID v4 rendered as a string).
    #[must_use]
    pub fn new() -> Self {
        Self(Bson::String(Uuid::new_v4().to_string()))
    }

    #[must_use]
    pub const fn as_bson(&self) -> &Bson {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for DocumentId {
    fn eq(&self, other: &Self) -> bool {
        values_equal(&self.0, &other.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Bson::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

impl From<Bson> for DocumentId {
    fn from(v: Bson) -> Self {
        Self(v)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(Bson::String(s.to_string()))
    }
}
