use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped every time an operation replaces the document.
    pub revision: u64,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self { created_at: now, updated_at: now, revision: 0 }
    }

    #[must_use]
    pub fn next_revision(&self) -> Self {
        Self { created_at: self.created_at, updated_at: Utc::now(), revision: self.revision + 1 }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}
