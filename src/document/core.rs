use crate::document::types::Metadata;
use crate::types::{DocumentId, ID_FIELD};
use bson::{Bson, Document as BsonDocument};

/// A stored document. `data` always carries `_id` as its first field.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub data: BsonDocument,
    pub metadata: Metadata,
}

impl Document {
    /// Wraps `data`, generating an `_id` when the document has none.
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        let id = data.get(ID_FIELD).cloned().unwrap_or_else(|| DocumentId::new().0);
        Self { data: with_id_first(data, id), metadata: Metadata::new() }
    }

    #[must_use]
    pub fn id(&self) -> DocumentId {
        DocumentId(self.data.get(ID_FIELD).cloned().unwrap_or(Bson::Null))
    }

    /// Builds the successor of this document holding `new_data`. The identifier is carried over.
    #[must_use]
    pub fn revise(&self, new_data: BsonDocument) -> Self {
        Self { data: with_id_first(new_data, self.id().0), metadata: self.metadata.next_revision() }
    }

    #[must_use]
    pub fn into_data(self) -> BsonDocument {
        self.data
    }
}

fn with_id_first(data: BsonDocument, id: Bson) -> BsonDocument {
    let mut out = BsonDocument::new();
    out.insert(ID_FIELD, id);
    for (k, v) in data {
        if k != ID_FIELD {
            out.insert(k, v);
        }
    }
    out
}
