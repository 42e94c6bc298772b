use super::core::Collection;
use crate::document::{Document, values_equal};
use crate::errors::DbError;
use crate::types::{DocumentId, ID_FIELD};
use bson::Bson;

fn validate_id(id: &Bson) -> Result<(), DbError> {
    match id {
        Bson::Array(_) | Bson::Undefined | Bson::RegularExpression(_) => Err(
            DbError::InvalidDocumentId(format!("{id} cannot be used as {ID_FIELD}")),
        ),
        _ => Ok(()),
    }
}

/// Appends `docs` to `state`. Nothing is appended unless every identifier is valid and unique
/// across both the existing documents and the batch.
pub(crate) fn insert_into(
    state: &mut Vec<Document>,
    docs: Vec<Document>,
) -> Result<Vec<DocumentId>, DbError> {
    let mut ids: Vec<DocumentId> = Vec::with_capacity(docs.len());
    for d in &docs {
        let id = d.id();
        validate_id(id.as_bson())?;
        if ids.contains(&id) || state.iter().any(|e| values_equal(e.id().as_bson(), id.as_bson())) {
            return Err(DbError::DuplicateKey(id.to_string()));
        }
        ids.push(id);
    }
    state.extend(docs);
    Ok(ids)
}

impl Collection {
    /// # Errors
    /// Returns `DuplicateKey` if a document with the same `_id` exists, or
    /// `InvalidDocumentId` for an unusable `_id`.
    pub fn insert_document(&self, document: Document) -> Result<DocumentId, DbError> {
        let mut ids = insert_into(&mut self.write(), vec![document])?;
        ids.pop().ok_or_else(|| DbError::InvalidDocumentId("empty insert".into()))
    }

    /// Inserts all documents or none of them.
    ///
    /// # Errors
    /// See [`Collection::insert_document`].
    pub fn insert_documents(&self, documents: Vec<Document>) -> Result<Vec<DocumentId>, DbError> {
        insert_into(&mut self.write(), documents)
    }

    #[must_use]
    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.read().iter().find(|d| d.id() == *id).cloned()
    }

    pub fn delete_document(&self, id: &DocumentId) -> bool {
        let mut docs = self.write();
        let before = docs.len();
        docs.retain(|d| d.id() != *id);
        docs.len() != before
    }

    /// Snapshot of every document in collection order.
    #[must_use]
    pub fn get_all_documents(&self) -> Vec<Document> {
        self.read().clone()
    }

    /// Return only the IDs of all documents, in collection order.
    #[must_use]
    pub fn list_ids(&self) -> Vec<DocumentId> {
        self.read().iter().map(Document::id).collect()
    }
}
