use crate::integration_tests::_support::db;
use bson::{Bson, doc};
use nexus_query::document::Document;
use nexus_query::errors::DbError;
use nexus_query::types::DocumentId;

#[test]
fn insert_generates_ids_and_keeps_order() {
    let db = db();
    let a = db.insert_one("c", doc! {"n": 1}).unwrap();
    let b = db.insert_one("c", doc! {"_id": "fixed", "n": 2}).unwrap();
    assert!(matches!(a.as_bson(), Bson::String(_)));
    assert_eq!(b, DocumentId::from("fixed"));
    let col = db.get_collection("c").unwrap();
    assert_eq!(col.list_ids(), vec![a, b]);
    let all = col.get_all_documents();
    assert_eq!(all[1].data, doc! {"_id": "fixed", "n": 2});
}

#[test]
fn duplicate_ids_reject_the_whole_batch() {
    let db = db();
    db.insert_one("c", doc! {"_id": 1}).unwrap();
    let err = db.insert_many("c", vec![doc! {"_id": 2}, doc! {"_id": 1_i64}]).unwrap_err();
    assert!(matches!(err, DbError::DuplicateKey(_)));
    assert_eq!(db.count("c", &doc! {}).unwrap(), 1);
    assert!(matches!(db.insert_one("c", doc! {"_id": [1, 2]}), Err(DbError::InvalidDocumentId(_))));
}

#[test]
fn collection_handle_by_id() {
    let db = db();
    let col = db.collection("direct");
    let id = col.insert_document(Document::new(doc! {"_id": 9, "v": true})).unwrap();
    assert_eq!(col.len(), 1);
    assert_eq!(col.find_document(&id).map(|d| d.data), Some(doc! {"_id": 9, "v": true}));
    assert!(col.delete_document(&id));
    assert!(col.is_empty());
    assert!(!col.delete_document(&id));
}

#[test]
fn writes_advance_revision_metadata() {
    let db = db();
    db.insert_one("c", doc! {"_id": 1, "v": 1}).unwrap();
    db.update_one("c", &doc! {"_id": 1}, &doc! {"$inc": {"v": 1}}).unwrap();
    let stored = db.get_collection("c").unwrap().find_document(&DocumentId::from(Bson::Int32(1))).unwrap();
    assert_eq!(stored.metadata.revision, 1);
    assert!(stored.metadata.updated_at >= stored.metadata.created_at);
}

#[test]
fn untouched_documents_keep_their_revision() {
    let db = crate::integration_tests::_support::seeded("users", crate::integration_tests::_support::users());
    db.update_many(
        "users",
        &doc! {"$or": [{"age": {"$gte": 25, "$lt": 30}}, {"tags": "Engineering"}]},
        &doc! {"$set": {"skills": []}},
    )
    .unwrap();
    let col = db.get_collection("users").unwrap();
    let revisions: Vec<(i32, u64)> = col
        .get_all_documents()
        .iter()
        .map(|d| (d.data.get_i32("_id").unwrap(), d.metadata.revision))
        .collect();
    assert_eq!(revisions, vec![(1, 1), (2, 0), (3, 1), (4, 0), (5, 0), (6, 1)]);
}
