use crate::integration_tests::_support::{db, seeded};
use bson::doc;
use nexus_query::errors::DbError;

#[test]
fn mixed_batch_reports_every_effect() {
    let db = seeded("c", vec![doc! {"_id": 1, "k": "old"}, doc! {"_id": 2, "k": "old"}]);
    let report = db
        .bulk_write(
            "c",
            &[
                doc! {"insertOne": {"document": {"_id": 3, "k": "new"}}},
                doc! {"updateMany": {"filter": {"k": "old"}, "update": {"$set": {"seen": true}}}},
                doc! {"updateOne": {"filter": {"_id": 3}, "update": {"$set": {"seen": false}}}},
                doc! {"replaceOne": {"filter": {"_id": 2}, "replacement": {"k": "replaced"}}},
                doc! {"deleteOne": {"filter": {"k": "old"}}},
            ],
        )
        .unwrap();
    assert_eq!(report.inserted_count(), 1);
    assert_eq!((report.matched, report.modified, report.deleted), (4, 4, 1));
    let left: Vec<_> = db.find("c", &doc! {}, &Default::default()).unwrap().collect();
    assert_eq!(
        left,
        vec![doc! {"_id": 2, "k": "replaced"}, doc! {"_id": 3, "k": "new", "seen": false}]
    );
}

#[test]
fn failing_operation_rolls_back_the_batch() {
    let db = seeded("c", vec![doc! {"_id": 1, "v": 1}]);
    let err = db
        .bulk_write(
            "c",
            &[
                doc! {"insertOne": {"document": {"_id": 2}}},
                doc! {"deleteMany": {"filter": {}}},
                doc! {"insertOne": {"document": {"_id": 3}}},
                doc! {"insertOne": {"document": {"_id": 3}}},
            ],
        )
        .unwrap_err();
    assert!(matches!(err, DbError::DuplicateKey(_)));
    let docs: Vec<_> = db.find("c", &doc! {}, &Default::default()).unwrap().collect();
    assert_eq!(docs, vec![doc! {"_id": 1, "v": 1}]);
}

#[test]
fn malformed_models_are_rejected_up_front() {
    let db = db();
    for bad in [
        doc! {"insertOne": {"doc": {}}},
        doc! {"updateOne": {"filter": {}}},
        doc! {"upsertOne": {"filter": {}}},
        doc! {"deleteOne": {"filter": {}}, "deleteMany": {"filter": {}}},
        doc! {"updateMany": {"filter": {"a": {"$bogus": 1}}, "update": {"$set": {"a": 1}}}},
        doc! {"replaceOne": {"filter": {"a": 1}, "replacement": {"$inc": {"a": 1}}}},
    ] {
        assert!(db.bulk_write("c", &[bad.clone()]).is_err(), "accepted {bad:?}");
    }
    assert!(db.get_collection("c").is_none());
}
