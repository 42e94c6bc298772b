use crate::integration_tests::_support::seeded;
use bson::{Bson, doc};
use nexus_query::errors::DbError;
use nexus_query::query::{FindOneAndModifyOptions, ReturnDocument, SortSpec, parse_find_options};

#[test]
fn set_unset_inc_on_nested_paths() {
    let db = seeded("c", vec![doc! {"_id": 1, "a": {"b": 1}, "n": 1, "gone": true}]);
    let r = db
        .update_one(
            "c",
            &doc! {"_id": 1},
            &doc! {"$set": {"a.c": "x", "new.deep": 2}, "$unset": {"gone": ""}, "$inc": {"n": 2.5}},
        )
        .unwrap();
    assert_eq!((r.matched, r.modified), (1, 1));
    let d = db.find_one("c", &doc! {}).unwrap().unwrap();
    assert_eq!(d, doc! {"_id": 1, "a": {"b": 1, "c": "x"}, "n": 3.5, "new": {"deep": 2}});
}

#[test]
fn no_op_updates_match_without_modifying() {
    let db = seeded("c", vec![doc! {"_id": 1, "tags": ["a"]}, doc! {"_id": 2, "tags": ["a", "b"]}]);
    let r = db.update_many("c", &doc! {}, &doc! {"$addToSet": {"tags": "a"}}).unwrap();
    assert_eq!((r.matched, r.modified), (2, 0));
    let r = db.update_many("c", &doc! {"tags": "b"}, &doc! {"$set": {"tags": ["a", "b"]}}).unwrap();
    assert_eq!((r.matched, r.modified), (1, 0));
    let r = db.update_many("c", &doc! {"nope": 1}, &doc! {"$set": {"x": 1}}).unwrap();
    assert_eq!((r.matched, r.modified), (0, 0));
}

#[test]
fn failed_update_many_changes_nothing() {
    let db = seeded("c", vec![doc! {"_id": 1, "v": [1]}, doc! {"_id": 2, "v": "scalar"}, doc! {"_id": 3, "v": [3]}]);
    let err = db.update_many("c", &doc! {}, &doc! {"$push": {"v": 9}}).unwrap_err();
    assert!(matches!(err, DbError::MalformedUpdate(_)));
    let first = db.find_one("c", &doc! {"_id": 1}).unwrap().unwrap();
    assert_eq!(first.get_array("v").unwrap(), &vec![Bson::Int32(1)]);
}

#[test]
fn update_rejects_id_changes_and_conflicts() {
    let db = seeded("c", vec![doc! {"_id": 1, "a": {"b": 1}}]);
    for bad in [
        doc! {"$set": {"_id": 2}},
        doc! {"$set": {"a": 1}, "$unset": {"a.b": ""}},
        doc! {"$inc": {"a.b": "1"}},
        doc! {"$rename": {"a": "b"}},
        doc! {},
    ] {
        assert!(
            matches!(db.update_one("c", &doc! {}, &bad), Err(DbError::MalformedUpdate(_))),
            "accepted {bad:?}"
        );
    }
}

#[test]
fn pull_by_value_and_by_set() {
    let db = seeded("c", vec![doc! {"_id": 1, "n": [1, 2, 2.0, 3, "2"]}]);
    db.update_one("c", &doc! {}, &doc! {"$pull": {"n": 2}}).unwrap();
    let d = db.find_one("c", &doc! {}).unwrap().unwrap();
    assert_eq!(d.get_array("n").unwrap(), &vec![Bson::Int32(1), Bson::Int32(3), Bson::from("2")]);
    db.update_one("c", &doc! {}, &doc! {"$pull": {"n": {"$in": [1, "2"]}}}).unwrap();
    let d = db.find_one("c", &doc! {}).unwrap().unwrap();
    assert_eq!(d.get_array("n").unwrap(), &vec![Bson::Int32(3)]);
}

#[test]
fn find_one_and_update_honors_sort_and_projection() {
    let db = seeded(
        "jobs",
        vec![
            doc! {"_id": 1, "prio": 2, "state": "new"},
            doc! {"_id": 2, "prio": 9, "state": "new"},
            doc! {"_id": 3, "prio": 9, "state": "new"},
        ],
    );
    let opts = FindOneAndModifyOptions {
        sort: vec![SortSpec::desc("prio")],
        projection: parse_find_options(&doc! {"projection": {"state": 1}}).unwrap().projection,
        return_document: ReturnDocument::After,
    };
    let claimed = db
        .find_one_and_update("jobs", &doc! {"state": "new"}, &doc! {"$set": {"state": "taken"}}, &opts)
        .unwrap()
        .unwrap();
    // ties go to the earlier document
    assert_eq!(claimed, doc! {"_id": 2, "state": "taken"});
    assert!(
        db.find_one_and_update("jobs", &doc! {"state": "done"}, &doc! {"$set": {"x": 1}}, &opts)
            .unwrap()
            .is_none()
    );
}

#[test]
fn replace_keeps_id_and_rejects_operators() {
    let db = seeded("c", vec![doc! {"_id": 1, "a": 1}]);
    let opts = FindOneAndModifyOptions { return_document: ReturnDocument::After, ..Default::default() };
    let after = db.find_one_and_replace("c", &doc! {"a": 1}, &doc! {"b": 2}, &opts).unwrap().unwrap();
    assert_eq!(after, doc! {"_id": 1, "b": 2});
    assert!(db.find_one_and_replace("c", &doc! {}, &doc! {"$set": {"b": 3}}, &opts).is_err());
    assert!(db.find_one_and_replace("c", &doc! {}, &doc! {"_id": 5}, &opts).is_err());
    let same = db.find_one_and_replace("c", &doc! {}, &doc! {"_id": 1, "c": 3}, &opts).unwrap().unwrap();
    assert_eq!(same, doc! {"_id": 1, "c": 3});
}

#[test]
fn operator_replacement_fails_even_without_a_match() {
    let db = seeded("c", vec![doc! {"_id": 1, "a": 1}]);
    let err = db
        .find_one_and_replace("c", &doc! {"a": 99}, &doc! {"$set": {"x": 1}}, &FindOneAndModifyOptions::default())
        .unwrap_err();
    assert!(matches!(err, DbError::MalformedUpdate(_)));
    let report = db.bulk_write(
        "c",
        &[doc! {"replaceOne": {"filter": {"a": 99}, "replacement": {"$set": {"x": 1}}}}],
    );
    assert!(matches!(report, Err(DbError::MalformedUpdate(_))));
    assert_eq!(db.find_one("c", &doc! {}).unwrap(), Some(doc! {"_id": 1, "a": 1}));
}

#[test]
fn delete_one_removes_first_match_only() {
    let db = seeded("c", vec![doc! {"_id": 1, "k": "x"}, doc! {"_id": 2, "k": "x"}]);
    assert_eq!(db.delete_one("c", &doc! {"k": "x"}).unwrap().deleted, 1);
    let left = db.find_one("c", &doc! {}).unwrap().unwrap();
    assert_eq!(left.get_i32("_id").unwrap(), 2);
    assert_eq!(db.delete_many("c", &doc! {"k": "y"}).unwrap().deleted, 0);
}
