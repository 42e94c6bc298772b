use crate::integration_tests::_support::{seeded, students, users};
use bson::{Bson, doc};
use nexus_query::errors::DbError;
use nexus_query::query::{FindOneAndModifyOptions, parse_find_options};

#[test]
fn youngest_five_users_projected() {
    let db = seeded("users", users());
    let opts = parse_find_options(&doc! {
        "sort": {"age": 1},
        "limit": 5,
        "projection": {"_id": 0, "firstName": 1, "lastName": 1, "age": 1}
    })
    .unwrap();
    let out = db.find("users", &doc! {}, &opts).unwrap().to_vec();
    assert_eq!(
        out,
        vec![
            doc! {"firstName": "Eve", "lastName": "Stone", "age": 19},
            doc! {"firstName": "Ann", "lastName": "Lee", "age": 22},
            doc! {"firstName": "Bob", "lastName": "Ray", "age": 27},
            doc! {"firstName": "Zed", "age": 29},
            doc! {"firstName": "John", "lastName": "Doe", "age": 34},
        ]
    );
}

#[test]
fn users_workflow_end_to_end() {
    let db = seeded("users", users());

    // skills for users aged 25..30 or tagged Engineering
    let report = db
        .update_many(
            "users",
            &doc! {"$or": [{"age": {"$gte": 25, "$lt": 30}}, {"tags": "Engineering"}]},
            &doc! {"$set": {"skills": []}},
        )
        .unwrap();
    assert_eq!((report.matched, report.modified), (3, 3));
    assert_eq!(db.count("users", &doc! {"skills": {"$exists": true}}).unwrap(), 3);

    // push several skills and get the updated document back
    let updated = db
        .find_one_and_update(
            "users",
            &doc! {"skills": {"$exists": true}},
            &doc! {"$push": {"skills": {"$each": ["js", "git"]}}},
            &FindOneAndModifyOptions::return_new(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.get_i32("_id").unwrap(), 1);
    assert_eq!(updated.get_array("skills").unwrap(), &vec![Bson::from("js"), Bson::from("git")]);

    // replace the first CA user whose email starts with "john"
    let before = db
        .find_one_and_replace(
            "users",
            &doc! {"email": {"$regex": "^john"}, "address.state": "CA"},
            &doc! {"firstName": "Jason", "lastName": "Wood", "tags": ["a", "b", "c"], "department": "Support"},
            &FindOneAndModifyOptions::default(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(before.get_str("firstName").unwrap(), "John");
    let jason = db.find_one("users", &doc! {"_id": 1}).unwrap().unwrap();
    assert_eq!(
        jason,
        doc! {"_id": 1, "firstName": "Jason", "lastName": "Wood", "tags": ["a", "b", "c"], "department": "Support"}
    );

    let who = doc! {"firstName": "Jason", "lastName": "Wood"};
    let before = db
        .find_one_and_update("users", &who, &doc! {"$pull": {"tags": "c"}}, &FindOneAndModifyOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(before.get_array("tags").unwrap().len(), 3);
    assert_eq!(
        db.find_one("users", &who).unwrap().unwrap().get_array("tags").unwrap(),
        &vec![Bson::from("a"), Bson::from("b")]
    );

    // conditional add: only when 'b' is absent
    let guarded = doc! {"firstName": "Jason", "lastName": "Wood", "$expr": {"$not": {"$in": ["b", "$tags"]}}};
    let add_b = doc! {"$addToSet": {"tags": "b"}};
    let none = db
        .find_one_and_update("users", &guarded, &add_b, &FindOneAndModifyOptions::default())
        .unwrap();
    assert!(none.is_none());
    db.update_one("users", &who, &doc! {"$pull": {"tags": "b"}}).unwrap();
    let after = db
        .find_one_and_update("users", &guarded, &add_b, &FindOneAndModifyOptions::return_new())
        .unwrap()
        .unwrap();
    assert_eq!(after.get_array("tags").unwrap(), &vec![Bson::from("a"), Bson::from("b")]);

    let deleted = db.delete_many("users", &doc! {"department": "Support"}).unwrap();
    assert_eq!(deleted.deleted, 3);
    assert_eq!(db.count("users", &doc! {}).unwrap(), 3);
}

#[test]
fn articles_bulk_then_tag_maintenance() {
    let db = nexus_query::Database::new(Default::default()).unwrap();
    let report = db
        .bulk_write(
            "articles",
            &[
                doc! {"insertOne": {"document": {"type": "a"}}},
                doc! {"insertOne": {"document": {"type": "b"}}},
                doc! {"insertOne": {"document": {"type": "c"}}},
            ],
        )
        .unwrap();
    assert_eq!(report.inserted_count(), 3);
    assert!(db.list_collection_names().contains(&"articles".to_string()));

    let r = db
        .update_many("articles", &doc! {"type": "a"}, &doc! {"$set": {"tags": ["tag1-a", "tag2-a", "tag3"]}})
        .unwrap();
    assert_eq!(r.matched, 1);
    let r = db
        .update_many(
            "articles",
            &doc! {"type": {"$ne": "a"}},
            &doc! {"$set": {"tags": ["tag2", "tag3", "super"]}},
        )
        .unwrap();
    assert_eq!(r.matched, 2);
    let r = db
        .update_many("articles", &doc! {}, &doc! {"$pull": {"tags": {"$in": ["tag2", "tag1-a"]}}})
        .unwrap();
    assert_eq!((r.matched, r.modified), (3, 3));

    let a = db.find_one("articles", &doc! {"type": "a"}).unwrap().unwrap();
    assert_eq!(a.get_array("tags").unwrap(), &vec![Bson::from("tag2-a"), Bson::from("tag3")]);
    let b = db.find_one("articles", &doc! {"type": "b"}).unwrap().unwrap();
    assert_eq!(b.get_array("tags").unwrap(), &vec![Bson::from("tag3"), Bson::from("super")]);

    let tagged = db
        .find("articles", &doc! {"tags": {"$in": ["super", "tag2-a"]}}, &Default::default())
        .unwrap();
    assert_eq!(tagged.remaining(), 3);
}

#[test]
fn worst_homework_score() {
    let db = seeded("students", students());
    let out = db
        .aggregate(
            "students",
            &[
                doc! {"$unwind": "$scores"},
                doc! {"$match": {"scores.type": "homework"}},
                doc! {"$sort": {"scores.score": 1}},
                doc! {"$group": {"_id": "$_id", "name": {"$first": "$name"}, "worst_homework_score": {"$first": "$scores.score"}}},
                doc! {"$sort": {"worst_homework_score": 1}},
                doc! {"$project": {"_id": 0, "name": 1, "worst_homework_score": 1}},
                doc! {"$limit": 1},
            ],
        )
        .unwrap();
    assert_eq!(out, vec![doc! {"name": "Brook", "worst_homework_score": 40.0}]);
}

#[test]
fn average_homework_score_across_students() {
    let db = seeded("students", students());
    let out = db
        .aggregate(
            "students",
            &[
                doc! {"$unwind": "$scores"},
                doc! {"$match": {"scores.type": "homework"}},
                doc! {"$group": {"_id": "$_id", "avg_score": {"$avg": "$scores.score"}}},
                doc! {"$group": {"_id": null, "avg_score": {"$avg": "$avg_score"}}},
                doc! {"$project": {"_id": 0}},
            ],
        )
        .unwrap();
    assert_eq!(out, vec![doc! {"avg_score": 62.5}]);
}

#[test]
fn average_per_student_sorted_descending() {
    let db = seeded("students", students());
    let out = db
        .aggregate(
            "students",
            &[
                doc! {"$unwind": "$scores"},
                doc! {"$group": {"_id": "$_id", "avg_score": {"$avg": "$scores.score"}}},
                doc! {"$sort": {"avg_score": -1}},
            ],
        )
        .unwrap();
    assert_eq!(
        out,
        vec![
            doc! {"_id": 3, "avg_score": 86.0},
            doc! {"_id": 1, "avg_score": 72.5},
            doc! {"_id": 2, "avg_score": 52.5},
        ]
    );
}

#[test]
fn reads_on_missing_collection_fail() {
    let db = crate::integration_tests::_support::db();
    assert!(matches!(db.find_one("nope", &doc! {}), Err(DbError::NoSuchCollection(_))));
    assert!(matches!(db.aggregate("nope", &[]), Err(DbError::NoSuchCollection(_))));
    assert!(matches!(db.update_many("nope", &doc! {}, &doc! {"$set": {"a": 1}}), Err(DbError::NoSuchCollection(_))));
}

#[test]
fn malformed_inputs_are_rejected_before_running() {
    let db = seeded("users", users());
    assert!(matches!(db.find_one("users", &doc! {"age": {"$near": 1}}), Err(DbError::MalformedFilter(_))));
    assert!(matches!(
        db.update_many("users", &doc! {}, &doc! {"age": 1}),
        Err(DbError::MalformedUpdate(_))
    ));
    assert!(matches!(db.aggregate("users", &[doc! {"$out": "x"}]), Err(DbError::MalformedPipeline(_))));
    assert_eq!(db.count("users", &doc! {"age": 34}).unwrap(), 1);
}

#[test]
fn collection_admin() {
    let db = seeded("users", users());
    db.rename_collection("users", "people").unwrap();
    assert!(db.get_collection("users").is_none());
    assert_eq!(db.count("people", &doc! {}).unwrap(), 6);
    assert!(db.drop_collection("people"));
    assert!(db.list_collection_names().is_empty());
}
