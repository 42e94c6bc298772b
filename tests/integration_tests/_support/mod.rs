use bson::{Document as BsonDocument, doc};
use nexus_query::Database;
use nexus_query::config::EngineConfig;

pub fn db() -> Database {
    Database::new(EngineConfig::default()).unwrap()
}

pub fn users() -> Vec<BsonDocument> {
    vec![
        doc! {"_id": 1, "firstName": "John", "lastName": "Doe", "age": 34, "email": "john.doe@example.com",
              "address": {"state": "CA"}, "tags": ["Engineering"], "department": "Engineering"},
        doc! {"_id": 2, "firstName": "Ann", "lastName": "Lee", "age": 22, "email": "ann@example.com",
              "address": {"state": "NY"}, "tags": ["Sales"], "department": "Sales"},
        doc! {"_id": 3, "firstName": "Bob", "lastName": "Ray", "age": 27, "email": "bob@example.com",
              "address": {"state": "CA"}, "tags": ["Support"], "department": "Support"},
        doc! {"_id": 4, "firstName": "Johnny", "lastName": "Cash", "age": 41, "email": "johnny@example.com",
              "address": {"state": "TX"}, "tags": [], "department": "Support"},
        doc! {"_id": 5, "firstName": "Eve", "lastName": "Stone", "age": 19, "email": "eve@example.com",
              "address": {"state": "WA"}, "tags": ["Marketing"], "department": "Marketing"},
        doc! {"_id": 6, "firstName": "Zed", "age": 29, "tags": ["Marketing"]},
    ]
}

pub fn students() -> Vec<BsonDocument> {
    vec![
        doc! {"_id": 1, "name": "Ada", "scores": [
            {"type": "exam", "score": 80.0}, {"type": "quiz", "score": 70.0},
            {"type": "homework", "score": 50.0}, {"type": "homework", "score": 90.0}
        ]},
        doc! {"_id": 2, "name": "Brook", "scores": [
            {"type": "exam", "score": 60.0}, {"type": "quiz", "score": 65.0},
            {"type": "homework", "score": 40.0}, {"type": "homework", "score": 45.0}
        ]},
        doc! {"_id": 3, "name": "Cyd", "scores": [
            {"type": "exam", "score": 95.0}, {"type": "quiz", "score": 88.0},
            {"type": "homework", "score": 75.0}
        ]},
    ]
}

pub fn seeded(collection: &str, docs: Vec<BsonDocument>) -> Database {
    let db = db();
    db.insert_many(collection, docs).unwrap();
    db
}
