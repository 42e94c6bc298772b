use bson::{Bson, Document as BsonDocument, doc};
use nexus_query::document::{get_path, values_equal};
use nexus_query::query::{apply_update, parse_update};
use proptest::prelude::*;

fn apply(d: &BsonDocument, u: BsonDocument) -> (BsonDocument, bool) {
    apply_update(d, &parse_update(&u).unwrap()).unwrap()
}

fn small_values() -> impl Strategy<Value = Bson> {
    prop_oneof![
        (-50i32..50).prop_map(Bson::Int32),
        "[a-c]{1,2}".prop_map(Bson::String),
    ]
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_set_then_get(path in "[a-d](\\.[a-d]){0,3}", v in small_values()) {
        let mut fields = BsonDocument::new();
        fields.insert(path.clone(), v.clone());
        let (out, _) = apply(&doc! {"_id": 1}, doc! {"$set": fields});
        prop_assert_eq!(get_path(&out, &path), Some(&v));
        prop_assert_eq!(out.get("_id"), Some(&Bson::Int32(1)));
    }

    #[test]
    fn prop_add_to_set_is_idempotent(start in proptest::collection::vec(small_values(), 0..6), v in small_values()) {
        let d = doc! {"s": start};
        let (once, _) = apply(&d, doc! {"$addToSet": {"s": v.clone()}});
        let (twice, changed) = apply(&once, doc! {"$addToSet": {"s": v}});
        prop_assert!(!changed);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_pull_then_add_leaves_one_copy(start in proptest::collection::vec(small_values(), 0..8), v in small_values()) {
        let d = doc! {"s": start};
        let (pulled, _) = apply(&d, doc! {"$pull": {"s": v.clone()}});
        let Some(Bson::Array(items)) = pulled.get("s") else { panic!("lost array") };
        prop_assert!(!items.iter().any(|x| values_equal(x, &v)));
        let (added, _) = apply(&pulled, doc! {"$addToSet": {"s": v.clone()}});
        let Some(Bson::Array(items)) = added.get("s") else { panic!("lost array") };
        prop_assert_eq!(items.iter().filter(|x| values_equal(x, &v)).count(), 1);
        prop_assert_eq!(items.last(), Some(&v));
    }

    #[test]
    fn prop_inc_sums_integers(a in -1_000i32..1_000, b in -1_000i32..1_000) {
        let (out, _) = apply(&doc! {"n": a}, doc! {"$inc": {"n": b}});
        prop_assert_eq!(out.get("n"), Some(&Bson::Int32(a + b)));
    }
}
