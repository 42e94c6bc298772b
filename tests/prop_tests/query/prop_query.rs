use bson::{Bson, doc};
use nexus_query::query::{CmpOp, Filter, ValueSet, eval_filter, parse_filter};
use proptest::prelude::*;

fn any_bson_number() -> impl Strategy<Value = Bson> {
    prop_oneof![
        any::<i32>().prop_map(Bson::Int32),
        any::<i64>().prop_map(Bson::Int64),
        // finite range, no NaN
        (-1.0e6f64..1.0e6f64).prop_map(Bson::Double),
    ]
}

fn any_scalar() -> impl Strategy<Value = Bson> {
    prop_oneof![
        any_bson_number(),
        "[a-z]{0,6}".prop_map(Bson::String),
        any::<bool>().prop_map(Bson::Boolean),
        Just(Bson::Null),
    ]
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_eq_symmetry(v in any_bson_number(), w in any_bson_number()) {
        let a = eval_filter(&doc! {"x": v.clone()}, &Filter::eq("x", w.clone()));
        let b = eval_filter(&doc! {"x": w}, &Filter::eq("x", v));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_order_consistency(i in -1_000_000i64..1_000_000, j in -1_000_000i64..1_000_000) {
        let d = doc! {"x": i};
        let gt = eval_filter(&d, &Filter::cmp("x", CmpOp::Gt, j));
        let lte = eval_filter(&d, &Filter::cmp("x", CmpOp::Lte, j));
        prop_assert_eq!(gt, !lte);
    }

    // evaluation is a pure function of the document
    #[test]
    fn prop_filter_is_deterministic(vals in proptest::collection::vec(any_scalar(), 0..6), probe in any_scalar()) {
        let d = doc! {"a": vals.clone(), "b": probe.clone()};
        let f = parse_filter(&doc! {"$or": [{"a": probe.clone()}, {"b": {"$in": vals}}]}).unwrap();
        let first = eval_filter(&d, &f);
        for _ in 0..3 {
            prop_assert_eq!(eval_filter(&d, &f), first);
        }
    }

    #[test]
    fn prop_nin_is_not_in(vals in proptest::collection::vec(any_scalar(), 1..6), probe in any_scalar()) {
        let d = doc! {"x": probe};
        let set = ValueSet::from_values(vals);
        let inside = eval_filter(&d, &Filter::In { path: "x".into(), set: set.clone() });
        let outside = eval_filter(&d, &Filter::Nin { path: "x".into(), set });
        prop_assert_eq!(inside, !outside);
    }

    #[test]
    fn prop_array_field_matches_its_members(vals in proptest::collection::vec("[a-z]{1,4}", 1..6), pick in any::<prop::sample::Index>()) {
        let member = pick.get(&vals).clone();
        let d = doc! {"tags": vals.clone()};
        prop_assert!(eval_filter(&d, &Filter::eq("tags", member)));
    }
}
