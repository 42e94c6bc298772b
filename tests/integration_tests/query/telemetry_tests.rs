use crate::integration_tests::_support::seeded;
use bson::doc;
use nexus_query::query::telemetry;
use nexus_query::utils::devlog;

#[test]
fn operations_feed_counters() {
    let db = seeded("tele", vec![doc! {"_id": 1}]);
    let before = telemetry::snapshot();
    db.count("tele", &doc! {}).unwrap();
    db.update_one("tele", &doc! {}, &doc! {"$set": {"x": 1}}).unwrap();
    let _ = db.update_one("tele", &doc! {}, &doc! {"$push": {"x": 2}});
    let after = telemetry::snapshot();
    assert!(after.queries_total > before.queries_total);
    assert!(after.writes_total > before.writes_total);
    assert!(after.errors_total > before.errors_total);
    assert!(telemetry::metrics_text().contains("nexus_queries_total"));
}

#[test]
fn each_operation_emits_one_bench_line() {
    let db = seeded("bench", vec![doc! {"_id": 1, "n": 1}, doc! {"_id": 2, "n": 2}]);
    let _guard = devlog::enable_thread_sink();
    db.find("bench", &doc! {"n": {"$gt": 1}}, &Default::default()).unwrap();
    db.aggregate("bench", &[doc! {"$count": "n"}]).unwrap();
    let lines = devlog::drain();
    assert_eq!(lines.len(), 2);
    let find: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(find["op"], "find");
    assert_eq!(find["collection"], "bench");
    assert_eq!(find["result_count"], 1);
    let agg: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(agg["op"], "aggregate");
    assert_eq!(agg["stages"], 1);
}
