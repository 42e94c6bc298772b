#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(filter) = nexus_query::query::parse_filter_json(s) {
            // a few shapes to exercise array fan-out and nested paths
            let docs = [
                bson::doc! {"a": 1, "b": 2, "name": "x"},
                bson::doc! {"a": 10, "b": -5, "name": "y", "nested": {"z": 3}},
                bson::doc! {"tags": ["x", "y"], "items": [{"k": 1}, {"k": [2, 3]}]},
                bson::doc! {"active": true, "none": null},
            ];
            for d in &docs {
                let _ = nexus_query::query::eval_filter(d, &filter);
            }
        }
    }
});
