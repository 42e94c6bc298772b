#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(update) = nexus_query::query::parse_update_json(s) {
            let docs = [
                bson::doc! {"_id": 1, "tags": ["a", "b"], "n": 1},
                bson::doc! {"_id": 2, "nested": {"xs": [1, 2.5, "3"]}, "s": "text"},
            ];
            for d in &docs {
                let _ = nexus_query::query::apply_update(d, &update);
            }
        }
    }
});
