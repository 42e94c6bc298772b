#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(pipeline) = nexus_query::pipeline::parse_pipeline_json(s) {
            let docs = vec![
                bson::doc! {"_id": 1, "name": "a", "scores": [{"type": "homework", "score": 5.0}]},
                bson::doc! {"_id": 2, "name": "b", "scores": []},
                bson::doc! {"_id": 3},
            ];
            let _ = nexus_query::pipeline::run_pipeline(docs, &pipeline);
        }
    }
});
