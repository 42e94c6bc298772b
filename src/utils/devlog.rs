//! Developer logging with a custom "level 6" and a thread-local sink for deterministic tests.
//! Collection operations emit one JSON benchmark line each through `dev6!`.

use serde_json::{Map, Value, json};
use std::cell::RefCell;

thread_local! {
    static TL_SINK: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Guard that disables the thread-local sink on drop.
pub struct DevSinkGuard;
impl Drop for DevSinkGuard {
    fn drop(&mut self) {
        TL_SINK.with(|s| *s.borrow_mut() = None);
    }
}

/// Enable the thread-local sink for the current thread.
pub fn enable_thread_sink() -> DevSinkGuard {
    TL_SINK.with(|s| *s.borrow_mut() = Some(Vec::new()));
    DevSinkGuard
}

/// Push a message into the thread-local sink if enabled.
pub fn write_str(msg: &str) {
    TL_SINK.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(msg.to_owned());
        }
    });
}

/// Drain and return the captured messages for the current thread.
pub fn drain() -> Vec<String> {
    TL_SINK.with(|s| s.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Builds a `{"bench":"query","op":..,"collection":..,"duration_ms":..}` line with extra fields.
#[must_use]
pub fn bench_line(op: &str, collection: &str, duration_ms: u64, extra: &[(&str, Value)]) -> String {
    let mut m = Map::new();
    m.insert("bench".into(), json!("query"));
    m.insert("op".into(), json!(op));
    m.insert("collection".into(), json!(collection));
    m.insert("duration_ms".into(), json!(duration_ms));
    for (k, v) in extra {
        m.insert((*k).to_string(), v.clone());
    }
    Value::Object(m).to_string()
}

/// Emit a developer log (level 6) and capture it in the thread-local sink if enabled.
#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        $crate::utils::devlog::write_str(&__s);
        log::log!(target: "nexus_query::dev6", log::Level::Trace, "{}", __s);
    }};
}
