//! Process-wide query telemetry: counters, slow-query detection and the audit trail.

use crate::config::TelemetryConfig;
use crate::utils::logger::{AUDIT_TARGET, METRICS_TARGET};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    pub queries_total: AtomicU64,
    pub queries_slow_total: AtomicU64,
    pub writes_total: AtomicU64,
    pub audits_total: AtomicU64,
    pub errors_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub queries_slow_total: u64,
    pub writes_total: u64,
    pub audits_total: u64,
    pub errors_total: u64,
}

#[derive(Default)]
pub struct Telemetry {
    pub cfg: RwLock<TelemetryConfig>,
    pub metrics: Metrics,
    // For tests we can capture audit lines in-memory
    audit_sink: RwLock<Option<Arc<RwLock<Vec<String>>>>>,
}

pub(crate) static TELEMETRY: std::sync::LazyLock<Telemetry> =
    std::sync::LazyLock::new(Telemetry::default);

pub fn configure(cfg: &TelemetryConfig) {
    *TELEMETRY.cfg.write() = cfg.clone();
}

pub fn set_slow_query_ms(ms: u64) {
    TELEMETRY.cfg.write().slow_query_ms = ms;
}

pub fn set_audit_enabled(enabled: bool) {
    TELEMETRY.cfg.write().enable_audit = enabled;
}

pub fn set_audit_sink_for_tests(sink: Arc<RwLock<Vec<String>>>) {
    *TELEMETRY.audit_sink.write() = Some(sink);
}

fn write_line(path: &Path, line: &str) {
    use std::io::Write;
    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut f) => {
            if let Err(e) = writeln!(f, "{line}") {
                log::warn!("query log write to {} failed: {e}", path.display());
            }
        }
        Err(e) => log::warn!("query log open {} failed: {e}", path.display()),
    }
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Records a completed read (find/count/aggregate).
pub fn log_query(collection: &str, op: &str, duration_ms: u64, result_count: usize) {
    TELEMETRY.metrics.queries_total.fetch_add(1, Ordering::Relaxed);
    let cfg = TELEMETRY.cfg.read().clone();
    let slow = duration_ms >= cfg.slow_query_ms;
    if slow {
        TELEMETRY.metrics.queries_slow_total.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            "slow query: collection={collection} op={op} duration_ms={duration_ms} threshold_ms={}",
            cfg.slow_query_ms
        );
    }
    log::info!(
        target: METRICS_TARGET,
        "query collection={collection} op={op} duration_ms={duration_ms} results={result_count}"
    );
    if let Some(path) = cfg.query_log_path.as_ref() {
        let line = serde_json::json!({
            "ts": now_ts(),
            "collection": collection,
            "op": op,
            "duration_ms": duration_ms,
            "result_count": result_count,
            "slow": slow
        })
        .to_string();
        write_line(path, &line);
    }
}

/// Records a committed write and, when auditing is on, an audit line per affected document.
pub fn log_write(op: &str, collection: &str, doc_ids: &[String]) {
    TELEMETRY.metrics.writes_total.fetch_add(1, Ordering::Relaxed);
    for id in doc_ids {
        log_audit(op, collection, id);
    }
}

pub fn log_audit(op: &str, collection: &str, doc_id: &str) {
    let cfg = TELEMETRY.cfg.read().clone();
    if !cfg.enable_audit {
        return;
    }
    TELEMETRY.metrics.audits_total.fetch_add(1, Ordering::Relaxed);
    let line = serde_json::json!({
        "ts": now_ts(), "op": op, "collection": collection, "doc_id": doc_id
    })
    .to_string();
    log::info!(target: AUDIT_TARGET, "{line}");
    let audit_clone = TELEMETRY.audit_sink.read().clone();
    if let Some(sink) = audit_clone {
        sink.write().push(line.clone());
    }
    if let Some(path) = cfg.query_log_path.as_ref() {
        write_line(path, &line);
    }
}

/// Counts an operation rejected by validation.
pub fn log_error(collection: &str, op: &str, err: &crate::errors::DbError) {
    TELEMETRY.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
    log::debug!("{op} on {collection} rejected: {err}");
}

#[must_use]
pub fn snapshot() -> MetricsSnapshot {
    let m = &TELEMETRY.metrics;
    MetricsSnapshot {
        queries_total: m.queries_total.load(Ordering::Relaxed),
        queries_slow_total: m.queries_slow_total.load(Ordering::Relaxed),
        writes_total: m.writes_total.load(Ordering::Relaxed),
        audits_total: m.audits_total.load(Ordering::Relaxed),
        errors_total: m.errors_total.load(Ordering::Relaxed),
    }
}

#[must_use]
pub fn metrics_text() -> String {
    // OpenMetrics/Prometheus exposition format (no types/HELP for brevity)
    let s = snapshot();
    format!(
        "nexus_queries_total {}\n\
         nexus_queries_slow_total {}\n\
         nexus_writes_total {}\n\
         nexus_audits_total {}\n\
         nexus_errors_total {}\n",
        s.queries_total, s.queries_slow_total, s.writes_total, s.audits_total, s.errors_total,
    )
}
