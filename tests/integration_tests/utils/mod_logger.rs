use nexus_query::Database;
use nexus_query::config::{EngineConfig, LogConfig};
use nexus_query::utils::logger;
use tempfile::tempdir;

#[test]
fn configure_logging_creates_category_files() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("logs");
    logger::configure_logging(Some(&base), Some("debug"), Some(3), true).unwrap();
    log::info!("hello app");
    log::info!(target: logger::AUDIT_TARGET, "audit event");
    log::info!(target: logger::METRICS_TARGET, "metric event");
    for stem in ["app", "audit", "metrics", "dev6"] {
        assert!(base.join(format!("{stem}.log")).exists(), "{stem}.log missing");
    }
}

#[test]
fn engine_installs_logging_from_config() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("engine_logs");
    let cfg = EngineConfig {
        logging: LogConfig { enabled: true, dir: Some(base.clone()), level: Some("info".into()), retention: Some(2), dev6: false },
        ..EngineConfig::default()
    };
    Database::new(cfg).unwrap();
    assert!(base.join("app.log").exists());
    assert!(!base.join("dev6.log").exists());
}
