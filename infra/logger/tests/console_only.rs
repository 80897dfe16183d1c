use depot_logger::{LogConfig, Logger};

#[test]
fn default_config_logs_to_console_only() {
    let logger = Logger::from_config("depot-console", &LogConfig::default()).expect("logger should initialize");

    assert!(logger.guard().is_none(), "console-only logger should not create a file guard");
    tracing::info!(target: "depot", "console only");
}
