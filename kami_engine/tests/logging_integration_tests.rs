//! Integration tests for Engine logging system
//!
//! These tests verify the logging system through the public API.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use kami_engine::kami::Engine;
use kami_engine::kami::Error;
use kami_engine::kami::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        // Only keep entries emitted by this test file
        if entry.source.starts_with("test::") {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

fn install() -> Arc<Mutex<Vec<LogEntry>>> {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);
    entries
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let entries = install();

    Engine::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Engine::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());
    Engine::log(LogSeverity::Error, "test::module", "Test error message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 3);
        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[0].message, "Test info message");
        assert_eq!(captured[1].severity, LogSeverity::Warn);
        assert_eq!(captured[2].severity, LogSeverity::Error);
        assert!(captured.iter().all(|e| e.source == "test::module"));
        assert!(captured.iter().all(|e| e.file.is_none()));
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_log_detailed_carries_location() {
    let entries = install();

    Engine::log_detailed(
        LogSeverity::Error,
        "test::detailed",
        "Detailed error".to_string(),
        "some_file.rs",
        42,
    );

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].file, Some("some_file.rs"));
        assert_eq!(captured[0].line, Some(42));
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_macros() {
    let entries = install();

    kami_engine::engine_trace!("test::macros", "trace {}", 1);
    kami_engine::engine_debug!("test::macros", "debug {}", 2);
    kami_engine::engine_info!("test::macros", "info {}", 3);
    kami_engine::engine_warn!("test::macros", "warn {}", 4);
    kami_engine::engine_error!("test::macros", "error {}", 5);

    {
        let captured = entries.lock().unwrap();
        let severities: Vec<LogSeverity> = captured.iter().map(|e| e.severity).collect();
        assert_eq!(
            severities,
            vec![
                LogSeverity::Trace,
                LogSeverity::Debug,
                LogSeverity::Info,
                LogSeverity::Warn,
                LogSeverity::Error,
            ]
        );
        assert_eq!(captured[4].message, "error 5");
        assert!(captured[4].file.is_some());
        assert!(captured[3].file.is_none());
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_engine_err_logs_and_builds_error() {
    let entries = install();

    let err = kami_engine::engine_err!("test::err", "Failed to reset fence: {}", "DEVICE_LOST");

    assert!(matches!(&err, Error::BackendError(msg) if msg == "Failed to reset fence: DEVICE_LOST"));
    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].severity, LogSeverity::Error);
        assert_eq!(captured[0].message, "Failed to reset fence: DEVICE_LOST");
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_reset_logger_stops_capture() {
    let entries = install();
    Engine::reset_logger();

    Engine::log(LogSeverity::Info, "test::reset", "After reset".to_string());

    assert!(entries.lock().unwrap().is_empty());
}

#[test]
fn test_integration_default_logger_format() {
    let entry = LogEntry {
        severity: LogSeverity::Warn,
        timestamp: SystemTime::now(),
        source: "kami::Renderer".to_string(),
        message: "Render pass invalidated".to_string(),
        file: None,
        line: None,
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[WARN ] [kami::Renderer] Render pass invalidated"));
    assert!(!line.contains("("));
}
