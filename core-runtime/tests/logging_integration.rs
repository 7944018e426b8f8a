//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_query, LogFormat, LoggingConfig,
};

#[test]
fn test_logging_initialization_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    // Only one global subscriber per process; this binary installs it here.
    init_logging(config.clone()).unwrap();
    tracing::info!(target: "core_playback", "installed");

    assert!(init_logging(config).is_err());
}

#[test]
fn test_redaction_of_credentials() {
    assert_eq!(redact_if_sensitive("access_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("refresh_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("Api_Key", "k"), "[REDACTED]");
}

#[test]
fn test_redaction_of_signed_urls() {
    let src = "https://cdn.example.com/course/lesson-3/master.m3u8?Expires=1&Signature=abc";
    let redacted = redact_if_sensitive("src", src);

    assert_eq!(redacted, "https://cdn.example.com/course/lesson-3/master.m3u8");
    assert!(!redacted.contains("Signature"));
}

#[test]
fn test_redaction_passes_plain_values() {
    assert_eq!(redact_if_sensitive("content_id", "master.m3u8"), "master.m3u8");
    assert_eq!(redact_if_sensitive("level", "2"), "2");
    assert_eq!(redact_if_sensitive("state", "GateActive"), "GateActive");
}

#[test]
fn test_strip_query_variants() {
    assert_eq!(strip_query("https://a/b.m3u8?x=1#y"), "https://a/b.m3u8");
    assert_eq!(strip_query("/local/video.mp4#t=30"), "/local/video.mp4");
    assert_eq!(strip_query("video.mp4"), "video.mp4");
    assert_eq!(strip_query("?only=query"), "");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_sensitive);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
