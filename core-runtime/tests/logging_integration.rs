//! Integration tests for logging system

use bridge_traits::logging::LogLevel;
use core_runtime::logging::{redact_if_sensitive, redact_url, LogFormat, LoggingConfig};

#[test]
fn test_logging_initialization() {
    // Logging can only be initialized once per process, so only the builder is exercised here

    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.enable_spans);
}

#[test]
fn test_redaction_tokens() {
    assert_eq!(redact_if_sensitive("access_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("cdn_signature", "sig"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), "[REDACTED]");
}

#[test]
fn test_redaction_normal_values() {
    assert_eq!(redact_if_sensitive("stream_id", "live-42"), "live-42");
    assert_eq!(redact_if_sensitive("slot", "2"), "2");
}

#[test]
fn test_url_redaction() {
    assert_eq!(
        redact_url("https://edge.example.net/hls/live-42/index.m3u8?token=abc&expires=99"),
        "https://edge.example.net/hls/live-42/index.m3u8?[REDACTED]"
    );

    // No query string, nothing to hide
    assert_eq!(
        redact_url("https://edge.example.net/hls/live-42/index.m3u8"),
        "https://edge.example.net/hls/live-42/index.m3u8"
    );
    assert_eq!(redact_url(""), "");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[cfg(not(debug_assertions))]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
    }
}

#[test]
fn test_filter_configuration() {
    let config = LoggingConfig::default().with_filter("core_carousel=debug,core_runtime=trace");

    assert_eq!(
        config.filter,
        Some("core_carousel=debug,core_runtime=trace".to_string())
    );
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
