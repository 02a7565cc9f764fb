//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use issuance::BulkIssueConfig;

/// Runner configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `BULK_COUNT`: cards to issue (default: `100`)
/// - `BULK_AMOUNT`: opening balance of each card (default: `50`)
/// - `REPORT_INTERVAL_MS`: progress report cadence (default: `1000`)
/// - `MAX_IN_FLIGHT`: concurrent issue commands (default: `256`)
/// - `PRINT_METRICS`: print Prometheus metrics at exit (default: `false`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bulk_count: usize,
    pub bulk_amount: i64,
    pub report_interval_ms: u64,
    pub max_in_flight: usize,
    pub print_metrics: bool,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bulk_count: parse_or(&lookup, "BULK_COUNT", defaults.bulk_count),
            bulk_amount: parse_or(&lookup, "BULK_AMOUNT", defaults.bulk_amount),
            report_interval_ms: parse_or(
                &lookup,
                "REPORT_INTERVAL_MS",
                defaults.report_interval_ms,
            ),
            max_in_flight: parse_or(&lookup, "MAX_IN_FLIGHT", defaults.max_in_flight),
            print_metrics: parse_or(&lookup, "PRINT_METRICS", defaults.print_metrics),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    pub fn bulk_issue_config(&self) -> BulkIssueConfig {
        BulkIssueConfig {
            report_interval: Duration::from_millis(self.report_interval_ms),
            max_in_flight: self.max_in_flight,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bulk_count: 100,
            bulk_amount: 50,
            report_interval_ms: 1000,
            max_in_flight: 256,
            print_metrics: false,
            log_level: "info".to_string(),
        }
    }
}
