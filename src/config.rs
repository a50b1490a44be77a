//! Process-level configuration, read once at startup.

/// Environment variable naming the base URL of the analysis services.
pub const API_URL_VAR: &str = "DENTISCAN_API_URL";

/// Local backend default, used when the variable is unset or empty.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Base URL for the conversion, detection, and report services.
/// Trailing slashes are trimmed so paths can be appended directly.
pub fn api_url_from_env() -> String {
    std::env::var(API_URL_VAR)
        .ok()
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}
