//! Runtime environment detection.

/// Environment variable naming the deployment environment.
pub const ENV_VAR: &str = "UPTIME_ENV";

/// Whether the process runs in development mode.
///
/// Reads `UPTIME_ENV` on every call so the answer tracks changes made
/// after startup.
pub fn is_development() -> bool {
    std::env::var(ENV_VAR)
        .map(|value| is_development_value(&value))
        .unwrap_or(false)
}

fn is_development_value(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "development" | "dev")
}
