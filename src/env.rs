//! Environment variable names read when resolving the API configuration,
//! plus helpers for snapshotting the process environment.
//!
//! Explicit appender settings always win over these variables.

use std::collections::BTreeMap;

/// Ingestion base URL, e.g. `https://api.stackify.com`.
pub const STACKIFY_API_URL_ENV: &str = "STACKIFY_API_URL";

/// Account API key.
pub const STACKIFY_API_KEY_ENV: &str = "STACKIFY_API_KEY";

/// Application name reported with every batch.
pub const STACKIFY_APPLICATION_ENV: &str = "STACKIFY_APPLICATION";

/// Environment name (`prod`, `staging`, ...).
pub const STACKIFY_ENVIRONMENT_ENV: &str = "STACKIFY_ENVIRONMENT";

/// Transport selector, see [`crate::transport::Transport`].
pub const STACKIFY_TRANSPORT_ENV: &str = "STACKIFY_TRANSPORT";

/// When `true`, events emitted by this crate itself are shipped too.
pub const STACKIFY_ALLOW_SELF_LOGGING_ENV: &str = "STACKIFY_ALLOW_SELF_LOGGING";

/// Placeholder for values of secret-looking variables.
pub const REDACTED: &str = "[REDACTED]";

/// Read a non-empty environment variable.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a boolean the way appender properties are usually written:
/// `true`, `1`, `yes`, `on` (any case) are true, anything else is false.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Whether a variable name likely holds a secret.
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    key.contains("KEY")
        || key.contains("TOKEN")
        || key.contains("SECRET")
        || key.contains("PASSWORD")
        || key.contains("CREDENTIAL")
        || key.contains("AUTH")
}

/// Snapshot of the process environment attached to error records, with
/// secret-looking values redacted. Non-UTF-8 entries are skipped.
pub fn server_variables() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .map(|(k, v)| {
            let v = if is_secret_key(&k) { REDACTED.to_string() } else { v };
            (k, v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_flag_spellings() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("1"));
        assert!(parse_flag("on"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("maybe"));
    }

    #[test]
    fn detects_secret_names() {
        assert!(is_secret_key("STACKIFY_API_KEY"));
        assert!(is_secret_key("db_password"));
        assert!(!is_secret_key("PATH"));
        assert!(!is_secret_key("HOSTNAME"));
    }

    #[test]
    fn snapshot_never_exposes_secret_values() {
        for (k, v) in server_variables() {
            if is_secret_key(&k) {
                assert_eq!(v, REDACTED, "{k} leaked");
            }
        }
    }
}
