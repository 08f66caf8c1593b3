pub mod app;
pub mod auth;
pub mod database;
pub mod email;
pub mod jwt;
pub mod rate_limit;
pub mod redis;
pub mod report;

use std::env;

/// Read a boolean flag from the environment, falling back to `default` when
/// the variable is unset or not a recognised boolean spelling.
pub(crate) fn env_flag(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Some(true),
            "0" | "false" | "no" | "n" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

pub(crate) fn env_parse<T: std::str::FromStr>(var_name: &str, default: T) -> T {
    env::var(var_name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
