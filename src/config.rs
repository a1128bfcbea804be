//! Server configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads `.env` via `dotenvy` and then builds [`AppConfig`] once. Every
//! knob has a default so a bare `cargo run` serves the memory-backed stack.

use std::collections::HashSet;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Minimum key material accepted by `axum_extra::extract::cookie::Key::from`.
pub const COOKIE_SECRET_MIN_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Postgres URL for the document store. `None` selects the memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Secret for signing routing cookies. `None` generates an ephemeral key.
    pub cookie_secret: Option<Vec<u8>>,
    pub cookie_secure: bool,
    /// Lower-cased emails that receive the `admin` role at sign-up.
    pub admin_emails: HashSet<String>,
    /// Upper bound on a single auth provider call. `None` waits indefinitely.
    pub auth_call_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            cookie_secret: None,
            cookie_secure: false,
            admin_emails: HashSet::new(),
            auth_call_timeout: None,
        }
    }
}

impl AppConfig {
    /// Build the config from the process environment.
    ///
    /// - `PORT`: listen port (default 3000)
    /// - `DATABASE_URL`: Postgres document store; memory store when absent
    /// - `DB_MAX_CONNECTIONS`: pool size (default 5)
    /// - `COOKIE_SECRET`: at least 64 bytes; shorter values are ignored
    /// - `COOKIE_SECURE`: boolean, default false
    /// - `ADMIN_EMAILS`: comma-separated list
    /// - `AUTH_CALL_TIMEOUT_MS`: per-call auth timeout, unset or 0 disables
    #[must_use]
    pub fn from_env() -> Self {
        let cookie_secret = std::env::var("COOKIE_SECRET")
            .ok()
            .map(String::into_bytes)
            .filter(|bytes| {
                let ok = bytes.len() >= COOKIE_SECRET_MIN_LEN;
                if !ok {
                    tracing::warn!(len = bytes.len(), "COOKIE_SECRET too short; using an ephemeral key");
                }
                ok
            });

        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            cookie_secret,
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            admin_emails: parse_email_list(std::env::var("ADMIN_EMAILS").ok().as_deref()),
            auth_call_timeout: parse_timeout_ms(std::env::var("AUTH_CALL_TIMEOUT_MS").ok().as_deref()),
        }
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_email_list(raw: Option<&str>) -> HashSet<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|email| email.trim().to_ascii_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

pub(crate) fn parse_timeout_ms(raw: Option<&str>) -> Option<Duration> {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
