//! Environment overrides for configuration.
//!
//! Every knob in `FsConfig` can be overridden by an `AFS_*` variable.
//! Unset variables fall back silently; set-but-unparseable ones are
//! logged and ignored.

use std::str::FromStr;

use log::warn;

/// Parse `key` as `T`. Returns `None` when unset or malformed.
pub fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

/// Parse `key` as `T`, or return `default`.
#[inline]
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_parse(key).unwrap_or(default)
}
