//! INI parsing logic for converting `Ini` → `EngineConfig`.

use super::defaults::clamp_lanes;
use super::{ConfigError, EngineConfig};
use crate::strategy::CacheStrategy;
use ini::Ini;

/// Parse an `Ini` object into an `EngineConfig`.
///
/// Starts from `EngineConfig::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<EngineConfig, ConfigError> {
    let mut config = EngineConfig::default();

    // [pool] section
    if let Some(section) = ini.section(Some("pool")) {
        if let Some(v) = section.get("capacity") {
            let capacity = v.trim().parse::<usize>().map_err(|_| invalid(
                "pool",
                "capacity",
                v,
                "expected a non-negative integer",
            ))?;
            config = config.with_pool_capacity(capacity);
        }
    }

    // [executor] section
    if let Some(section) = ini.section(Some("executor")) {
        if let Some(v) = section.get("lanes") {
            let lanes = v.trim().parse::<usize>().map_err(|_| invalid(
                "executor",
                "lanes",
                v,
                "expected a positive integer",
            ))?;
            config = config.with_executor_lanes(clamp_lanes(lanes));
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("strategy") {
            let strategy = v
                .parse::<CacheStrategy>()
                .map_err(|reason| invalid("cache", "strategy", v, &reason))?;
            config = config.with_cache_strategy(strategy);
        }
        if let Some(v) = section.get("memory_size") {
            let size = parse_size(v).ok_or_else(|| invalid(
                "cache",
                "memory_size",
                v,
                "expected format like '2GB', '500MB', or '1024KB'",
            ))?;
            config = config.with_memory_cache_bytes(size);
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a human-readable size ("2GB", "500 MB", "1024") into bytes.
///
/// Suffixes are binary (K = 1024) and case-insensitive.
pub fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let upper = s.to_uppercase();
    let (num_str, multiplier) = if let Some(n) = strip_unit(&upper, "G") {
        (n, 1024_usize * 1024 * 1024)
    } else if let Some(n) = strip_unit(&upper, "M") {
        (n, 1024_usize * 1024)
    } else if let Some(n) = strip_unit(&upper, "K") {
        (n, 1024_usize)
    } else {
        (upper.as_str(), 1_usize)
    };

    let num: usize = num_str.trim().parse().ok()?;
    num.checked_mul(multiplier)
}

fn strip_unit<'a>(s: &'a str, unit: &str) -> Option<&'a str> {
    s.strip_suffix(&format!("{}B", unit))
        .or_else(|| s.strip_suffix(unit))
}
