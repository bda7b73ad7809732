//! Cache configuration.
//!
//! Controls the staleness interval and the corrupt entry policy via the
//! `[cache]` table of `quaderno.toml`.

use std::{fmt, str::FromStr, time::Duration};

use serde::Deserialize;

const DEFAULT_STALENESS_SECS: u64 = 60 * 60;

/// What a read does when a stored payload no longer deserializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptEntryPolicy {
    /// Treat the entry as a miss and repopulate it synchronously.
    #[default]
    Refetch,
    /// Return an empty result and repair the entry in the background.
    Empty,
}

impl FromStr for CorruptEntryPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "refetch" => Ok(Self::Refetch),
            "empty" => Ok(Self::Empty),
            other => Err(format!("expected `refetch` or `empty`, got `{other}`")),
        }
    }
}

impl fmt::Display for CorruptEntryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Refetch => "refetch",
            Self::Empty => "empty",
        })
    }
}

/// Cache configuration from `quaderno.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age after which a hit schedules a background revalidation.
    pub staleness: Duration,
    pub corrupt_entry_policy: CorruptEntryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(DEFAULT_STALENESS_SECS),
            corrupt_entry_policy: CorruptEntryPolicy::default(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            staleness: settings.staleness,
            corrupt_entry_policy: settings.corrupt_entry_policy,
        }
    }
}
