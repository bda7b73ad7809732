//! Cache key definitions.
//!
//! `CacheKey` names a logical entry; `StoreKey` names one of the two physical
//! slots (payload and freshness timestamp) an entry occupies in a store.

use std::fmt;

use super::CacheError;

const TIMESTAMP_SUFFIX: &str = "-timestamp";

/// The listing filter that selects every row. Matched case-insensitively and
/// stored in this spelling.
pub const UNFILTERED: &str = "all";

/// A logical cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The child records of one document.
    Records { id: String },
    /// The listing rows of one database, narrowed by a filter.
    Listing { id: String, filter: String },
}

impl CacheKey {
    pub fn records(id: &str) -> Result<Self, CacheError> {
        Ok(Self::Records {
            id: object_id(id)?,
        })
    }

    pub fn listing(id: &str, filter: &str) -> Result<Self, CacheError> {
        let mut filter = non_empty("filter", filter)?;
        if filter.eq_ignore_ascii_case(UNFILTERED) {
            filter = UNFILTERED.to_string();
        }
        Ok(Self::Listing {
            id: object_id(id)?,
            filter,
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Records { id } | Self::Listing { id, .. } => id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Records { id } => f.write_str(id),
            Self::Listing { id, filter } => write!(f, "{id}-{filter}"),
        }
    }
}

fn non_empty(part: &'static str, value: &str) -> Result<String, CacheError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CacheError::InvalidKey { part });
    }
    Ok(trimmed.to_string())
}

/// Ids end up in store keys and origin URL paths, so they are held to ASCII
/// letters, digits and `-`.
fn object_id(value: &str) -> Result<String, CacheError> {
    let id = non_empty("id", value)?;
    if !id.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-') {
        return Err(CacheError::InvalidKey { part: "id" });
    }
    Ok(id)
}

/// Which physical slot of an entry is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Payload,
    Timestamp,
}

/// A physical key inside a [`Store`](super::Store).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub entry: CacheKey,
    pub slot: Slot,
}

impl StoreKey {
    pub fn payload(entry: &CacheKey) -> Self {
        Self {
            entry: entry.clone(),
            slot: Slot::Payload,
        }
    }

    pub fn timestamp(entry: &CacheKey) -> Self {
        Self {
            entry: entry.clone(),
            slot: Slot::Timestamp,
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            Slot::Payload => write!(f, "{}", self.entry),
            Slot::Timestamp => write!(f, "{}{TIMESTAMP_SUFFIX}", self.entry),
        }
    }
}
