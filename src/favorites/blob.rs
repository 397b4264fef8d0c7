//! On-disk form of the favorites list.
//!
//! Current blobs are `{"version", "saved_at", "entries"}`. Older data is a bare
//! JSON array of entries and is read as version 1.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FavoriteEntry;

pub const FAVORITES_KEY: &str = "favorites";
pub const BLOB_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct PersistedFavoritesRef<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: &'a [FavoriteEntry],
}

#[derive(Debug, Deserialize)]
struct PersistedFavorites {
    version: u32,
    #[allow(dead_code)]
    saved_at: Option<DateTime<Utc>>,
    entries: Vec<FavoriteEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnyBlob {
    Versioned(PersistedFavorites),
    Legacy(Vec<FavoriteEntry>),
}

pub fn encode(entries: &[FavoriteEntry], now: DateTime<Utc>) -> Result<String> {
    let blob = PersistedFavoritesRef {
        version: BLOB_VERSION,
        saved_at: now,
        entries,
    };
    Ok(serde_json::to_string(&blob)?)
}

pub fn decode(raw: &str) -> Result<Vec<FavoriteEntry>> {
    match serde_json::from_str::<AnyBlob>(raw)? {
        AnyBlob::Legacy(entries) => Ok(entries),
        AnyBlob::Versioned(blob) if blob.version <= BLOB_VERSION => Ok(blob.entries),
        AnyBlob::Versioned(blob) => bail!(
            "favorites blob version {} is newer than supported {}",
            blob.version,
            BLOB_VERSION
        ),
    }
}
