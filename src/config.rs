use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use crate::tmdb::TMDB_BASE;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_BIND: &str = "0.0.0.0:3146";

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tmdb_api_key = get("TMDB_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("Missing required environment variable: TMDB_API_KEY"))?;
        let tmdb_base_url = get("TMDB_BASE_URL").unwrap_or_else(|| TMDB_BASE.to_string());
        let data_dir = get("REELBOX_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let bind_raw = get("REELBOX_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse()
            .with_context(|| format!("REELBOX_BIND is not a socket address: {}", bind_raw))?;

        info!("All required environment variables are set");
        Ok(Self {
            tmdb_api_key,
            tmdb_base_url,
            data_dir,
            bind,
        })
    }
}
