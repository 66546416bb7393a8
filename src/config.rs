use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;

use crate::services::table::IngestOptions;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    pub max_datasets: u64,
    pub dataset_ttl: Duration,
    pub csv_delimiter: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_file_size: default_max_file_size(),
            max_datasets: 64,
            dataset_ttl: Duration::from_secs(3600),
            csv_delimiter: b',',
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let defaults = Config::default();
        let csv_delimiter = match std::env::var("EXPLORER_CSV_DELIMITER") {
            Ok(raw) => parse_delimiter(&raw)?,
            Err(_) => defaults.csv_delimiter,
        };

        Ok(Config {
            bind_addr: env_or("EXPLORER_BIND_ADDR", defaults.bind_addr)?,
            max_file_size: env_or("EXPLORER_MAX_FILE_SIZE", defaults.max_file_size)?,
            max_datasets: env_or("EXPLORER_MAX_DATASETS", defaults.max_datasets)?,
            dataset_ttl: Duration::from_secs(env_or(
                "EXPLORER_DATASET_TTL_SECS",
                defaults.dataset_ttl.as_secs(),
            )?),
            csv_delimiter,
        })
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            delimiter: self.csv_delimiter,
        }
    }
}

pub fn load_config() -> Result<Config> {
    Config::from_env()
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(anyhow!(
                "EXPLORER_CSV_DELIMITER must be a single byte, got {:?}",
                raw
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiters() {
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.ingest_options().delimiter, b',');
    }

    #[test]
    fn unset_keys_fall_back() {
        let value: u64 = env_or("EXPLORER_TEST_KEY_THAT_IS_NEVER_SET", 7).unwrap();
        assert_eq!(value, 7);
    }
}
