use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".pdf", ".hwp", ".pptx"];

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub max_file_size_mb: u64,
    pub debug_mode: bool,
    pub data_dir: PathBuf,
    pub cache_ttl_hours: i64,
    /// Characters of document text hashed into a cache key; `None` hashes everything.
    pub cache_key_prefix_chars: Option<usize>,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8000),
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            max_file_size_mb: 50,
            debug_mode: false,
            data_dir: PathBuf::from("data"),
            cache_ttl_hours: 24,
            cache_key_prefix_chars: Some(5000),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let defaults = Config::default();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = parse_var("PORT", 8000)?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let gemini_api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty());

        let max_file_size_mb: u64 = parse_var("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)?;
        if max_file_size_mb == 0 {
            return Err(AppError::ConfigError("MAX_FILE_SIZE_MB must be greater than 0".to_string()));
        }

        let debug_mode = env::var("DEBUG_MODE")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let prefix_chars: usize = parse_var("CACHE_KEY_PREFIX_CHARS", 5000)?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            gemini_api_key,
            gemini_model: env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            max_file_size_mb,
            debug_mode,
            data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            cache_ttl_hours: checked_ttl_hours(parse_var("CACHE_TTL_HOURS", defaults.cache_ttl_hours)?)?,
            cache_key_prefix_chars: (prefix_chars > 0).then_some(prefix_chars),
            max_retries: parse_var("MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_secs(parse_var("RETRY_DELAY_SECS", 2)?),
            request_timeout: Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 300)?),
        })
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }
}

fn checked_ttl_hours(hours: i64) -> Result<i64> {
    crate::cache::ttl_from_hours(hours).map(|_| hours)
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_file_size_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.cache_key_prefix_chars, Some(5000));
        assert_eq!(config.cache_dir(), PathBuf::from("data").join("cache"));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("RFP_TEST_BAD_NUMBER", "abc") };
        let parsed: Result<u32> = parse_var("RFP_TEST_BAD_NUMBER", 1);
        assert!(matches!(parsed, Err(AppError::ConfigError(_))));
        unsafe { env::remove_var("RFP_TEST_BAD_NUMBER") };
    }

    #[test]
    fn test_ttl_out_of_range_is_config_error() {
        assert_eq!(checked_ttl_hours(48).unwrap(), 48);
        assert!(matches!(checked_ttl_hours(i64::MAX), Err(AppError::ConfigError(_))));
    }
}
