use std::time::Duration;

use crate::error::{Error, Result};

/// Connection settings for [`crate::Library`].
///
/// Defaults mirror a pool of 10 with 20 overflow connections, a pre-ping
/// before each checkout and a 3 second acquire timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	pub database_url: String,
	pub pool_size: u32,
	pub max_overflow: u32,
	pub acquire_timeout: Duration,
	pub pre_ping: bool,
}

impl Config {
	pub fn new(database_url: impl Into<String>) -> Self {
		Config {
			database_url: database_url.into(),
			pool_size: 10,
			max_overflow: 20,
			acquire_timeout: Duration::from_secs(3),
			pre_ping: true,
		}
	}

	/// Reads `DATABASE_URL` and the `LSYS_*` pool knobs, loading `.env` first.
	pub fn from_env() -> Result<Self> {
		// a missing .env file is fine, the variables may come from the shell
		let _ = dotenvy::dotenv();
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Same as [`Config::from_env`] but reading variables through `get`.
	pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let url = get("DATABASE_URL")
			.filter(|url| !url.trim().is_empty())
			.ok_or_else(|| Error::Config("DATABASE_URL not set".into()))?;
		let mut cfg = Config::new(url);
		if let Some(v) = get("LSYS_POOL_SIZE") {
			cfg.pool_size = parse_var("LSYS_POOL_SIZE", &v)?;
		}
		if let Some(v) = get("LSYS_MAX_OVERFLOW") {
			cfg.max_overflow = parse_var("LSYS_MAX_OVERFLOW", &v)?;
		}
		if let Some(v) = get("LSYS_ACQUIRE_TIMEOUT_SECS") {
			cfg.acquire_timeout = Duration::from_secs(parse_var("LSYS_ACQUIRE_TIMEOUT_SECS", &v)?);
		}
		if let Some(v) = get("LSYS_PRE_PING") {
			cfg.pre_ping = parse_var("LSYS_PRE_PING", &v)?;
		}
		Ok(cfg)
	}

	pub fn max_connections(&self) -> u32 {
		(self.pool_size + self.max_overflow).max(1)
	}

	/// `sqlite::memory:` style urls; each connection would otherwise get its own database.
	pub fn is_memory(&self) -> bool {
		self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
	}
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
	value.trim().parse().map_err(|_| Error::Config(format!("{key}: can't parse '{value}'")))
}
