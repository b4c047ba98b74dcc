mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Backend, Config, Scroll, Security, Service};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("backend.url", &cfg.backend.url),
		("backend.post_process_index", &cfg.backend.post_process_index),
		("backend.tenant_field", &cfg.backend.tenant_field),
		("security.tenant_header", &cfg.security.tenant_header),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.backend.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "backend.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.scroll.page_size == 0 {
		return Err(Error::Validation {
			message: "scroll.page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.scroll.page_size > cfg.scroll.max_page_size {
		return Err(Error::Validation {
			message: "scroll.page_size must not exceed scroll.max_page_size.".to_string(),
		});
	}
	if cfg.scroll.idle_timeout_secs == 0 {
		return Err(Error::Validation {
			message: "scroll.idle_timeout_secs must be greater than zero.".to_string(),
		});
	}
	if i64::try_from(cfg.scroll.idle_timeout_secs).is_err() {
		return Err(Error::Validation {
			message: format!("scroll.idle_timeout_secs must not exceed {}.", i64::MAX),
		});
	}
	if cfg.scroll.keep_alive_secs < cfg.scroll.idle_timeout_secs {
		return Err(Error::Validation {
			message: "scroll.keep_alive_secs must be at least scroll.idle_timeout_secs."
				.to_string(),
		});
	}
	if cfg.scroll.reap_interval_secs == 0 {
		return Err(Error::Validation {
			message: "scroll.reap_interval_secs must be greater than zero.".to_string(),
		});
	}

	for (key, value) in &cfg.backend.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("backend.default_headers.{key} must be a string."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.backend.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.backend.api_key = None;
	}

	cfg.backend.url = cfg.backend.url.trim_end_matches('/').to_string();
}
