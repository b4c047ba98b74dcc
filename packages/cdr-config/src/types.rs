use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub backend: Backend,
	pub scroll: Scroll,
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Backend {
	/// Base URL of the Elasticsearch-compatible search backend.
	pub url: String,
	pub timeout_ms: u64,
	/// Sent as `Authorization: ApiKey <value>` when present.
	pub api_key: Option<String>,
	/// Index receiving post-process payloads.
	pub post_process_index: String,
	/// Document field holding the owning tenant, e.g. "variables.domain_name".
	pub tenant_field: String,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scroll {
	pub page_size: u32,
	pub max_page_size: u32,
	/// Lifetime the backend keeps a scroll context alive between continuations.
	pub keep_alive_secs: u64,
	/// Cursors idle longer than this are closed by the reaper.
	pub idle_timeout_secs: u64,
	pub reap_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	#[serde(default = "default_tenant_header")]
	pub tenant_header: String,
}

fn default_tenant_header() -> String {
	"X-CDR-Tenant-Id".to_string()
}
