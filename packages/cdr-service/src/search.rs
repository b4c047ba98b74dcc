use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CdrService, CursorHandle, Error, Result, ScrollPage};
use cdr_domain::{LegSelector, resolve};

/// Keys the gateway owns; a client-supplied value would break scroll paging.
const RESERVED_BODY_KEYS: [&str; 3] = ["size", "from", "scroll"];

#[derive(Debug, Clone)]
pub struct SearchRequest {
	pub index: String,
	pub leg: Option<String>,
	/// Backend query body. `size` selects the page size; `query` is scoped to the tenant.
	pub body: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollRequest {
	/// Handle from the previous page, as the client received it.
	pub scroll_id: String,
}
impl From<CursorHandle> for ScrollRequest {
	fn from(handle: CursorHandle) -> Self {
		Self { scroll_id: handle.to_string() }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
	pub total: u64,
	pub hits: Vec<Value>,
	pub scroll_id: Option<CursorHandle>,
}

impl CdrService {
	pub async fn search(&self, tenant: &str, req: SearchRequest) -> Result<SearchResponse> {
		let tenant = crate::require(tenant, "tenant")?;
		let index = resolve(&req.index, LegSelector::parse(req.leg.as_deref()))?;
		let mut body = match req.body {
			Value::Object(body) => body,
			Value::Null => Map::new(),
			_ => {
				return Err(Error::InvalidRequest {
					message: "Search body must be a JSON object.".to_string(),
				});
			},
		};
		let page_size = page_size(&body, self.cfg.scroll.page_size, self.cfg.scroll.max_page_size)?;

		for key in RESERVED_BODY_KEYS {
			body.remove(key);
		}

		let query = scope_to_tenant(body, &self.cfg.backend.tenant_field, tenant);

		tracing::debug!(tenant, %index, page_size, "Executing CDR search.");

		let page = self.cursors.open(tenant, index, query, page_size).await?;

		Ok(self.respond(tenant, page))
	}

	pub async fn scroll(&self, tenant: &str, req: ScrollRequest) -> Result<SearchResponse> {
		let tenant = crate::require(tenant, "tenant")?;
		let handle = CursorHandle::parse(&req.scroll_id).ok_or_else(|| Error::CursorExpired {
			message: "Scroll cursor is closed or unknown.".to_string(),
		})?;
		let page = self.cursors.advance(tenant, handle).await?;

		Ok(self.respond(tenant, page))
	}

	pub async fn close_scroll(&self, tenant: &str, req: ScrollRequest) -> Result<()> {
		let tenant = crate::require(tenant, "tenant")?;
		// A string that was never a handle names no open cursor.
		let Some(handle) = CursorHandle::parse(&req.scroll_id) else {
			return Ok(());
		};

		self.cursors.close(tenant, handle).await
	}

	fn respond(&self, tenant: &str, page: ScrollPage) -> SearchResponse {
		let ScrollPage { total, mut hits, cursor } = page;

		self.pins.annotate_hits(tenant, &mut hits);

		SearchResponse { total, hits, scroll_id: cursor }
	}
}

fn page_size(body: &Map<String, Value>, default: u32, max: u32) -> Result<u32> {
	let Some(raw) = body.get("size") else {
		return Ok(default);
	};
	let requested = raw.as_u64().filter(|size| *size > 0).ok_or_else(|| Error::InvalidRequest {
		message: "size must be a positive integer.".to_string(),
	})?;

	Ok(requested.min(u64::from(max)) as u32)
}

/// Wraps the client query so only documents owned by `tenant` can match.
fn scope_to_tenant(mut body: Map<String, Value>, tenant_field: &str, tenant: &str) -> Value {
	let client_query =
		body.remove("query").unwrap_or_else(|| serde_json::json!({ "match_all": {} }));

	body.insert(
		"query".to_string(),
		serde_json::json!({
			"bool": {
				"must": [client_query],
				"filter": [{ "term": { tenant_field: tenant } }],
			}
		}),
	);

	Value::Object(body)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn body(json: Value) -> Map<String, Value> {
		json.as_object().cloned().expect("Body must be an object.")
	}

	#[test]
	fn page_size_defaults_and_caps() {
		assert_eq!(page_size(&Map::new(), 100, 500).expect("size"), 100);
		assert_eq!(page_size(&body(serde_json::json!({ "size": 20 })), 100, 500).expect("size"), 20);
		assert_eq!(
			page_size(&body(serde_json::json!({ "size": 10_000 })), 100, 500).expect("size"),
			500
		);
	}

	#[test]
	fn page_size_rejects_non_positive_values() {
		for raw in [serde_json::json!(0), serde_json::json!(-3), serde_json::json!("10")] {
			let mut map = Map::new();

			map.insert("size".to_string(), raw);

			assert!(matches!(page_size(&map, 100, 500), Err(Error::InvalidRequest { .. })));
		}
	}

	#[test]
	fn tenant_filter_wraps_client_query() {
		let scoped = scope_to_tenant(
			body(serde_json::json!({
				"query": { "term": { "direction": "inbound" } },
				"sort": [{ "created_time": "desc" }]
			})),
			"variables.domain_name",
			"acme",
		);

		assert_eq!(
			scoped,
			serde_json::json!({
				"query": {
					"bool": {
						"must": [{ "term": { "direction": "inbound" } }],
						"filter": [{ "term": { "variables.domain_name": "acme" } }]
					}
				},
				"sort": [{ "created_time": "desc" }]
			})
		);
	}

	#[test]
	fn missing_query_matches_all_tenant_records() {
		let scoped = scope_to_tenant(Map::new(), "variables.domain_name", "acme");

		assert_eq!(scoped["query"]["bool"]["must"][0], serde_json::json!({ "match_all": {} }));
	}
}
