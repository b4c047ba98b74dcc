use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, Ordering},
	},
};

use serde_json::Value;
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

use cdr_backend::{
	BackendPage, BlobStore, BoxFuture, ContinuationToken, Document, Error, Result, SearchBackend,
	lookup_path,
};
use cdr_config::{Backend, Config, Scroll, Security, Service};
use cdr_domain::{CDR_PARTITIONS, IndexName, index::CDR_INDEX};

pub const TENANT_FIELD: &str = "variables.domain_name";

/// In-process search backend with single-use scroll tokens.
#[derive(Default)]
pub struct MemoryBackend {
	indices: Mutex<HashMap<String, Vec<(String, Value)>>>,
	scrolls: Mutex<HashMap<String, PendingScroll>>,
	consumed: Mutex<Vec<String>>,
	released: Mutex<Vec<String>>,
	blobs: Mutex<HashMap<String, Value>>,
	fail_next_continuation: AtomicBool,
	gate: Mutex<Option<Arc<ContinuationGate>>>,
}

struct PendingScroll {
	total: u64,
	page_size: usize,
	remaining: Vec<Value>,
}

/// Parks continuations until released, so tests can observe an in-flight advance.
pub struct ContinuationGate {
	entered: Notify,
	release: Semaphore,
}
impl ContinuationGate {
	pub async fn entered(&self) {
		self.entered.notified().await;
	}

	pub fn release(&self) {
		self.release.add_permits(1);
	}
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, index: &str, id: &str, source: Value) {
		let mut indices = lock(&self.indices);
		let docs = indices.entry(index.to_string()).or_default();

		docs.retain(|(existing, _)| existing != id);
		docs.push((id.to_string(), source));
	}

	/// Inserts `count` records owned by `tenant`, with ids `{prefix}-{n}`.
	pub fn seed(&self, index: &str, tenant: &str, prefix: &str, count: usize) {
		for n in 0..count {
			self.insert(
				index,
				&format!("{prefix}-{n}"),
				serde_json::json!({ "seq": n, "variables": { "domain_name": tenant } }),
			);
		}
	}

	pub fn contains(&self, index: &str, id: &str) -> bool {
		lock(&self.indices)
			.get(index)
			.map(|docs| docs.iter().any(|(existing, _)| existing == id))
			.unwrap_or(false)
	}

	pub fn consumed_tokens(&self) -> Vec<String> {
		lock(&self.consumed).clone()
	}

	pub fn released_tokens(&self) -> Vec<String> {
		lock(&self.released).clone()
	}

	pub fn open_scrolls(&self) -> usize {
		lock(&self.scrolls).len()
	}

	pub fn blob(&self, key: &str) -> Option<Value> {
		lock(&self.blobs).get(key).cloned()
	}

	pub fn fail_next_continuation(&self) {
		self.fail_next_continuation.store(true, Ordering::SeqCst);
	}

	pub fn hold_continuations(&self) -> Arc<ContinuationGate> {
		let gate =
			Arc::new(ContinuationGate { entered: Notify::new(), release: Semaphore::new(0) });

		*lock(&self.gate) = Some(gate.clone());

		gate
	}

	fn matching_hits(&self, index: &str, query: Option<&Value>) -> Vec<Value> {
		let indices = lock(&self.indices);
		let physical: Vec<&str> =
			if index == CDR_INDEX { CDR_PARTITIONS.to_vec() } else { vec![index] };
		let mut hits = Vec::new();

		for name in physical {
			for (id, source) in indices.get(name).into_iter().flatten() {
				if query.map(|query| matches(query, source)).unwrap_or(true) {
					hits.push(serde_json::json!({ "_index": name, "_id": id, "_source": source }));
				}
			}
		}

		hits
	}

	fn next_page(&self, mut scroll: PendingScroll) -> BackendPage {
		let take = scroll.page_size.min(scroll.remaining.len());
		let hits: Vec<Value> = scroll.remaining.drain(..take).collect();
		let delivered = scroll.total - scroll.remaining.len() as u64;

		if scroll.remaining.is_empty() {
			return BackendPage { total: scroll.total, hits, continuation: None };
		}

		let raw = Uuid::new_v4().to_string();
		let total = scroll.total;

		lock(&self.scrolls).insert(raw.clone(), scroll);

		BackendPage { total, hits, continuation: Some(ContinuationToken::new(raw, delivered)) }
	}

	async fn continue_scroll(&self, token: ContinuationToken) -> Result<BackendPage> {
		let gate = lock(&self.gate).take();

		if let Some(gate) = gate {
			gate.entered.notify_one();

			if let Ok(permit) = gate.release.acquire().await {
				permit.forget();
			}
		}

		let raw = token.into_raw();
		let scroll = lock(&self.scrolls).remove(&raw);

		lock(&self.consumed).push(raw.clone());

		let Some(scroll) = scroll else {
			return Err(Error::UnknownToken { token: raw });
		};

		if self.fail_next_continuation.swap(false, Ordering::SeqCst) {
			return Err(Error::Status { status: 503, body: "injected failure".to_string() });
		}

		Ok(self.next_page(scroll))
	}
}

impl SearchBackend for MemoryBackend {
	fn execute_query<'a>(
		&'a self,
		index: &'a IndexName,
		body: &'a Value,
		page_size: u32,
	) -> BoxFuture<'a, Result<BackendPage>> {
		let remaining = self.matching_hits(index.as_str(), body.get("query"));
		let scroll = PendingScroll {
			total: remaining.len() as u64,
			page_size: page_size.max(1) as usize,
			remaining,
		};
		let page = self.next_page(scroll);

		Box::pin(async move { Ok(page) })
	}

	fn continue_query(&self, token: ContinuationToken) -> BoxFuture<'_, Result<BackendPage>> {
		Box::pin(self.continue_scroll(token))
	}

	fn release(&self, token: ContinuationToken) -> BoxFuture<'_, Result<()>> {
		let raw = token.into_raw();

		lock(&self.scrolls).remove(&raw);
		lock(&self.released).push(raw);

		Box::pin(async { Ok(()) })
	}

	fn get_document<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
	) -> BoxFuture<'a, Result<Option<Document>>> {
		let doc = lock(&self.indices).get(index).and_then(|docs| {
			docs.iter().find(|(existing, _)| existing == id).map(|(id, source)| Document {
				index: index.to_string(),
				id: id.clone(),
				source: source.clone(),
			})
		});

		Box::pin(async move { Ok(doc) })
	}

	fn delete_document<'a>(&'a self, index: &'a str, id: &'a str) -> BoxFuture<'a, Result<bool>> {
		let deleted = lock(&self.indices)
			.get_mut(index)
			.map(|docs| {
				let before = docs.len();

				docs.retain(|(existing, _)| existing != id);

				docs.len() != before
			})
			.unwrap_or(false);

		Box::pin(async move { Ok(deleted) })
	}
}

impl BlobStore for MemoryBackend {
	fn put<'a>(&'a self, key: &'a str, value: &'a Value) -> BoxFuture<'a, Result<()>> {
		lock(&self.blobs).insert(key.to_string(), value.clone());

		Box::pin(async { Ok(()) })
	}
}

/// Configuration matching the in-memory backend's document layout.
pub fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		backend: Backend {
			url: "http://127.0.0.1:1".to_string(),
			timeout_ms: 1_000,
			api_key: None,
			post_process_index: "cdr-post".to_string(),
			tenant_field: TENANT_FIELD.to_string(),
			default_headers: Default::default(),
		},
		scroll: Scroll {
			page_size: 100,
			max_page_size: 500,
			keep_alive_secs: 600,
			idle_timeout_secs: 300,
			reap_interval_secs: 30,
		},
		security: Security {
			bind_localhost_only: true,
			tenant_header: "X-CDR-Tenant-Id".to_string(),
		},
	}
}

/// Evaluates the subset of the query DSL the gateway emits: `bool`, `term`, `match_all`.
fn matches(query: &Value, source: &Value) -> bool {
	if let Some(clauses) = query.get("bool") {
		return ["must", "filter"].iter().all(|kind| match clauses.get(*kind) {
			Some(Value::Array(items)) => items.iter().all(|item| matches(item, source)),
			Some(item) => matches(item, source),
			None => true,
		});
	}
	if let Some(term) = query.get("term").and_then(Value::as_object) {
		return term.iter().all(|(field, expected)| {
			let expected = expected.get("value").unwrap_or(expected);

			lookup_path(source, field) == Some(expected)
		});
	}

	true
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}
