use std::time::Duration;

use reqwest::{
	Client, Response, StatusCode, Url,
	header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::{Map, Value};

use crate::{
	BackendPage, BlobStore, BoxFuture, ContinuationToken, Document, Error, Result, SearchBackend,
};
use cdr_domain::IndexName;

/// Elasticsearch-compatible implementation of [`SearchBackend`] and [`BlobStore`].
pub struct ElasticBackend {
	client: Client,
	base: Url,
	keep_alive: String,
	post_process_index: String,
}

struct ParsedSearch {
	page: BackendPage,
	/// Scroll id returned alongside the final page; nothing will continue it.
	spent_scroll_id: Option<String>,
}

impl ElasticBackend {
	pub fn new(cfg: &cdr_config::Config) -> Result<Self> {
		let base = Url::parse(&cfg.backend.url)
			.map_err(|err| Error::InvalidUrl { message: err.to_string() })?;

		if base.cannot_be_a_base() {
			return Err(Error::InvalidUrl { message: "URL cannot be a base.".to_string() });
		}

		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.backend.timeout_ms))
			.default_headers(auth_headers(
				cfg.backend.api_key.as_deref(),
				&cfg.backend.default_headers,
			)?)
			.build()?;

		Ok(Self {
			client,
			base,
			keep_alive: format!("{}s", cfg.scroll.keep_alive_secs),
			post_process_index: cfg.backend.post_process_index.clone(),
		})
	}

	fn endpoint(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.base.clone();

		url.path_segments_mut()
			.map_err(|_| Error::InvalidUrl { message: "URL cannot be a base.".to_string() })?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	async fn search(&self, index: &IndexName, body: &Value, page_size: u32) -> Result<BackendPage> {
		let mut url = self.endpoint(&[index.as_str(), "_search"])?;

		url.query_pairs_mut().append_pair("scroll", &self.keep_alive);

		let mut body = body.clone();

		if let Some(object) = body.as_object_mut() {
			object.insert("size".to_string(), Value::from(page_size));
			object.insert("track_total_hits".to_string(), Value::Bool(true));
		}

		let res = self.client.post(url).json(&body).send().await?;
		let parsed = parse_search_response(read_json(res).await?, 0)?;

		Ok(self.finish(parsed).await)
	}

	async fn scroll(&self, token: ContinuationToken) -> Result<BackendPage> {
		let url = self.endpoint(&["_search", "scroll"])?;
		let delivered = token.delivered();
		let body = serde_json::json!({
			"scroll": self.keep_alive,
			"scroll_id": token.into_raw(),
		});
		let res = self.client.post(url).json(&body).send().await?;
		let parsed = parse_search_response(read_json(res).await?, delivered)?;

		Ok(self.finish(parsed).await)
	}

	async fn finish(&self, parsed: ParsedSearch) -> BackendPage {
		if let Some(scroll_id) = parsed.spent_scroll_id
			&& let Err(err) = self.clear_scroll(scroll_id).await
		{
			tracing::warn!(error = %err, "Failed to clear exhausted scroll.");
		}

		parsed.page
	}

	async fn clear_scroll(&self, scroll_id: String) -> Result<()> {
		let url = self.endpoint(&["_search", "scroll"])?;
		let body = serde_json::json!({ "scroll_id": [scroll_id] });
		let res = self.client.delete(url).json(&body).send().await?;

		if res.status() == StatusCode::NOT_FOUND {
			return Ok(());
		}

		read_json(res).await?;

		Ok(())
	}

	async fn get(&self, index: &str, id: &str) -> Result<Option<Document>> {
		let url = self.endpoint(&[index, "_doc", id])?;
		let res = self.client.get(url).send().await?;

		if res.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}

		parse_document_response(read_json(res).await?)
	}

	async fn delete(&self, index: &str, id: &str) -> Result<bool> {
		let url = self.endpoint(&[index, "_doc", id])?;
		let res = self.client.delete(url).send().await?;

		if res.status() == StatusCode::NOT_FOUND {
			return Ok(false);
		}

		let json = read_json(res).await?;

		Ok(json.get("result").and_then(Value::as_str) == Some("deleted"))
	}

	async fn put_document(&self, key: &str, value: &Value) -> Result<()> {
		let url = self.endpoint(&[self.post_process_index.as_str(), "_doc", key])?;
		let res = self.client.put(url).json(value).send().await?;

		read_json(res).await?;

		Ok(())
	}
}

impl SearchBackend for ElasticBackend {
	fn execute_query<'a>(
		&'a self,
		index: &'a IndexName,
		body: &'a Value,
		page_size: u32,
	) -> BoxFuture<'a, Result<BackendPage>> {
		Box::pin(self.search(index, body, page_size))
	}

	fn continue_query(&self, token: ContinuationToken) -> BoxFuture<'_, Result<BackendPage>> {
		Box::pin(self.scroll(token))
	}

	fn release(&self, token: ContinuationToken) -> BoxFuture<'_, Result<()>> {
		Box::pin(self.clear_scroll(token.into_raw()))
	}

	fn get_document<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
	) -> BoxFuture<'a, Result<Option<Document>>> {
		Box::pin(self.get(index, id))
	}

	fn delete_document<'a>(&'a self, index: &'a str, id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(self.delete(index, id))
	}
}

impl BlobStore for ElasticBackend {
	fn put<'a>(&'a self, key: &'a str, value: &'a Value) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.put_document(key, value))
	}
}

pub fn auth_headers(api_key: Option<&str>, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(api_key) = api_key {
		headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("ApiKey {api_key}"))?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, HeaderValue::from_str(raw)?);
	}

	Ok(headers)
}

async fn read_json(res: Response) -> Result<Value> {
	let status = res.status();

	if !status.is_success() {
		let body = res.text().await.unwrap_or_default();

		return Err(Error::Status { status: status.as_u16(), body });
	}

	Ok(res.json().await?)
}

fn parse_search_response(json: Value, delivered_before: u64) -> Result<ParsedSearch> {
	let hits_obj = json.get("hits").ok_or_else(|| Error::InvalidResponse {
		message: "Search response is missing hits.".to_string(),
	})?;
	// Older servers report a bare number instead of `{ "value": n }`.
	let (total, total_is_exact) = match hits_obj.get("total") {
		Some(Value::Number(number)) => (number.as_u64(), true),
		Some(object) => (
			object.get("value").and_then(Value::as_u64),
			object.get("relation").and_then(Value::as_str) != Some("gte"),
		),
		None => (None, true),
	};
	let total = total.ok_or_else(|| Error::InvalidResponse {
		message: "Search response is missing hits.total.".to_string(),
	})?;
	let hits = hits_obj.get("hits").and_then(Value::as_array).cloned().ok_or_else(|| {
		Error::InvalidResponse { message: "Search response is missing hits.hits.".to_string() }
	})?;
	let scroll_id = json.get("_scroll_id").and_then(Value::as_str).map(str::to_string);
	let delivered = delivered_before + hits.len() as u64;
	// A `gte` total is only a lower bound, so only an empty page ends the scroll.
	let exhausted = hits.is_empty() || (total_is_exact && delivered >= total);

	if exhausted {
		return Ok(ParsedSearch {
			page: BackendPage { total, hits, continuation: None },
			spent_scroll_id: scroll_id,
		});
	}

	let Some(scroll_id) = scroll_id else {
		return Err(Error::InvalidResponse {
			message: "Search response has more hits but no _scroll_id.".to_string(),
		});
	};

	Ok(ParsedSearch {
		page: BackendPage {
			total,
			hits,
			continuation: Some(ContinuationToken::new(scroll_id, delivered)),
		},
		spent_scroll_id: None,
	})
}

fn parse_document_response(json: Value) -> Result<Option<Document>> {
	if json.get("found").and_then(Value::as_bool) == Some(false) {
		return Ok(None);
	}

	let field = |name: &str| {
		json.get(name).and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
			Error::InvalidResponse { message: format!("Document response is missing {name}.") }
		})
	};
	let index = field("_index")?;
	let id = field("_id")?;
	let source = json.get("_source").cloned().unwrap_or(Value::Null);

	Ok(Some(Document { index, id, source }))
}
