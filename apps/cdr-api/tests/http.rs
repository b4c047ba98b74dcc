use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use cdr_api::{routes, state::AppState};
use cdr_service::post_process::post_process_key;
use cdr_testkit::{MemoryBackend, test_config};

const TENANT_HEADER: &str = "X-CDR-Tenant-Id";

fn app(backend: Arc<MemoryBackend>) -> Router {
	let state = AppState::with_backend(test_config(), backend.clone(), backend)
		.expect("Failed to initialize app state.");

	routes::router(state)
}

fn request(method: &str, uri: &str, tenant: Option<&str>, body: Option<Value>) -> Request<Body> {
	let mut builder = Request::builder().method(method).uri(uri);

	if let Some(tenant) = tenant {
		builder = builder.header(TENANT_HEADER, tenant);
	}

	match body {
		Some(json) => builder
			.header("content-type", "application/json")
			.body(Body::from(json.to_string()))
			.expect("Failed to build request."),
		None => builder.body(Body::empty()).expect("Failed to build request."),
	}
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
	let response = app.clone().oneshot(req).await.expect("Failed to call router.");
	let status = response.status();
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Failed to parse response.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let app = app(Arc::new(MemoryBackend::new()));
	let (status, _) = call(&app, request("GET", "/health", None, None)).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_tenant_header_is_rejected() {
	let app = app(Arc::new(MemoryBackend::new()));
	let (status, json) =
		call(&app, request("POST", "/api/v2/cdr/text", None, Some(serde_json::json!({})))).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn search_on_bare_cdr_index_pages_through_both_legs() {
	let backend = Arc::new(MemoryBackend::new());

	backend.seed("cdr-a", "acme", "a", 2);
	backend.seed("cdr-b", "acme", "b", 1);
	backend.seed("cdr-a", "other", "x", 4);

	let app = app(backend.clone());
	let (status, first) = call(
		&app,
		request(
			"POST",
			"/api/v2/cdr/text?leg=ab",
			Some("acme"),
			Some(serde_json::json!({ "size": 2 })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(first["total"], 3);
	assert_eq!(first["hits"].as_array().map(Vec::len), Some(2));

	let scroll_id = first["scroll_id"].clone();

	assert!(scroll_id.is_string());

	let (status, second) = call(
		&app,
		request(
			"POST",
			"/api/v2/cdr/text/scroll",
			Some("acme"),
			Some(serde_json::json!({ "scroll_id": scroll_id })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(second["hits"].as_array().map(Vec::len), Some(1));
	assert!(second["scroll_id"].is_null());

	let (status, replay) = call(
		&app,
		request(
			"POST",
			"/api/v2/cdr/text/scroll",
			Some("acme"),
			Some(serde_json::json!({ "scroll_id": scroll_id })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(replay["error_code"], "CURSOR_EXPIRED");
}

#[tokio::test]
async fn bare_cdr_index_without_leg_reads_leg_a() {
	let backend = Arc::new(MemoryBackend::new());

	backend.seed("cdr-a", "acme", "a", 2);
	backend.seed("cdr-b", "acme", "b", 1);

	let app = app(backend);
	let (status, json) =
		call(&app, request("POST", "/api/v2/cdr/text", Some("acme"), Some(serde_json::json!({}))))
			.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["total"], 2);
	assert!(json["scroll_id"].is_null());
}

#[tokio::test]
async fn garbage_scroll_id_is_an_expired_cursor() {
	let app = app(Arc::new(MemoryBackend::new()));
	let garbage = serde_json::json!({ "scroll_id": "not-a-uuid" });
	let (status, json) = call(
		&app,
		request("POST", "/api/v2/cdr/text/scroll", Some("acme"), Some(garbage.clone())),
	)
	.await;

	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(json["error_code"], "CURSOR_EXPIRED");

	let (status, _) =
		call(&app, request("DELETE", "/api/v2/cdr/text/scroll", Some("acme"), Some(garbage)))
			.await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_json_body_uses_error_envelope() {
	let app = app(Arc::new(MemoryBackend::new()));
	let (status, json) = call(
		&app,
		request(
			"POST",
			"/api/v2/cdr/text/scroll",
			Some("acme"),
			Some(serde_json::json!({ "scroll_id": 42 })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "INVALID_REQUEST");

	let req = Request::builder()
		.method("POST")
		.uri("/api/v2/cdr/text")
		.header(TENANT_HEADER, "acme")
		.header("content-type", "application/json")
		.body(Body::from("{not json"))
		.expect("Failed to build request.");
	let (status, json) = call(&app, req).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn leg_query_selects_partition() {
	let backend = Arc::new(MemoryBackend::new());

	backend.seed("cdr-a", "acme", "a", 2);
	backend.seed("cdr-b", "acme", "b", 3);

	let app = app(backend);
	let (status, json) = call(
		&app,
		request("POST", "/api/v2/cdr/text?leg=b", Some("acme"), Some(serde_json::json!({}))),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["total"], 3);
	assert!(
		json["hits"]
			.as_array()
			.expect("hits")
			.iter()
			.all(|hit| hit["_index"] == "cdr-b")
	);
}

#[tokio::test]
async fn unknown_index_is_not_found() {
	let app = app(Arc::new(MemoryBackend::new()));
	let (status, json) = call(
		&app,
		request("POST", "/api/v2/invoices/text", Some("acme"), Some(serde_json::json!({}))),
	)
	.await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(json["error_code"], "NOT_FOUND");
}

#[tokio::test]
async fn scroll_from_other_tenant_is_forbidden() {
	let backend = Arc::new(MemoryBackend::new());

	backend.seed("cdr-a", "acme", "a", 3);

	let app = app(backend);
	let (_, first) = call(
		&app,
		request("POST", "/api/v2/cdr-a/text", Some("acme"), Some(serde_json::json!({ "size": 1 }))),
	)
	.await;
	let (status, json) = call(
		&app,
		request(
			"POST",
			"/api/v2/cdr-a/text/scroll",
			Some("intruder"),
			Some(serde_json::json!({ "scroll_id": first["scroll_id"] })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(json["error_code"], "FORBIDDEN");
}

#[tokio::test]
async fn closed_scroll_cannot_be_advanced() {
	let backend = Arc::new(MemoryBackend::new());

	backend.seed("cdr-a", "acme", "a", 3);

	let app = app(backend.clone());
	let (_, first) = call(
		&app,
		request("POST", "/api/v2/cdr/text", Some("acme"), Some(serde_json::json!({ "size": 1 }))),
	)
	.await;
	let scroll = serde_json::json!({ "scroll_id": first["scroll_id"] });
	let (status, _) =
		call(&app, request("DELETE", "/api/v2/cdr/text/scroll", Some("acme"), Some(scroll.clone())))
			.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(backend.open_scrolls(), 0);

	let (status, json) =
		call(&app, request("POST", "/api/v2/cdr/text/scroll", Some("acme"), Some(scroll))).await;

	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(json["error_code"], "CURSOR_EXPIRED");
}

#[tokio::test]
async fn backend_failure_maps_to_bad_gateway() {
	let backend = Arc::new(MemoryBackend::new());

	backend.seed("cdr-a", "acme", "a", 3);

	let app = app(backend.clone());
	let (_, first) = call(
		&app,
		request("POST", "/api/v2/cdr/text", Some("acme"), Some(serde_json::json!({ "size": 1 }))),
	)
	.await;

	backend.fail_next_continuation();

	let (status, json) = call(
		&app,
		request(
			"POST",
			"/api/v2/cdr/text/scroll",
			Some("acme"),
			Some(serde_json::json!({ "scroll_id": first["scroll_id"] })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(json["error_code"], "BACKEND_FAILURE");
}

#[tokio::test]
async fn get_record_reports_pin_state() {
	let backend = Arc::new(MemoryBackend::new());

	backend.seed("cdr-b", "acme", "call", 1);

	let app = app(backend);
	let (status, pinned) = call(
		&app,
		request("PUT", "/api/v2/cdr/call-0/pinned?index=cdr-b", Some("acme"), None),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(pinned["pinned"], true);
	assert_eq!(pinned["index"], "cdr-b");

	let (status, record) =
		call(&app, request("GET", "/api/v2/cdr/call-0?leg=b", Some("acme"), None)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(record["_id"], "call-0");
	assert_eq!(record["pinned"], true);

	let (status, unpinned) = call(
		&app,
		request("DELETE", "/api/v2/cdr/call-0/pinned?index=cdr-b", Some("acme"), None),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(unpinned["pinned"], false);
}

#[tokio::test]
async fn get_record_of_other_domain_is_forbidden() {
	let backend = Arc::new(MemoryBackend::new());

	backend.seed("cdr-a", "acme", "call", 1);

	let app = app(backend);
	let (status, json) =
		call(&app, request("GET", "/api/v2/cdr/call-0?domain=other", Some("acme"), None)).await;

	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(json["error_code"], "FORBIDDEN");
}

#[tokio::test]
async fn delete_record_removes_it() {
	let backend = Arc::new(MemoryBackend::new());

	backend.seed("cdr-a", "acme", "call", 1);

	let app = app(backend.clone());
	let (status, json) =
		call(&app, request("DELETE", "/api/v2/cdr/call-0", Some("acme"), None)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["deleted_from"], serde_json::json!(["cdr-a"]));
	assert!(!backend.contains("cdr-a", "call-0"));

	let (status, _) = call(&app, request("GET", "/api/v2/cdr/call-0", Some("acme"), None)).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_process_payload_is_stored_per_tenant() {
	let backend = Arc::new(MemoryBackend::new());
	let app = app(backend.clone());
	let (status, _) = call(
		&app,
		request(
			"POST",
			"/api/v2/cdr/call-9/post",
			Some("acme"),
			Some(serde_json::json!({ "sentiment": "positive" })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let stored = backend.blob(&post_process_key("acme", "call-9")).expect("Payload stored.");

	assert_eq!(stored["post_data"]["sentiment"], "positive");
	assert_eq!(stored["variables"]["domain_name"], "acme");
}
