use reqwest::header::AUTHORIZATION;
use serde_json::Map;

use cdr_backend::elastic::auth_headers;

#[test]
fn builds_api_key_auth_header() {
	let headers = auth_headers(Some("secret"), &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "ApiKey secret");
}

#[test]
fn omits_auth_header_without_api_key() {
	let mut defaults = Map::new();

	defaults.insert("x-opaque-id".to_string(), serde_json::json!("cdr-gateway"));

	let headers = auth_headers(None, &defaults).expect("Failed to build headers.");

	assert!(headers.get(AUTHORIZATION).is_none());
	assert_eq!(headers.get("x-opaque-id").expect("Missing default header."), "cdr-gateway");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retry".to_string(), serde_json::json!(3));

	assert!(auth_headers(None, &defaults).is_err());
}
