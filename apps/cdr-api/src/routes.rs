use axum::{
	Json, Router,
	extract::{Path, Query, State, rejection::JsonRejection},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;
use cdr_domain::index::CDR_INDEX;
use cdr_service::{
	DeleteRequest, DeleteResponse, Error as ServiceError, GetRequest, PinRequest, PinResponse,
	PostProcessRequest, RecordResponse, ScrollRequest, SearchRequest, SearchResponse,
};

#[derive(Debug, Deserialize)]
struct LegQuery {
	leg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PinQuery {
	index: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetQuery {
	leg: Option<String>,
	domain: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message),
			ServiceError::Forbidden { message } =>
				json_error(StatusCode::FORBIDDEN, "FORBIDDEN", message),
			ServiceError::CursorExpired { message } =>
				json_error(StatusCode::CONFLICT, "CURSOR_EXPIRED", message),
			ServiceError::CursorBusy { message } =>
				json_error(StatusCode::CONFLICT, "CURSOR_BUSY", message),
			ServiceError::Backend(err) => {
				tracing::error!(error = %err, "Search backend request failed.");

				json_error(StatusCode::BAD_GATEWAY, "BACKEND_FAILURE", "Search backend failed.")
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		// Static `cdr` routes shadow `/api/v2/cdr/{uuid}` for the bare index.
		.route("/api/v2/cdr/text", post(search_cdr))
		.route("/api/v2/cdr/text/scroll", post(scroll).delete(close_scroll))
		.route("/api/v2/{index}/text", post(search))
		.route("/api/v2/{index}/text/scroll", post(scroll).delete(close_scroll))
		.route("/api/v2/cdr/{uuid}/pinned", put(add_pin).delete(remove_pin))
		.route("/api/v2/cdr/{uuid}", get(get_by_uuid).delete(remove))
		.route("/api/v2/cdr/{uuid}/post", post(attach_post_process))
		.with_state(state)
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(index): Path<String>,
	Query(query): Query<LegQuery>,
	body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	search_index(state, headers, index, query.leg, json_body(body)?).await
}

async fn search_cdr(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(query): Query<LegQuery>,
	body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	search_index(state, headers, CDR_INDEX.to_string(), query.leg, json_body(body)?).await
}

async fn search_index(
	state: AppState,
	headers: HeaderMap,
	index: String,
	leg: Option<String>,
	body: Value,
) -> Result<Json<SearchResponse>, ApiError> {
	let tenant = tenant(&state, &headers)?;
	let response = state.service.search(&tenant, SearchRequest { index, leg, body }).await?;

	Ok(Json(response))
}

async fn scroll(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<ScrollRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let tenant = tenant(&state, &headers)?;
	let response = state.service.scroll(&tenant, json_body(payload)?).await?;

	Ok(Json(response))
}

async fn close_scroll(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<ScrollRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
	let tenant = tenant(&state, &headers)?;

	state.service.close_scroll(&tenant, json_body(payload)?).await?;

	Ok(StatusCode::OK)
}

async fn add_pin(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(uuid): Path<String>,
	Query(query): Query<PinQuery>,
) -> Result<Json<PinResponse>, ApiError> {
	let tenant = tenant(&state, &headers)?;
	let response = state.service.add_pin(&tenant, PinRequest { uuid, index: query.index }).await?;

	Ok(Json(response))
}

async fn remove_pin(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(uuid): Path<String>,
	Query(query): Query<PinQuery>,
) -> Result<Json<PinResponse>, ApiError> {
	let tenant = tenant(&state, &headers)?;
	let response =
		state.service.remove_pin(&tenant, PinRequest { uuid, index: query.index }).await?;

	Ok(Json(response))
}

async fn get_by_uuid(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(uuid): Path<String>,
	Query(query): Query<GetQuery>,
) -> Result<Json<RecordResponse>, ApiError> {
	let tenant = tenant(&state, &headers)?;
	let req = GetRequest { uuid, leg: query.leg, domain: query.domain };
	let response = state.service.get_by_uuid(&tenant, req).await?;

	Ok(Json(response))
}

async fn remove(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(uuid): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let tenant = tenant(&state, &headers)?;
	let response = state.service.remove(&tenant, DeleteRequest { uuid }).await?;

	Ok(Json(response))
}

async fn attach_post_process(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(uuid): Path<String>,
	payload: Result<Json<Value>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
	let tenant = tenant(&state, &headers)?;
	let payload = json_body(payload)?;

	state.service.attach_post_process(&tenant, PostProcessRequest { uuid, payload }).await?;

	Ok(StatusCode::OK)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
	payload.map(|Json(value)| value).map_err(|rejection| {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", rejection.body_text())
	})
}

fn tenant(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
	let value = headers
		.get(&state.tenant_header)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty());

	value.map(str::to_string).ok_or_else(|| {
		json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			format!("{} header is required.", state.tenant_header),
		)
	})
}
