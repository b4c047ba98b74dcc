use std::sync::Arc;

use axum::http::HeaderName;

use cdr_backend::{BlobStore, SearchBackend, elastic::ElasticBackend};
use cdr_service::CdrService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<CdrService>,
	pub tenant_header: HeaderName,
}
impl AppState {
	pub fn new(config: cdr_config::Config) -> color_eyre::Result<Self> {
		let backend = Arc::new(ElasticBackend::new(&config)?);

		Self::with_backend(config, backend.clone(), backend)
	}

	pub fn with_backend(
		config: cdr_config::Config,
		backend: Arc<dyn SearchBackend>,
		blobs: Arc<dyn BlobStore>,
	) -> color_eyre::Result<Self> {
		let tenant_header = HeaderName::from_bytes(config.security.tenant_header.as_bytes())?;
		let service = CdrService::new(config, backend, blobs);

		Ok(Self { service: Arc::new(service), tenant_header })
	}
}
