pub mod delete;
pub mod pin;
pub mod pins;
pub mod post_process;
pub mod records;
pub mod scroll;
pub mod search;

mod error;

pub use delete::{DeleteRequest, DeleteResponse};
pub use error::{Error, Result};
pub use pin::{PinRequest, PinResponse};
pub use pins::PinOverlayStore;
pub use post_process::PostProcessRequest;
pub use records::{GetRequest, RecordResponse};
pub use scroll::{CursorHandle, CursorInfo, ScrollCursorManager, ScrollPage, spawn_reaper};
pub use search::{ScrollRequest, SearchRequest, SearchResponse};

use std::sync::Arc;

use serde_json::Value;

use cdr_backend::{BlobStore, Document, SearchBackend};
use cdr_config::Config;

/// Entry point for every CDR operation. All methods take the caller's tenant explicitly.
pub struct CdrService {
	pub cfg: Config,
	pub backend: Arc<dyn SearchBackend>,
	pub blobs: Arc<dyn BlobStore>,
	pub cursors: Arc<ScrollCursorManager>,
	pub pins: PinOverlayStore,
}
impl CdrService {
	pub fn new(cfg: Config, backend: Arc<dyn SearchBackend>, blobs: Arc<dyn BlobStore>) -> Self {
		let idle_timeout = i64::try_from(cfg.scroll.idle_timeout_secs)
			.map(time::Duration::seconds)
			.unwrap_or(time::Duration::MAX);
		let cursors = Arc::new(ScrollCursorManager::new(backend.clone(), idle_timeout));

		Self { cfg, backend, blobs, cursors, pins: PinOverlayStore::new() }
	}

	pub(crate) fn owned_by(&self, doc: &Document, tenant: &str) -> bool {
		doc.field(&self.cfg.backend.tenant_field).and_then(Value::as_str) == Some(tenant)
	}

	/// Fetches a record, hiding it when another tenant owns it.
	pub(crate) async fn fetch_owned(
		&self,
		tenant: &str,
		index: &str,
		id: &str,
	) -> Result<Option<Document>> {
		let doc = self.backend.get_document(index, id).await?;

		Ok(doc.filter(|doc| self.owned_by(doc, tenant)))
	}
}

pub(crate) fn require<'a>(value: &'a str, label: &str) -> Result<&'a str> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::InvalidRequest { message: format!("{label} is required.") });
	}

	Ok(trimmed)
}
