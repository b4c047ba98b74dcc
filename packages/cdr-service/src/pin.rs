use serde::{Deserialize, Serialize};

use crate::{CdrService, Result};
use cdr_backend::Document;
use cdr_domain::{LegSelector, index::CDR_INDEX, resolve};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinRequest {
	pub uuid: String,
	/// Defaults to `cdr`, which resolves to the leg-a partition.
	pub index: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinResponse {
	pub id: String,
	pub index: String,
	pub pinned: bool,
	/// `None` when the tenant has no such record; the pin state is kept regardless.
	pub record: Option<Document>,
}

impl CdrService {
	pub async fn add_pin(&self, tenant: &str, req: PinRequest) -> Result<PinResponse> {
		self.set_pin(tenant, req, true).await
	}

	pub async fn remove_pin(&self, tenant: &str, req: PinRequest) -> Result<PinResponse> {
		self.set_pin(tenant, req, false).await
	}

	async fn set_pin(&self, tenant: &str, req: PinRequest, pinned: bool) -> Result<PinResponse> {
		let tenant = crate::require(tenant, "tenant")?;
		let uuid = crate::require(&req.uuid, "uuid")?;
		let index = resolve(req.index.as_deref().unwrap_or(CDR_INDEX), LegSelector::Unspecified)?;
		let changed = if pinned {
			self.pins.add_pin(tenant, index.as_str(), uuid)
		} else {
			self.pins.remove_pin(tenant, index.as_str(), uuid)
		};

		if changed {
			tracing::info!(tenant, uuid, %index, pinned, "Updated CDR pin.");
		}

		let record = self.fetch_owned(tenant, index.as_str(), uuid).await?;

		Ok(PinResponse {
			id: uuid.to_string(),
			index: index.to_string(),
			pinned: self.pins.is_pinned(tenant, index.as_str(), uuid),
			record,
		})
	}
}
