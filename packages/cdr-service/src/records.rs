use serde::{Deserialize, Serialize};

use crate::{CdrService, Error, Result};
use cdr_backend::Document;
use cdr_domain::LegSelector;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequest {
	pub uuid: String,
	pub leg: Option<String>,
	/// Must match the caller's tenant when given.
	pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordResponse {
	#[serde(flatten)]
	pub document: Document,
	pub pinned: bool,
}

impl CdrService {
	pub async fn get_by_uuid(&self, tenant: &str, req: GetRequest) -> Result<RecordResponse> {
		let tenant = crate::require(tenant, "tenant")?;
		let uuid = crate::require(&req.uuid, "uuid")?;

		if let Some(domain) = req.domain.as_deref().map(str::trim).filter(|value| !value.is_empty())
			&& domain != tenant
		{
			return Err(Error::Forbidden {
				message: "Records of another domain are not accessible.".to_string(),
			});
		}

		let leg = LegSelector::parse(req.leg.as_deref());

		for partition in leg.probe_partitions() {
			if let Some(document) = self.fetch_owned(tenant, partition, uuid).await? {
				let pinned = self.pins.is_pinned(tenant, &document.index, &document.id);

				return Ok(RecordResponse { document, pinned });
			}
		}

		Err(Error::NotFound { message: format!("Record {uuid} not found.") })
	}
}
