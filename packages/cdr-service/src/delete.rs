use serde::{Deserialize, Serialize};

use crate::{CdrService, Error, Result};
use cdr_domain::CDR_PARTITIONS;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
	pub uuid: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
	pub uuid: String,
	pub deleted_from: Vec<String>,
}

impl CdrService {
	/// Deletes the record from every leg partition holding it. Pins on the record are kept.
	pub async fn remove(&self, tenant: &str, req: DeleteRequest) -> Result<DeleteResponse> {
		let tenant = crate::require(tenant, "tenant")?;
		let uuid = crate::require(&req.uuid, "uuid")?;
		let mut deleted_from = Vec::new();

		for partition in CDR_PARTITIONS {
			if self.fetch_owned(tenant, partition, uuid).await?.is_none() {
				continue;
			}
			if self.backend.delete_document(partition, uuid).await? {
				deleted_from.push(partition.to_string());
			}
		}

		if deleted_from.is_empty() {
			return Err(Error::NotFound { message: format!("Record {uuid} not found.") });
		}

		tracing::info!(tenant, uuid, ?deleted_from, "Deleted CDR record.");

		Ok(DeleteResponse { uuid: uuid.to_string(), deleted_from })
	}
}
