use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CdrService, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostProcessRequest {
	pub uuid: String,
	pub payload: Value,
}

impl CdrService {
	/// Stores enrichment data for a call, replacing any earlier payload for the same record.
	pub async fn attach_post_process(&self, tenant: &str, req: PostProcessRequest) -> Result<()> {
		let tenant = crate::require(tenant, "tenant")?;
		let uuid = crate::require(&req.uuid, "uuid")?;
		let key = post_process_key(tenant, uuid);
		let record = serde_json::json!({
			"variables": { "uuid": uuid, "domain_name": tenant },
			"post_data": req.payload,
		});

		self.blobs.put(&key, &record).await.inspect_err(|err| {
			tracing::error!(tenant, uuid, error = %err, "Failed to store post-process payload.");
		})?;

		tracing::debug!(tenant, uuid, "Stored post-process payload.");

		Ok(())
	}
}

/// Blob key for a record's post-process payload; one slot per tenant and record.
pub fn post_process_key(tenant: &str, uuid: &str) -> String {
	format!("{tenant}:{uuid}")
}
