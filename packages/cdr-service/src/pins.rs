use dashmap::DashSet;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PinKey {
	tenant: String,
	index: String,
	record_id: String,
}
impl PinKey {
	fn new(tenant: &str, index: &str, record_id: &str) -> Self {
		Self { tenant: tenant.to_string(), index: index.to_string(), record_id: record_id.to_string() }
	}
}

/// Pin markers kept apart from the records they annotate.
///
/// The tenant is part of every key, so one tenant can never observe another's pins. The set
/// is sharded, so readers only wait on writers touching the same shard.
#[derive(Default)]
pub struct PinOverlayStore {
	pins: DashSet<PinKey>,
}
impl PinOverlayStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` when the pin was not present before.
	pub fn add_pin(&self, tenant: &str, index: &str, record_id: &str) -> bool {
		self.pins.insert(PinKey::new(tenant, index, record_id))
	}

	/// Returns `true` when a pin was removed.
	pub fn remove_pin(&self, tenant: &str, index: &str, record_id: &str) -> bool {
		self.pins.remove(&PinKey::new(tenant, index, record_id)).is_some()
	}

	pub fn is_pinned(&self, tenant: &str, index: &str, record_id: &str) -> bool {
		self.pins.contains(&PinKey::new(tenant, index, record_id))
	}

	pub fn pinned_in(&self, tenant: &str, index: &str) -> Vec<String> {
		let mut ids: Vec<String> = self
			.pins
			.iter()
			.filter(|key| key.tenant == tenant && key.index == index)
			.map(|key| key.record_id.clone())
			.collect();

		ids.sort();

		ids
	}

	/// Sets `pinned` on each search hit from its `_index` and `_id`.
	pub(crate) fn annotate_hits(&self, tenant: &str, hits: &mut [Value]) {
		for hit in hits {
			let pinned = match (
				hit.get("_index").and_then(Value::as_str),
				hit.get("_id").and_then(Value::as_str),
			) {
				(Some(index), Some(id)) => self.is_pinned(tenant, index, id),
				_ => false,
			};

			if let Some(object) = hit.as_object_mut() {
				object.insert("pinned".to_string(), Value::Bool(pinned));
			}
		}
	}
}
