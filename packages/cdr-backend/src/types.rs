use serde::Serialize;
use serde_json::Value;

/// Single-use continuation handle issued by the backend.
///
/// Not `Clone`: each continuation consumes the token and yields at most one successor.
#[derive(Debug, PartialEq, Eq)]
pub struct ContinuationToken {
	raw: String,
	delivered: u64,
}
impl ContinuationToken {
	pub fn new(raw: impl Into<String>, delivered: u64) -> Self {
		Self { raw: raw.into(), delivered }
	}

	pub fn raw(&self) -> &str {
		&self.raw
	}

	/// Documents already handed out before this token.
	pub fn delivered(&self) -> u64 {
		self.delivered
	}

	pub fn into_raw(self) -> String {
		self.raw
	}
}

#[derive(Debug)]
pub struct BackendPage {
	pub total: u64,
	pub hits: Vec<Value>,
	pub continuation: Option<ContinuationToken>,
}
impl BackendPage {
	pub fn is_exhausted(&self) -> bool {
		self.continuation.is_none()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
	#[serde(rename = "_index")]
	pub index: String,
	#[serde(rename = "_id")]
	pub id: String,
	#[serde(rename = "_source")]
	pub source: Value,
}
impl Document {
	/// Looks up a dotted path such as `variables.domain_name` in the source.
	pub fn field(&self, path: &str) -> Option<&Value> {
		lookup_path(&self.source, path)
	}
}

pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
	if let Some(direct) = value.get(path) {
		return Some(direct);
	}

	path.split('.').try_fold(value, |current, segment| current.get(segment))
}
