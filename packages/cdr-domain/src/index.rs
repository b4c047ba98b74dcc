use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub const CDR_INDEX: &str = "cdr";
pub const CDR_A_INDEX: &str = "cdr-a";
pub const CDR_B_INDEX: &str = "cdr-b";
pub const ACCOUNTS_PREFIX: &str = "accounts";

/// Physical partitions that hold individual call legs.
pub const CDR_PARTITIONS: [&str; 2] = [CDR_A_INDEX, CDR_B_INDEX];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
	#[error("Index {index:?} is not a CDR or accounts index.")]
	UnknownIndex { index: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
	Cdr,
	Accounts,
}
impl RecordCategory {
	/// Case-sensitive prefix match, no trimming.
	pub fn from_index(index: &str) -> Option<Self> {
		if index.starts_with(CDR_INDEX) {
			Some(Self::Cdr)
		} else if index.starts_with(ACCOUNTS_PREFIX) {
			Some(Self::Accounts)
		} else {
			None
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LegSelector {
	A,
	B,
	Ab,
	#[default]
	Unspecified,
}
impl LegSelector {
	/// Unrecognized values fall back to `Unspecified`, which routes like leg "a".
	pub fn parse(raw: Option<&str>) -> Self {
		match raw {
			Some("a") => Self::A,
			Some("b") => Self::B,
			Some("ab") => Self::Ab,
			_ => Self::Unspecified,
		}
	}

	pub fn as_str(self) -> Option<&'static str> {
		match self {
			Self::A => Some("a"),
			Self::B => Some("b"),
			Self::Ab => Some("ab"),
			Self::Unspecified => None,
		}
	}

	/// Index targeted when a query names the bare `cdr` index.
	pub fn cdr_target(self) -> &'static str {
		match self {
			Self::A | Self::Unspecified => CDR_A_INDEX,
			Self::B => CDR_B_INDEX,
			Self::Ab => CDR_INDEX,
		}
	}

	/// Partitions to probe, in order, when fetching a single record by id.
	pub fn probe_partitions(self) -> &'static [&'static str] {
		match self {
			Self::A | Self::Unspecified => &CDR_PARTITIONS[..1],
			Self::B => &CDR_PARTITIONS[1..],
			Self::Ab => &CDR_PARTITIONS,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IndexName {
	name: String,
	#[serde(skip)]
	category: RecordCategory,
}
impl IndexName {
	pub fn as_str(&self) -> &str {
		&self.name
	}

	pub fn category(&self) -> RecordCategory {
		self.category
	}
}
impl Display for IndexName {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.name)
	}
}
impl AsRef<str> for IndexName {
	fn as_ref(&self) -> &str {
		&self.name
	}
}

/// Maps an explicitly requested index and leg to the physical index to query.
///
/// Only the bare `cdr` index is leg-aware; every other accepted index passes through
/// unchanged. Tenant scoping is the caller's concern.
pub fn resolve(explicit_index: &str, leg: LegSelector) -> Result<IndexName, ResolveError> {
	let category = RecordCategory::from_index(explicit_index)
		.ok_or_else(|| ResolveError::UnknownIndex { index: explicit_index.to_string() })?;
	let name = if explicit_index == CDR_INDEX {
		leg.cdr_target().to_string()
	} else {
		explicit_index.to_string()
	};

	Ok(IndexName { name, category })
}
