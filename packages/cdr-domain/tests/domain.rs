use cdr_domain::{LegSelector, RecordCategory, ResolveError, resolve};

#[test]
fn rejects_indices_outside_allowed_prefixes() {
	for index in ["", "users", "Cdr", "CDR-a", " cdr", "account", "_all", "*"] {
		let err = resolve(index, LegSelector::Unspecified).expect_err("index must be rejected");

		assert_eq!(err, ResolveError::UnknownIndex { index: index.to_string() });
	}
}

#[test]
fn bare_cdr_without_leg_targets_leg_a() {
	let index = resolve("cdr", LegSelector::parse(None)).expect("cdr must resolve");

	assert_eq!(index.as_str(), "cdr-a");
}

#[test]
fn bare_cdr_with_leg_b_targets_leg_b() {
	let index = resolve("cdr", LegSelector::parse(Some("b"))).expect("cdr must resolve");

	assert_eq!(index.as_str(), "cdr-b");
}

#[test]
fn bare_cdr_with_both_legs_keeps_unsuffixed_index() {
	let index = resolve("cdr", LegSelector::parse(Some("ab"))).expect("cdr must resolve");

	assert_eq!(index.as_str(), "cdr");
}

#[test]
fn suffixed_and_accounts_indices_pass_through() {
	let accounts = resolve("accounts-2024", LegSelector::B).expect("accounts must resolve");

	assert_eq!(accounts.as_str(), "accounts-2024");
	assert_eq!(accounts.category(), RecordCategory::Accounts);

	let partition = resolve("cdr-b", LegSelector::A).expect("cdr-b must resolve");

	assert_eq!(partition.as_str(), "cdr-b");
	assert_eq!(partition.category(), RecordCategory::Cdr);
}

#[test]
fn resolution_is_deterministic() {
	for leg in [LegSelector::A, LegSelector::B, LegSelector::Ab, LegSelector::Unspecified] {
		assert_eq!(resolve("cdr", leg), resolve("cdr", leg));
	}
}

#[test]
fn index_name_serializes_as_plain_string() {
	let index = resolve("cdr", LegSelector::B).expect("cdr must resolve");
	let json = serde_json::to_value(&index).expect("Failed to serialize index.");

	assert_eq!(json, serde_json::json!("cdr-b"));
}
