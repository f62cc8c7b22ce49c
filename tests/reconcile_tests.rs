//! Property-style tests for nested-list reconciliation.

mod common;

use common::*;
use nested_serializers::nesting::reconcile_children;
use nested_serializers::schema::RelationDef;
use nested_serializers::serializer::RecordSerializer;
use serde_json::{Value, json};
use std::collections::BTreeSet;

fn addresses_relation() -> RelationDef {
	profile_schema().get_relation("addresses").unwrap().clone()
}

fn seed_child(store: &MemoryStore, profile: &Value, suffix: &str) -> Value {
	let mut child = address_payload(suffix);
	child["profile_id"] = id_of(profile);
	store.seed("addresses", child)
}

fn as_update(child: &Value, suffix: &str) -> Value {
	let mut payload = address_payload(suffix);
	payload["id"] = id_of(child);
	payload
}

#[tokio::test]
async fn reconciliation_matches_the_payload_list_exactly() {
	let store = MemoryStore::new();
	let profile = store.seed("profiles", json!({"birth_date": "2023-02-16"}));
	let kept = seed_child(&store, &profile, "-kept");
	let _dropped1 = seed_child(&store, &profile, "-dropped1");
	let _dropped2 = seed_child(&store, &profile, "-dropped2");

	let child = RecordSerializer::new(address_schema());
	let payloads = vec![
		as_update(&kept, "-kept2"),
		address_payload("-new1"),
		address_payload("-new2"),
	];
	let saved = reconcile_children(
		&store,
		&child,
		&addresses_relation(),
		&id_of(&profile),
		&payloads,
	)
	.await
	.unwrap();

	assert_eq!(saved.len(), 3);
	assert_eq!(store.count("addresses"), 3);

	// The surviving identifier set is exactly the payload's: the match
	// updated, the id-less entries created, the omitted rows deleted.
	let expected: BTreeSet<i64> = saved.iter().map(|row| row["id"].as_i64().unwrap()).collect();
	let actual: BTreeSet<i64> = store.ids("addresses").into_iter().collect();
	assert_eq!(actual, expected);
	assert!(actual.contains(&kept["id"].as_i64().unwrap()));

	let kept = store.get("addresses", &id_of(&kept)).unwrap();
	assert_eq!(kept["city"], json!("city-kept2"));
	for row in &saved {
		assert_eq!(row["profile_id"], id_of(&profile));
	}
}

#[tokio::test]
async fn reconciliation_is_idempotent() {
	let store = MemoryStore::new();
	let profile = store.seed("profiles", json!({"birth_date": "2023-02-16"}));
	let first = seed_child(&store, &profile, "-1");
	let second = seed_child(&store, &profile, "-2");

	let child = RecordSerializer::new(address_schema());
	let payloads = vec![as_update(&first, "-1b"), as_update(&second, "-2b")];

	let relation = addresses_relation();
	reconcile_children(&store, &child, &relation, &id_of(&profile), &payloads)
		.await
		.unwrap();
	let after_once: Vec<Value> = store
		.ids("addresses")
		.into_iter()
		.map(|id| store.get("addresses", &json!(id)).unwrap())
		.collect();

	reconcile_children(&store, &child, &relation, &id_of(&profile), &payloads)
		.await
		.unwrap();
	let after_twice: Vec<Value> = store
		.ids("addresses")
		.into_iter()
		.map(|id| store.get("addresses", &json!(id)).unwrap())
		.collect();

	assert_eq!(after_once, after_twice);
}

#[tokio::test]
async fn reconciliation_with_empty_list_deletes_all_children() {
	let store = MemoryStore::new();
	let profile = store.seed("profiles", json!({"birth_date": "2023-02-16"}));
	seed_child(&store, &profile, "-1");
	seed_child(&store, &profile, "-2");

	let child = RecordSerializer::new(address_schema());
	let saved = reconcile_children(
		&store,
		&child,
		&addresses_relation(),
		&id_of(&profile),
		&[],
	)
	.await
	.unwrap();

	assert!(saved.is_empty());
	assert_eq!(store.count("addresses"), 0);
}

#[tokio::test]
async fn reconciliation_only_touches_the_parents_own_children() {
	let store = MemoryStore::new();
	let profile = store.seed("profiles", json!({"birth_date": "2023-02-16"}));
	let other = store.seed("profiles", json!({"birth_date": "2020-01-01"}));
	seed_child(&store, &profile, "-mine");
	let foreign = seed_child(&store, &other, "-other");

	let child = RecordSerializer::new(address_schema());
	reconcile_children(
		&store,
		&child,
		&addresses_relation(),
		&id_of(&profile),
		&[address_payload("-replacement")],
	)
	.await
	.unwrap();

	// The other parent's child is untouched.
	assert!(store.get("addresses", &id_of(&foreign)).is_some());
	assert_eq!(store.count("addresses"), 2);
}
