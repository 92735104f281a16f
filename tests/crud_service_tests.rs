use std::sync::Arc;

use serde_json::{json, Map, Value};
use tempfile::tempdir;

use recordbase::collections::{CollectionRegistry, CrudError, GenericCrudService, ListParams};
use recordbase::schema::types::{FieldDefinition, FieldType, TableDefinition, ValidationRules};
use recordbase::schema::SchemaStore;

fn service_fixture() -> (tempfile::TempDir, Arc<SchemaStore>, GenericCrudService) {
    let dir = tempdir().unwrap();
    let db = sled::open(dir.path()).unwrap();
    let store = Arc::new(SchemaStore::new(&db).unwrap());
    let registry = Arc::new(CollectionRegistry::new(db));
    let service = GenericCrudService::new(store.clone(), registry);
    (dir, store, service)
}

fn define_products(store: &SchemaStore) {
    store
        .create_table(TableDefinition::new("products", "Products"))
        .unwrap();
    store
        .create_field(
            FieldDefinition::new("products", "name", FieldType::String, "Name")
                .required()
                .with_order(1),
        )
        .unwrap();
    store
        .create_field(
            FieldDefinition::new("products", "price", FieldType::Number, "Price")
                .required()
                .with_order(2)
                .with_rules(ValidationRules {
                    min: Some(0.0),
                    ..Default::default()
                }),
        )
        .unwrap();
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

#[test]
fn create_returns_stored_record_with_id() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    let record = service
        .create("products", object(json!({"name": "Widget", "price": 19.99})))
        .unwrap();
    let id = record.get("id").and_then(Value::as_str).unwrap();

    let fetched = service.get_by_id("products", id).unwrap();
    assert_eq!(fetched, record);
}

#[test]
fn negative_price_yields_all_validation_messages() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    let err = service
        .create("products", object(json!({"name": "Widget", "price": -5})))
        .unwrap_err();
    match err {
        CrudError::Validation(messages) => {
            assert_eq!(messages, vec!["Price must be at least 0".to_string()]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    // Multiple violations are all reported, not just the first.
    let err = service
        .create("products", object(json!({"price": -5})))
        .unwrap_err();
    match err {
        CrudError::Validation(messages) => {
            assert_eq!(
                messages,
                vec![
                    "Name is required".to_string(),
                    "Price must be at least 0".to_string()
                ]
            );
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn no_write_occurs_on_validation_failure() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    let _ = service.create("products", object(json!({"price": -5})));
    let stats = service.stats("products").unwrap();
    assert_eq!(stats.total, 0);
}

#[test]
fn unknown_table_is_not_found() {
    let (_dir, _store, service) = service_fixture();
    let err = service
        .create("ghosts", object(json!({"name": "Boo"})))
        .unwrap_err();
    assert!(matches!(err, CrudError::NotFound(_)));
}

#[test]
fn update_validates_and_replaces() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    let record = service
        .create("products", object(json!({"name": "Widget", "price": 10})))
        .unwrap();
    let id = record.get("id").and_then(Value::as_str).unwrap().to_string();

    let err = service
        .update("products", &id, object(json!({"name": "Widget", "price": -1})))
        .unwrap_err();
    assert!(matches!(err, CrudError::Validation(_)));

    let updated = service
        .update("products", &id, object(json!({"name": "Widget", "price": 12})))
        .unwrap();
    assert_eq!(updated.get("price"), Some(&json!(12)));

    let err = service
        .update("products", "missing", object(json!({"name": "X", "price": 1})))
        .unwrap_err();
    assert!(matches!(err, CrudError::NotFound(_)));
}

#[test]
fn delete_then_not_found() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    let record = service
        .create("products", object(json!({"name": "Widget", "price": 10})))
        .unwrap();
    let id = record.get("id").and_then(Value::as_str).unwrap().to_string();

    service.delete("products", &id).unwrap();
    assert!(matches!(
        service.get_by_id("products", &id),
        Err(CrudError::NotFound(_))
    ));
    assert!(matches!(
        service.delete("products", &id),
        Err(CrudError::NotFound(_))
    ));
}

#[test]
fn pagination_walk_covers_every_record_once() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    for i in 0..25 {
        service
            .create(
                "products",
                object(json!({"name": format!("Item {:02}", i), "price": i})),
            )
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut page = 1;
    loop {
        let result = service
            .list(
                "products",
                &ListParams {
                    page: Some(page),
                    limit: Some(10),
                    sort_by: Some("name".to_string()),
                    sort_order: Some("asc".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.pagination.total, 25);
        assert_eq!(result.pagination.pages, 3);
        if result.data.is_empty() {
            break;
        }
        for record in &result.data {
            seen.push(
                record
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap()
                    .to_string(),
            );
        }
        page += 1;
    }

    assert_eq!(seen.len(), 25);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 25, "every record appears exactly once");
}

#[test]
fn page_beyond_range_returns_empty_with_unchanged_metadata() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    for i in 0..5 {
        service
            .create(
                "products",
                object(json!({"name": format!("Item {}", i), "price": i})),
            )
            .unwrap();
    }

    let result = service
        .list(
            "products",
            &ListParams {
                page: Some(999),
                limit: Some(10),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(result.data.is_empty());
    assert_eq!(result.pagination.current, 999);
    assert_eq!(result.pagination.pages, 1);
    assert_eq!(result.pagination.total, 5);
}

#[test]
fn empty_collection_reports_zero_pages() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    let result = service
        .list(
            "products",
            &ListParams {
                page: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(result.data.is_empty());
    assert_eq!(result.pagination.current, 3);
    assert_eq!(result.pagination.pages, 0);
    assert_eq!(result.pagination.total, 0);
}

#[test]
fn search_matches_conventional_fields_case_insensitively() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    service
        .create("products", object(json!({"name": "Blue Widget", "price": 1})))
        .unwrap();
    service
        .create("products", object(json!({"name": "Red Gadget", "price": 2})))
        .unwrap();

    let result = service
        .list(
            "products",
            &ListParams {
                search: Some("widget".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(result.pagination.total, 1);
    assert_eq!(
        result.data[0].get("name").and_then(Value::as_str),
        Some("Blue Widget")
    );
}

#[test]
fn sort_order_defaults_to_descending() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    for price in [5, 1, 3] {
        service
            .create(
                "products",
                object(json!({"name": format!("P{}", price), "price": price})),
            )
            .unwrap();
    }

    let result = service
        .list(
            "products",
            &ListParams {
                sort_by: Some("price".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    let prices: Vec<i64> = result
        .data
        .iter()
        .map(|r| r.get("price").and_then(Value::as_i64).unwrap())
        .collect();
    assert_eq!(prices, vec![5, 3, 1]);
}

#[test]
fn stats_without_is_active_field_reports_zero_split() {
    let (_dir, store, service) = service_fixture();
    define_products(&store);

    for i in 0..3 {
        service
            .create(
                "products",
                object(json!({"name": format!("Item {}", i), "price": i})),
            )
            .unwrap();
    }

    let stats = service.stats("products").unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.active, 0);
    assert_eq!(stats.inactive, 0);
}

#[test]
fn stats_counts_is_active_when_schema_declares_it() {
    let (_dir, store, service) = service_fixture();
    store
        .create_table(TableDefinition::new("accounts", "Accounts"))
        .unwrap();
    store
        .create_field(FieldDefinition::new(
            "accounts",
            "is_active",
            FieldType::Boolean,
            "Active",
        ))
        .unwrap();

    service
        .create("accounts", object(json!({"is_active": true})))
        .unwrap();
    service
        .create("accounts", object(json!({"is_active": true})))
        .unwrap();
    service
        .create("accounts", object(json!({"is_active": false})))
        .unwrap();
    service.create("accounts", object(json!({}))).unwrap();

    let stats = service.stats("accounts").unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.active, 2);
    assert_eq!(stats.inactive, 1);
}
