//! ConfigStore interface tests.
//!
//! These tests verify the contract of the ConfigStore trait and the
//! allowed-range checks of the variable registry on top of it.

use std::sync::Arc;

use gapkeeper::interfaces::{ConfigStore, StoreError};
use gapkeeper::model::Variable;
use gapkeeper::services::VariableRegistry;

/// Create a test variable restricted to `range` (unrestricted if empty).
pub fn make_variable(name: &str, value: &str, range: &[&str]) -> Variable {
    Variable {
        id: 0,
        name: name.to_string(),
        value: value.to_string(),
        allowed_range: range.iter().map(|v| v.to_string()).collect(),
        hazardous: false,
    }
}

pub async fn test_insert_and_fetch<S: ConfigStore>(store: &Arc<S>) {
    let mut variable = make_variable("test_mode", "auto", &["auto", "manual"]);
    variable.hazardous = true;

    let id = store
        .insert_variable(&variable)
        .await
        .expect("insert should succeed");
    let stored = store.fetch_variable(id).await.expect("fetch should succeed");

    assert_eq!(stored.id, id);
    assert_eq!(stored.name, "test_mode");
    assert_eq!(stored.value, "auto");
    assert_eq!(stored.allowed_range, vec!["auto", "manual"]);
    assert!(stored.hazardous);

    let all = store.list_variables().await.expect("list should succeed");
    assert!(all.iter().any(|v| v.id == id));
}

pub async fn test_update_in_place<S: ConfigStore>(store: &Arc<S>) {
    let id = store
        .insert_variable(&make_variable("test_threshold", "10", &[]))
        .await
        .expect("insert should succeed");

    store
        .update_variable(id, "25")
        .await
        .expect("update should succeed");
    let stored = store.fetch_variable(id).await.expect("fetch should succeed");
    assert_eq!(stored.value, "25");
    assert_eq!(stored.name, "test_threshold");
}

pub async fn test_missing_variable<S: ConfigStore>(store: &Arc<S>) {
    assert!(matches!(
        store.fetch_variable(999_999).await,
        Err(StoreError::Empty)
    ));
    assert!(matches!(
        store.update_variable(999_999, "x").await,
        Err(StoreError::NotFound(_))
    ));
}

pub async fn test_registry_enforces_range<S: ConfigStore>(store: &Arc<S>) {
    let registry = VariableRegistry::new(Arc::clone(store));
    let created = registry
        .register(&make_variable("test_link", "up", &["up", "down"]))
        .await
        .expect("register should succeed");

    let updated = registry
        .update(created.id, "down")
        .await
        .expect("update should succeed");
    assert_eq!(updated.value, "down");

    let err = registry.update(created.id, "sideways").await.unwrap_err();
    assert!(matches!(err, StoreError::Query(_)), "got {err:?}");
    let stored = store
        .fetch_variable(created.id)
        .await
        .expect("fetch should succeed");
    assert_eq!(stored.value, "down", "rejected value not written");

    let err = registry.update(999_999, "up").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
}

/// Run all ConfigStore tests against an `Arc`-wrapped store.
#[macro_export]
macro_rules! run_config_store_tests {
    ($store:expr) => {
        use $crate::storage::config_store_tests::*;

        test_insert_and_fetch($store).await;
        println!("  test_insert_and_fetch: PASSED");

        test_update_in_place($store).await;
        println!("  test_update_in_place: PASSED");

        test_missing_variable($store).await;
        println!("  test_missing_variable: PASSED");

        test_registry_enforces_range($store).await;
        println!("  test_registry_enforces_range: PASSED");
    };
}
