//! Configuration variables.

use std::sync::Arc;

use tracing::info;

use crate::interfaces::{ConfigStore, Result, StoreError};
use crate::model::Variable;

/// Validates variable writes against their allowed range.
pub struct VariableRegistry<S: ConfigStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ConfigStore + ?Sized> Clone for VariableRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ConfigStore + ?Sized> VariableRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Variable>> {
        self.store.list_variables().await
    }

    /// Replace the value of an existing variable and return it re-read.
    pub async fn update(&self, id: i64, value: &str) -> Result<Variable> {
        let current = match self.store.fetch_variable(id).await {
            Err(StoreError::Empty) => return Err(StoreError::NotFound(format!("variable {id}"))),
            other => other?,
        };
        if !current.accepts(value) {
            return Err(StoreError::Query(format!(
                "{}: value {value:?} not in {:?}",
                current.name, current.allowed_range
            )));
        }

        self.store.update_variable(id, value).await?;
        info!(variable = %current.name, value, "variable updated");

        self.store.fetch_variable(id).await
    }

    /// Register a new variable.
    pub async fn register(&self, variable: &Variable) -> Result<Variable> {
        if variable.name.trim().is_empty() {
            return Err(StoreError::Query("variable name required".to_string()));
        }
        if !variable.accepts(&variable.value) {
            return Err(StoreError::Query(format!(
                "{}: value {:?} not in {:?}",
                variable.name, variable.value, variable.allowed_range
            )));
        }

        let id = self.store.insert_variable(variable).await?;
        info!(variable = %variable.name, id, "variable registered");

        self.store.fetch_variable(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::MemoryStore;

    fn variable(name: &str, value: &str, range: &[&str]) -> Variable {
        Variable {
            id: 0,
            name: name.into(),
            value: value.into(),
            allowed_range: range.iter().map(|s| s.to_string()).collect(),
            hazardous: false,
        }
    }

    #[tokio::test]
    async fn test_register_and_update() {
        let registry = VariableRegistry::new(Arc::new(MemoryStore::new()));

        let v = registry
            .register(&variable("mode", "auto", &["auto", "manual"]))
            .await
            .unwrap();
        assert!(v.id > 0);

        let updated = registry.update(v.id, "manual").await.unwrap();
        assert_eq!(updated.value, "manual");
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_outside_range_rejected() {
        let registry = VariableRegistry::new(Arc::new(MemoryStore::new()));
        let v = registry
            .register(&variable("mode", "auto", &["auto", "manual"]))
            .await
            .unwrap();

        let err = registry.update(v.id, "off").await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        assert_eq!(registry.list().await.unwrap()[0].value, "auto");
    }

    #[tokio::test]
    async fn test_free_form_variable_accepts_anything() {
        let registry = VariableRegistry::new(Arc::new(MemoryStore::new()));
        let v = registry.register(&variable("threshold", "10", &[])).await.unwrap();
        assert_eq!(registry.update(v.id, "25").await.unwrap().value, "25");
    }

    #[tokio::test]
    async fn test_update_unknown_variable() {
        let registry = VariableRegistry::new(Arc::new(MemoryStore::new()));
        let err = registry.update(1, "x").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_register_requires_name() {
        let registry = VariableRegistry::new(Arc::new(MemoryStore::new()));
        assert!(registry.register(&variable(" ", "1", &[])).await.is_err());
    }
}
