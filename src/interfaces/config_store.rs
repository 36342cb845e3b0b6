//! Configuration variable storage interface.

use async_trait::async_trait;

use super::error::{Result, StoreError};
use crate::model::Variable;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn list_variables(&self) -> Result<Vec<Variable>>;

    /// `Empty` if no variable has this id.
    async fn fetch_variable(&self, id: i64) -> Result<Variable>;

    /// Overwrite the value of a variable. `NotFound` if it does not exist.
    async fn update_variable(&self, _id: i64, _value: &str) -> Result<()> {
        Err(StoreError::NotImplemented("variable update"))
    }

    /// Insert a variable and return its generated id.
    async fn insert_variable(&self, _variable: &Variable) -> Result<i64> {
        Err(StoreError::NotImplemented("variable registration"))
    }
}
