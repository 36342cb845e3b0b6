//! Pagination and ordering policy.

use super::criteria::{Criteria, OrderDirection};
use super::predicate::{Filterable, Scope};
use crate::interfaces::{Result, StoreError};

/// Timestamp column used when the caller does not choose an order field.
pub const DEFAULT_ORDER_FIELD: &str = "timestamp";

/// `LIMIT`/`OFFSET` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

/// Resolved ordering and pagination for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    /// `None` means every matching row is returned.
    pub pagination: Option<Pagination>,
    pub field: String,
    pub ascending: bool,
}

impl Ordering {
    /// Sort and page an in-memory result set the way the SQL backend would.
    /// Ties on the order field fall back to `id` in the same direction.
    pub fn apply<T: Filterable>(&self, mut records: Vec<T>) -> Vec<T> {
        records.sort_by(|a, b| {
            let ord = a
                .column(&self.field)
                .cmp(&b.column(&self.field))
                .then_with(|| a.column("id").cmp(&b.column("id")));
            if self.ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        match self.pagination {
            Some(Pagination { limit, offset }) => records
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            None => records,
        }
    }
}

/// Derives [`Ordering`] from criteria.
#[derive(Debug, Clone)]
pub struct OrderPolicy {
    default_field: String,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER_FIELD)
    }
}

impl OrderPolicy {
    pub fn new(default_field: impl Into<String>) -> Self {
        Self {
            default_field: default_field.into(),
        }
    }

    pub fn default_field(&self) -> &str {
        &self.default_field
    }

    /// Resolve ordering without checking the field against a scope.
    ///
    /// Fails when the page offset does not fit in an `i64`.
    pub fn resolve(&self, criteria: &Criteria) -> Result<Ordering> {
        let pagination = if criteria.limit > 0 {
            let offset = criteria
                .page_index
                .checked_mul(criteria.limit)
                .filter(|offset| *offset >= 0)
                .ok_or_else(|| StoreError::Query("page: offset out of range".to_string()))?;
            Some(Pagination {
                limit: criteria.limit as u64,
                offset: offset as u64,
            })
        } else {
            None
        };
        let field = if criteria.order_field.is_empty() {
            self.default_field.clone()
        } else {
            criteria.order_field.clone()
        };
        Ok(Ordering {
            pagination,
            field,
            ascending: criteria.order_direction == OrderDirection::Asc,
        })
    }

    /// Resolve ordering and reject fields `scope` cannot be sorted on.
    pub fn resolve_for(&self, criteria: &Criteria, scope: Scope) -> Result<Ordering> {
        let ordering = self.resolve(criteria)?;
        if !scope.sortable().contains(&ordering.field.as_str()) {
            return Err(StoreError::Query(format!(
                "{}: cannot order by {:?}",
                scope.name(),
                ordering.field
            )));
        }
        Ok(ordering)
    }
}
