//! Query construction.
//!
//! Inbound list parameters flow through three stages:
//! - [`criteria`]: raw strings to a validated [`Criteria`]
//! - [`predicate`]: criteria to a conjunctive [`Predicate`] for an entity scope
//! - [`ordering`]: criteria to limit/offset and sort order
//!
//! [`Selection`] bundles the last two for the stores.

pub mod criteria;
pub mod ordering;
pub mod predicate;

pub use criteria::{Criteria, OrderDirection};
pub use ordering::{OrderPolicy, Ordering, Pagination, DEFAULT_ORDER_FIELD};
pub use predicate::{Comparison, Field, Filterable, Predicate, Scope, Value};

use crate::interfaces::{Result, StoreError};

/// Everything a store needs to answer a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub scope: Scope,
    pub predicate: Option<Predicate>,
    pub ordering: Ordering,
}

impl Selection {
    /// Build the selection for `scope` from parsed criteria.
    pub fn new(criteria: &Criteria, scope: Scope, policy: &OrderPolicy) -> Result<Self> {
        if scope.supports(Field::Source)
            && !criteria.source.is_empty()
            && criteria.source.parse::<i64>().is_err()
        {
            return Err(StoreError::Query(format!(
                "source: invalid integer {:?}",
                criteria.source
            )));
        }
        Ok(Self {
            scope,
            predicate: predicate::build(criteria, scope),
            ordering: policy.resolve_for(criteria, scope)?,
        })
    }

    /// Selection matching every record of `scope`, default ordering, no paging.
    pub fn all(scope: Scope, policy: &OrderPolicy) -> Self {
        Self {
            scope,
            predicate: None,
            ordering: Ordering {
                pagination: None,
                field: policy.default_field().to_string(),
                ascending: false,
            },
        }
    }

    /// Filter, sort and page an in-memory record set.
    pub fn apply<T: Filterable + Clone>(&self, records: &[T]) -> (i64, Vec<T>) {
        let matching: Vec<T> = records
            .iter()
            .filter(|r| {
                self.predicate
                    .as_ref()
                    .map_or(true, |p| p.matches(self.scope, *r))
            })
            .cloned()
            .collect();
        let total = matching.len() as i64;
        (total, self.ordering.apply(matching))
    }
}
