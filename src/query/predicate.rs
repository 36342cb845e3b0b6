//! Predicate building.
//!
//! A [`Predicate`] is a conjunction of simple comparisons over logical
//! fields. It is storage-agnostic: the SQL backend renders it into a
//! `WHERE` clause, the in-memory and flat-file backends evaluate it against
//! records through [`Filterable`].

use std::cmp::Ordering as CmpOrdering;

use chrono::{DateTime, Utc};

use super::criteria::Criteria;
use crate::model::Period;

/// Entity a predicate is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    HrdGap,
    VmuGap,
    Replay,
}

/// Logical filter fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Timestamp,
    Channel,
    Record,
    Source,
    Status,
    Corrupted,
    Completed,
}

impl Scope {
    pub fn name(&self) -> &'static str {
        match self {
            Scope::HrdGap => "hrd_gap",
            Scope::VmuGap => "vmu_gap",
            Scope::Replay => "replay",
        }
    }

    /// Fields this scope can be filtered on.
    pub fn filters(&self) -> &'static [Field] {
        match self {
            Scope::HrdGap => &[
                Field::Timestamp,
                Field::Channel,
                Field::Corrupted,
                Field::Completed,
            ],
            Scope::VmuGap => &[
                Field::Timestamp,
                Field::Record,
                Field::Source,
                Field::Corrupted,
                Field::Completed,
            ],
            Scope::Replay => &[Field::Timestamp, Field::Status],
        }
    }

    pub fn supports(&self, field: Field) -> bool {
        self.filters().contains(&field)
    }

    /// Column a logical field binds to in this scope.
    pub fn column(&self, field: Field) -> &'static str {
        match (self, field) {
            (_, Field::Timestamp) => "timestamp",
            (_, Field::Channel) => "channel",
            (Scope::VmuGap, Field::Record) => "phase",
            (_, Field::Record) => "record",
            (_, Field::Source) => "source",
            (_, Field::Status) => "status",
            (_, Field::Corrupted) => "corrupted",
            (_, Field::Completed) => "completed",
        }
    }

    /// Columns results can be ordered by.
    pub fn sortable(&self) -> &'static [&'static str] {
        match self {
            Scope::HrdGap => &[
                "id",
                "timestamp",
                "last_timestamp",
                "last_sequence_count",
                "next_timestamp",
                "next_sequence_count",
                "channel",
                "replay_id",
                "corrupted",
                "completed",
            ],
            Scope::VmuGap => &[
                "id",
                "timestamp",
                "last_timestamp",
                "last_sequence_count",
                "next_timestamp",
                "next_sequence_count",
                "source",
                "phase",
                "replay_id",
                "corrupted",
                "completed",
            ],
            Scope::Replay => &[
                "id",
                "timestamp",
                "startdate",
                "enddate",
                "priority",
                "comment",
                "status",
                "automatic",
                "cancellable",
                "corrupted",
                "missing",
            ],
        }
    }
}

/// A typed comparison operand.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
    Time(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gte,
    Lte,
}

impl Comparison {
    fn holds(&self, ordering: CmpOrdering) -> bool {
        match self {
            Comparison::Eq => ordering == CmpOrdering::Equal,
            Comparison::Gte => ordering != CmpOrdering::Less,
            Comparison::Lte => ordering != CmpOrdering::Greater,
        }
    }
}

/// Conjunctive predicate tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Compare {
        field: Field,
        op: Comparison,
        value: Value,
    },
    And(Vec<Predicate>),
}

/// Records that can be filtered and sorted in memory.
pub trait Filterable {
    /// Value of the named column, if the record has it.
    fn column(&self, name: &str) -> Option<Value>;
}

impl Predicate {
    pub fn eq(field: Field, value: Value) -> Self {
        Predicate::Compare {
            field,
            op: Comparison::Eq,
            value,
        }
    }

    pub fn gte(field: Field, value: Value) -> Self {
        Predicate::Compare {
            field,
            op: Comparison::Gte,
            value,
        }
    }

    pub fn lte(field: Field, value: Value) -> Self {
        Predicate::Compare {
            field,
            op: Comparison::Lte,
            value,
        }
    }

    /// Conjoin two predicates, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Predicate {
        let mut terms = self.into_conjuncts();
        terms.extend(other.into_conjuncts());
        Predicate::And(terms)
    }

    fn into_conjuncts(self) -> Vec<Predicate> {
        match self {
            Predicate::And(terms) => terms,
            single => vec![single],
        }
    }

    /// The flat list of comparisons this predicate is made of.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Predicate::And(terms) => terms.iter().flat_map(|t| t.conjuncts()).collect(),
            single => vec![single],
        }
    }

    /// Evaluate against a record of the given scope.
    pub fn matches<R: Filterable>(&self, scope: Scope, record: &R) -> bool {
        match self {
            Predicate::And(terms) => terms.iter().all(|t| t.matches(scope, record)),
            Predicate::Compare { field, op, value } => record
                .column(scope.column(*field))
                .and_then(|actual| compare(&actual, value))
                .is_some_and(|ordering| op.holds(ordering)),
        }
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<CmpOrdering> {
    match (actual, expected) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Temporal predicate on the scope's timestamp column.
///
/// Each combination of present endpoints yields its own shape; an unbounded
/// period yields no predicate at all.
pub fn date_range(period: &Period) -> Option<Predicate> {
    match (period.starts, period.ends) {
        (None, None) => None,
        (None, Some(ends)) => Some(Predicate::lte(Field::Timestamp, Value::Time(ends))),
        (Some(starts), None) => Some(Predicate::gte(Field::Timestamp, Value::Time(starts))),
        (Some(starts), Some(ends)) => Some(
            Predicate::gte(Field::Timestamp, Value::Time(starts))
                .and(Predicate::lte(Field::Timestamp, Value::Time(ends))),
        ),
    }
}

/// Build the predicate for `criteria` within `scope`.
///
/// String filters are added only when non-empty. Boolean filters are added
/// only when `false`, pinning the stored flag to `false`; `true` adds
/// nothing so that both values are admitted.
pub fn build(criteria: &Criteria, scope: Scope) -> Option<Predicate> {
    let mut terms: Vec<Predicate> = date_range(&criteria.period)
        .map(Predicate::into_conjuncts)
        .unwrap_or_default();

    let strings = [
        (Field::Channel, &criteria.channel),
        (Field::Record, &criteria.record),
        (Field::Source, &criteria.source),
        (Field::Status, &criteria.status),
    ];
    for (field, raw) in strings {
        if raw.is_empty() || !scope.supports(field) {
            continue;
        }
        let value = match field {
            Field::Source => raw
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(raw.clone())),
            _ => Value::Text(raw.clone()),
        };
        terms.push(Predicate::eq(field, value));
    }

    let flags = [
        (Field::Corrupted, criteria.corrupted),
        (Field::Completed, criteria.completed),
    ];
    for (field, include) in flags {
        if !include && scope.supports(field) {
            terms.push(Predicate::eq(field, Value::Bool(false)));
        }
    }

    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(Predicate::And(terms)),
    }
}
