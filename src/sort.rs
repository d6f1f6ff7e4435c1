// 🔀 Sort Engine - Ordered copies of currency records
//
// Pure functions: the input slice is never touched, a new Vec is returned.
// Uses a stable sort, and `desc` flips the comparator instead of reversing
// the output, so equal keys keep their input order in both directions.

use crate::dataset::CurrencyRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// SORT KEY & DIRECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Currency,
    Amount,
}

impl SortKey {
    pub const ALL: [SortKey; 2] = [SortKey::Currency, SortKey::Amount];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Currency => "currency",
            SortKey::Amount => "amount",
        }
    }

    /// Column title used by table renderers.
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Currency => "Currency",
            SortKey::Amount => "Amount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SortError {
    #[error("unknown sort key {0:?}, expected \"currency\" or \"amount\"")]
    UnknownKey(String),

    #[error("unknown sort order {0:?}, expected \"asc\" or \"desc\"")]
    UnknownOrder(String),
}

/// Exact, case-sensitive match.
impl FromStr for SortKey {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "currency" => Ok(SortKey::Currency),
            "amount" => Ok(SortKey::Amount),
            other => Err(SortError::UnknownKey(other.to_string())),
        }
    }
}

/// Exact, case-sensitive match. Callers wanting case-insensitivity lower-case first.
impl FromStr for SortOrder {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(SortError::UnknownOrder(other.to_string())),
        }
    }
}

// ============================================================================
// COMPARATORS
// ============================================================================

/// Collation for currency codes: case-insensitive first, then lower case
/// before upper case when two codes differ only in case.
pub fn collate(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));

    // uppercase sorts below lowercase bytewise, so compare swapped
    primary.then_with(|| b.cmp(a))
}

fn compare(a: &CurrencyRecord, b: &CurrencyRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Currency => collate(&a.currency, &b.currency),
        SortKey::Amount => a.amount.total_cmp(&b.amount),
    }
}

// ============================================================================
// SORT
// ============================================================================

/// Return a newly ordered copy of `records`.
pub fn sort_records(
    records: &[CurrencyRecord],
    key: SortKey,
    order: SortOrder,
) -> Vec<CurrencyRecord> {
    let mut sorted = records.to_vec();

    sorted.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    sorted
}

/// String-driven entry point. Unknown keys or orders are errors, never a
/// silent pass-through of unsorted data.
pub fn sort_by_name(
    records: &[CurrencyRecord],
    key: &str,
    order: &str,
) -> Result<Vec<CurrencyRecord>, SortError> {
    let key: SortKey = key.parse()?;
    let order: SortOrder = order.parse()?;
    Ok(sort_records(records, key, order))
}

// ============================================================================
// TESTS
// ============================================================================
