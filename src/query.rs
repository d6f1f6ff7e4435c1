// 🔎 Query Interface - Sort parameter parsing, validation, dispatch
//
// Two list paths share the Sort Engine:
// - `list`: sortBy/order optional, both-or-neither
// - `sorted`: sortBy/order mandatory, order case-insensitive
//
// The provider is injected at construction; every call is a pure read.

use crate::dataset::{CurrencyDataset, CurrencyProvider, CurrencyRecord, DatasetError};
use crate::sort::{sort_records, SortError, SortKey, SortOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, error, warn};

// ============================================================================
// REQUEST / RESULT TYPES
// ============================================================================

/// Raw query-string parameters, exactly as the caller sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortParams {
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl SortParams {
    pub fn new(sort_by: &str, order: &str) -> Self {
        Self {
            sort_by: Some(sort_by.to_string()),
            order: Some(order.to_string()),
        }
    }

    // Empty strings count as absent
    pub(crate) fn parts(&self) -> (Option<&str>, Option<&str>) {
        let sort_by = self.sort_by.as_deref().filter(|s| !s.is_empty());
        let order = self.order.as_deref().filter(|s| !s.is_empty());
        (sort_by, order)
    }
}

/// A fully parsed sort request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }
}

impl From<SortSpec> for SortParams {
    fn from(spec: SortSpec) -> Self {
        SortParams::new(spec.key.as_str(), spec.order.as_str())
    }
}

/// Records plus the sort that produced their order (`None` = canonical).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordList {
    pub records: Vec<CurrencyRecord>,
    pub sort: Option<SortSpec>,
}

impl RecordList {
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Both sortBy and order parameters are required")]
    MissingParameters,

    #[error("sortBy must be either \"currency\" or \"amount\" (got {0:?})")]
    InvalidSortBy(String),

    #[error("order must be either \"asc\" or \"desc\" (got {0:?})")]
    InvalidOrder(String),

    #[error("Currency {0} not found")]
    NotFound(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl QueryError {
    /// Short error title carried in the `error` field of responses.
    pub fn title(&self) -> &'static str {
        match self {
            QueryError::MissingParameters => "Missing required parameters",
            QueryError::InvalidSortBy(_) => "Invalid sortBy parameter",
            QueryError::InvalidOrder(_) => "Invalid order parameter",
            QueryError::NotFound(_) => "Currency not found",
            QueryError::Unexpected(_) => "Unexpected error",
        }
    }

    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            QueryError::MissingParameters
                | QueryError::InvalidSortBy(_)
                | QueryError::InvalidOrder(_)
        )
    }
}

impl From<SortError> for QueryError {
    fn from(err: SortError) -> Self {
        match err {
            SortError::UnknownKey(key) => QueryError::InvalidSortBy(key),
            SortError::UnknownOrder(order) => QueryError::InvalidOrder(order),
        }
    }
}

impl From<DatasetError> for QueryError {
    fn from(err: DatasetError) -> Self {
        QueryError::Unexpected(err.to_string())
    }
}

// ============================================================================
// QUERY SERVICE
// ============================================================================

#[derive(Debug, Clone)]
pub struct CurrencyQuery<P = CurrencyDataset> {
    provider: P,
}

impl Default for CurrencyQuery<CurrencyDataset> {
    fn default() -> Self {
        Self::new(CurrencyDataset::canonical())
    }
}

impl<P: CurrencyProvider> CurrencyQuery<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// All records, sorted only when both `sortBy` and `order` are given.
    ///
    /// With exactly one of the two the canonical order is returned. Values are
    /// matched case-sensitively; a recognised pair is required once both are
    /// present.
    pub fn list(&self, params: &SortParams) -> Result<RecordList, QueryError> {
        let spec = match params.parts() {
            (Some(sort_by), Some(order)) => {
                let key: SortKey = sort_by.parse()?;
                let order: SortOrder = order.parse()?;
                Some(SortSpec::new(key, order))
            }
            (None, None) => None,
            (sort_by, order) => {
                debug!(?sort_by, ?order, "partial sort parameters, returning canonical order");
                None
            }
        };

        let records = self.load()?;
        Ok(self.apply(records, spec))
    }

    /// Sorted records; both parameters mandatory, `order` case-insensitive.
    pub fn sorted(&self, params: &SortParams) -> Result<RecordList, QueryError> {
        let spec = validate(params).map_err(|err| {
            warn!(error = %err, "rejected sort request");
            err
        })?;

        let records = self.load()?;
        Ok(self.apply(records, Some(spec)))
    }

    /// Distinct currency codes in first-occurrence order.
    pub fn currencies(&self) -> Result<Vec<String>, QueryError> {
        let records = self.load()?;

        let mut seen = HashSet::new();
        let codes = records
            .into_iter()
            .map(|r| r.currency)
            .filter(|code| seen.insert(code.clone()))
            .collect();

        Ok(codes)
    }

    /// Single record by currency code, any case.
    pub fn lookup(&self, code: &str) -> Result<CurrencyRecord, QueryError> {
        self.load()?
            .into_iter()
            .find(|r| r.currency.eq_ignore_ascii_case(code))
            .ok_or_else(|| QueryError::NotFound(code.to_uppercase()))
    }

    pub fn is_supported(&self, code: &str) -> Result<bool, QueryError> {
        match self.lookup(code) {
            Ok(_) => Ok(true),
            Err(QueryError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn load(&self) -> Result<Vec<CurrencyRecord>, QueryError> {
        self.provider.records().map_err(|err| {
            error!(error = %err, "failed to read currency dataset");
            QueryError::from(err)
        })
    }

    fn apply(&self, records: Vec<CurrencyRecord>, spec: Option<SortSpec>) -> RecordList {
        match spec {
            Some(spec) => {
                debug!(
                    key = %spec.key,
                    order = %spec.order,
                    count = records.len(),
                    "sorting records"
                );
                RecordList {
                    records: sort_records(&records, spec.key, spec.order),
                    sort: Some(spec),
                }
            }
            None => RecordList { records, sort: None },
        }
    }
}

/// Strict parameter check: presence, then sortBy, then order.
pub fn validate(params: &SortParams) -> Result<SortSpec, QueryError> {
    let (Some(sort_by), Some(order)) = params.parts() else {
        return Err(QueryError::MissingParameters);
    };

    let key: SortKey = sort_by.parse()?;
    let order: SortOrder = order.to_lowercase().parse()?;

    Ok(SortSpec::new(key, order))
}

// ============================================================================
// TESTS
// ============================================================================
