// 💱 Currency Dataset - Fixed, read-only records
//
// The dataset is built once at startup and never mutated.
// Every read hands out a fresh copy; the backing slice is shared through an Arc.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// CURRENCY RECORD
// ============================================================================

/// One row of the currency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyRecord {
    /// Stable identity, unique and positive
    pub id: u32,

    /// Three-letter uppercase code (AUD, EUR, ...)
    pub currency: String,

    /// Numeric value used for amount ordering
    pub amount: f64,

    /// Locale-formatted amount, presentation only
    pub display_amount: String,

    /// Human-readable region name
    pub locality: String,
}

impl CurrencyRecord {
    pub fn new(
        id: u32,
        currency: &str,
        amount: f64,
        display_amount: &str,
        locality: &str,
    ) -> Self {
        Self {
            id,
            currency: currency.to_string(),
            amount,
            display_amount: display_amount.to_string(),
            locality: locality.to_string(),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("record id must be positive (currency {currency})")]
    InvalidId { currency: String },

    #[error("duplicate record id {0}")]
    DuplicateId(u32),

    #[error("record {id}: currency code {code:?} is not three uppercase letters")]
    InvalidCode { id: u32, code: String },

    #[error("duplicate currency code {0}")]
    DuplicateCurrency(String),

    #[error("record {id}: amount {amount} must be finite and non-negative")]
    InvalidAmount { id: u32, amount: f64 },

    #[error("dataset unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// PROVIDER
// ============================================================================

/// Read-only source of currency records, injected into the query layer.
pub trait CurrencyProvider: Send + Sync {
    /// Records in canonical (insertion) order, as a fresh copy.
    fn records(&self) -> Result<Vec<CurrencyRecord>, DatasetError>;
}

impl<P: CurrencyProvider + ?Sized> CurrencyProvider for Arc<P> {
    fn records(&self) -> Result<Vec<CurrencyRecord>, DatasetError> {
        (**self).records()
    }
}

// ============================================================================
// DATASET
// ============================================================================

#[derive(Debug, Clone)]
pub struct CurrencyDataset {
    records: Arc<[CurrencyRecord]>,
}

impl CurrencyDataset {
    /// Build a dataset, checking identity and value invariants on every record.
    pub fn new(records: Vec<CurrencyRecord>) -> Result<Self, DatasetError> {
        validate_records(&records)?;
        Ok(Self {
            records: records.into(),
        })
    }

    /// The four hardcoded records the service ships with.
    pub fn canonical() -> Self {
        Self {
            records: canonical_records().into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrow the canonical order without copying.
    pub fn as_slice(&self) -> &[CurrencyRecord] {
        &self.records
    }
}

impl Default for CurrencyDataset {
    fn default() -> Self {
        Self::canonical()
    }
}

impl CurrencyProvider for CurrencyDataset {
    fn records(&self) -> Result<Vec<CurrencyRecord>, DatasetError> {
        Ok(self.records.to_vec())
    }
}

fn canonical_records() -> Vec<CurrencyRecord> {
    vec![
        CurrencyRecord::new(1, "AUD", 1100.00, "1,100.00", "Australia"),
        CurrencyRecord::new(2, "MYR", 899.00, "899.00", "Malaysia"),
        CurrencyRecord::new(3, "GBP", 56000.00, "56,000.00", "United Kingdom"),
        CurrencyRecord::new(4, "EUR", 5388.00, "5.388,00", "European Union"),
    ]
}

fn validate_records(records: &[CurrencyRecord]) -> Result<(), DatasetError> {
    let mut ids = HashSet::new();
    let mut codes = HashSet::new();

    for record in records {
        if record.id == 0 {
            return Err(DatasetError::InvalidId {
                currency: record.currency.clone(),
            });
        }
        if !ids.insert(record.id) {
            return Err(DatasetError::DuplicateId(record.id));
        }

        let code_ok = record.currency.len() == 3
            && record.currency.chars().all(|c| c.is_ascii_uppercase());
        if !code_ok {
            return Err(DatasetError::InvalidCode {
                id: record.id,
                code: record.currency.clone(),
            });
        }
        if !codes.insert(record.currency.as_str()) {
            return Err(DatasetError::DuplicateCurrency(record.currency.clone()));
        }

        if !record.amount.is_finite() || record.amount < 0.0 {
            return Err(DatasetError::InvalidAmount {
                id: record.id,
                amount: record.amount,
            });
        }
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
