// Currency Grid - Core Library
// Exposes the dataset, sort engine and query layer for the API server,
// the table client, and tests

pub mod config;
pub mod dataset;
pub mod format;
pub mod query;
pub mod sort;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "tui")]
pub mod client;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use config::{ClientConfig, ServerConfig};
pub use dataset::{CurrencyDataset, CurrencyProvider, CurrencyRecord, DatasetError};
pub use format::{format_amount, parse_display_amount};
pub use query::{validate, CurrencyQuery, QueryError, RecordList, SortParams, SortSpec};
pub use sort::{collate, sort_by_name, sort_records, SortError, SortKey, SortOrder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a stderr `tracing` subscriber; `RUST_LOG` overrides `default_filter`.
pub fn init_logging(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
