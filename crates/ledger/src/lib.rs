//! `parcel-ledger`: order and shipment record reconciliation.
//!
//! Pure engine crate: receives facts scraped by extractors, merges them into
//! keyed order records, and answers tracking-number lookups.
//! No page scraping or UI dependencies.

pub mod config;
pub mod error;
pub mod ledger;
pub mod lookup;
pub mod matcher;
pub mod model;
pub mod persist;
pub mod reconcile;
pub mod store;
pub mod summary;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::{BatchOutcome, Ledger};
pub use model::{Carrier, Item, ManualEntry, ObservedFact, OrderRecord, Source, TrackingRef};
pub use persist::{JsonFileBackend, MemoryBackend, Persist};
pub use store::LedgerState;
