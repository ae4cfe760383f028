//! # Tarifa - Tariff-period consumption summaries
//!
//! Classifies hourly electricity meter readings into the Spanish 2.0TD
//! tariff periods (P1 peak, P2 flat, P3 valley), aggregates them into a
//! twelve-month rolling summary and fetches the underlying data from the
//! meter-data provider with a cache fallback for rate-limited days.
//!
//! ## Architecture
//!
//! - `tariff`: Period classification from date, hour, weekends and holidays
//! - `reading`: Reading model with lenient decoding of provider payloads
//! - `aggregate`: Monthly buckets, rolling window and reconciliation
//! - `cache`: Expiring key-value cache with eviction under capacity pressure
//! - `gateway`: Provider interface, fixture gateway and HTTP client
//! - `coordinator`: Live-first retrieval with stale fallback
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod reading;
pub mod tariff;

// Re-export commonly used types
pub use aggregate::{ConsumptionAggregator, ConsumptionSummary, MonthKey};
pub use config::Config;
pub use coordinator::{Provenance, Retrieved, RetrievalCoordinator};
pub use error::{FailureKind, Result, TarifaError};
pub use reading::Reading;
pub use tariff::Period;
