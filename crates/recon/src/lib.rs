//! `scoutmerge-recon`: cross-source football player reconciliation.
//!
//! Pure engine crate: receives pre-loaded player tables from a game-rating
//! source (A) and a market-valuation source (B), links records that describe
//! the same person and returns merged + unresolved tables.
//! No CLI or filesystem dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod fuzzy;
pub mod load;
pub mod matcher;
pub mod model;
pub mod normalize;

pub use config::ReconciliationConfig;
pub use engine::{reconcile, run};
pub use error::ReconError;
pub use model::{MergedRecord, PlayerRecordA, PlayerRecordB, ReconInput, ReconOutput};
pub use normalize::normalize;
