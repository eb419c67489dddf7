//! Number generation, tax, verification, and draw statistics for the
//! Korean Lotto 6/45, plus the SQLite store and draw-data client that
//! feed them.

pub mod api;
pub mod config;
pub mod database;
pub mod favorites;
pub mod random;
pub mod reports;
pub mod statistics;
pub mod strategy;
pub mod tax;
pub mod types;
pub mod utils;
pub mod verify;

pub use strategy::Strategy;
pub use tax::compute_tax;
pub use types::{Draw, LottoError, NumberSet, PrizeTier, TaxBreakdown, VerificationResult};
pub use verify::verify;
