//! Comparables analysis module - pure valuation pipeline from comparable
//! sales to a confidence-rated ARV estimate

pub mod adjustments;
pub mod analyzer;
pub mod arv;
pub mod config;
pub mod input;
pub mod report;
pub mod similarity;
pub mod types;

pub use types::*;
