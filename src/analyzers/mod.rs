//! City aggregation and ranking.
//!
//! This module folds per-day statistics into one aggregate per city,
//! scores each city, buckets cities by score, and turns the buckets
//! into ranked report rows.

pub mod aggregate;
pub mod rating;
pub mod report;
pub mod types;
pub mod utility;
