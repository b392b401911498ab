//! Data types used by the aggregation and ranking stages.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::analyzers::rating::RankingIndex;

/// Figures of one city for one day, kept in both display and raw form.
#[derive(Debug, Clone, PartialEq)]
pub struct DayFigures {
    /// Average temperature truncated toward zero.
    pub avg_temp_display: i64,
    /// Clear hours truncated toward zero.
    pub clear_hours_display: i64,
    /// Unrounded daytime average temperature.
    pub avg_temp: f64,
    pub clear_hours: u32,
}

/// Finalized per-city aggregate over all complete days.
#[derive(Debug, Clone, PartialEq)]
pub struct CityAggregate {
    pub city: String,
    pub per_day: BTreeMap<NaiveDate, DayFigures>,
    pub overall_average_temp: f64,
    pub overall_average_clear_hours: f64,
    pub score: i64,
}

/// Output of the aggregation stage: every city's aggregate plus the score buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct Rated {
    /// Aggregates in canonical city order.
    pub aggregates: Vec<CityAggregate>,
    pub ranking: RankingIndex,
}

/// Which series a report row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLabel {
    AverageTemperature,
    ClearHours,
}

impl RowLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowLabel::AverageTemperature => "average temperature",
            RowLabel::ClearHours => "clear hours",
        }
    }
}
