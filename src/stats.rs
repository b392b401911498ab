use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::analyzers::utility::mean;
use crate::forecast::{DayForecast, ForecastDocument};

/// First hour of the daytime window, inclusive.
pub const HOURS_START: u8 = 9;
/// Last hour of the daytime window, inclusive.
pub const HOURS_END: u8 = 19;
/// Number of readings a complete daytime window holds.
pub const WINDOW_SIZE: usize = (HOURS_END - HOURS_START + 1) as usize;

/// Daytime statistics of one city for one complete day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCityStat {
    pub city: String,
    pub date: NaiveDate,
    pub average_temperature: f64,
    pub clear_hours_count: u32,
}

/// Why a day was left out of the statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The window did not hold exactly [`WINDOW_SIZE`] readings.
    Incomplete { found: usize },
    /// The window held [`WINDOW_SIZE`] readings, but some hour appeared twice.
    DuplicateHours,
}

pub fn in_daytime_window(hour: u8) -> bool {
    (HOURS_START..=HOURS_END).contains(&hour)
}

/// Reduces a forecast document to one [`DailyCityStat`] per complete day.
///
/// Days whose daytime window is not exactly one reading per hour are dropped
/// and logged; they never fail the reduction.
#[tracing::instrument(skip(doc), fields(city = %doc.city_display_name, days = doc.days.len()))]
pub fn reduce(doc: &ForecastDocument) -> Vec<DailyCityStat> {
    let mut stats = Vec::with_capacity(doc.days.len());

    for day in &doc.days {
        match reduce_day(&doc.city_display_name, day) {
            Ok(stat) => stats.push(stat),
            Err(reason) => {
                info!(
                    city = %doc.city_display_name,
                    date = %day.date,
                    ?reason,
                    "Incomplete day discarded"
                );
            }
        }
    }

    debug!(records = stats.len(), "Daily records produced");
    stats
}

/// Computes the statistics of a single day, or the reason it does not qualify.
pub fn reduce_day(city: &str, day: &DayForecast) -> Result<DailyCityStat, DiscardReason> {
    let window: Vec<_> = day
        .hours
        .iter()
        .filter(|h| in_daytime_window(h.hour))
        .collect();

    if window.len() != WINDOW_SIZE {
        return Err(DiscardReason::Incomplete {
            found: window.len(),
        });
    }

    let distinct: HashSet<u8> = window.iter().map(|h| h.hour).collect();
    if distinct.len() != WINDOW_SIZE {
        return Err(DiscardReason::DuplicateHours);
    }

    let temps: Vec<f64> = window.iter().map(|h| h.temperature).collect();
    let clear = window
        .iter()
        .filter(|h| !h.condition.is_precipitation())
        .count();

    Ok(DailyCityStat {
        city: city.to_string(),
        date: day.date,
        average_temperature: mean(&temps),
        clear_hours_count: clear as u32,
    })
}
