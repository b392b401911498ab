use crate::analyzers::rating::RankingIndex;
use crate::analyzers::types::{CityAggregate, DayFigures, Rated};
use crate::analyzers::utility::{display_truncate, score_truncate};
use crate::error::RaterError;
use crate::stats::DailyCityStat;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Accumulates the daily records of a single city.
#[derive(Debug, Clone)]
pub struct CityAccumulator {
    city: String,
    per_day: BTreeMap<NaiveDate, DayFigures>,
}

impl CityAccumulator {
    pub fn new(city: &str) -> Self {
        Self {
            city: city.to_string(),
            per_day: BTreeMap::new(),
        }
    }

    pub fn days(&self) -> usize {
        self.per_day.len()
    }

    /// Folds one daily record in.
    ///
    /// # Errors
    ///
    /// [`RaterError::DuplicateDay`] if a record for the same date was already folded.
    pub fn fold(&mut self, stat: &DailyCityStat) -> Result<(), RaterError> {
        if self.per_day.contains_key(&stat.date) {
            return Err(RaterError::DuplicateDay {
                city: self.city.clone(),
                date: stat.date,
            });
        }

        self.per_day.insert(
            stat.date,
            DayFigures {
                avg_temp_display: display_truncate(stat.average_temperature),
                clear_hours_display: display_truncate(f64::from(stat.clear_hours_count)),
                avg_temp: stat.average_temperature,
                clear_hours: stat.clear_hours_count,
            },
        );
        Ok(())
    }

    /// Computes the overall averages and the score.
    ///
    /// Sums run in date order so the result depends only on which records
    /// were folded, not on the order they arrived in.
    ///
    /// # Errors
    ///
    /// [`RaterError::EmptyCityData`] if no record was folded.
    pub fn finalize(self) -> Result<CityAggregate, RaterError> {
        if self.per_day.is_empty() {
            return Err(RaterError::EmptyCityData { city: self.city });
        }

        let (sum_temp, sum_clear) = self
            .per_day
            .values()
            .fold((0.0, 0.0), |(t, c), day| {
                (t + day.avg_temp, c + f64::from(day.clear_hours))
            });
        let count = self.per_day.len() as f64;

        let overall_average_temp = sum_temp / count;
        let overall_average_clear_hours = sum_clear / count;

        Ok(CityAggregate {
            score: score_truncate(overall_average_temp, overall_average_clear_hours),
            city: self.city,
            per_day: self.per_day,
            overall_average_temp,
            overall_average_clear_hours,
        })
    }
}

/// Aggregates the daily records of every city and buckets the cities by score.
///
/// `cities` is the canonical order: each listed city is finalized and bucketed
/// in that order, followed by cities that only appear in `stats`, in the order
/// they were first seen.
///
/// # Errors
///
/// - [`RaterError::EmptyCityData`] if a listed city has no records.
/// - [`RaterError::DuplicateDay`] if a city has two records for one date.
#[tracing::instrument(skip_all, fields(cities = cities.len(), records = stats.len()))]
pub fn aggregate(cities: &[String], stats: &[DailyCityStat]) -> Result<Rated, RaterError> {
    let mut order: Vec<String> = Vec::with_capacity(cities.len());
    let mut accumulators: HashMap<String, CityAccumulator> = HashMap::new();

    for city in cities {
        if !accumulators.contains_key(city) {
            accumulators.insert(city.clone(), CityAccumulator::new(city));
            order.push(city.clone());
        }
    }

    for stat in stats {
        accumulators
            .entry(stat.city.clone())
            .or_insert_with(|| {
                order.push(stat.city.clone());
                CityAccumulator::new(&stat.city)
            })
            .fold(stat)?;
    }

    let mut aggregates = Vec::with_capacity(order.len());
    let mut ranking = RankingIndex::new();

    for city in order {
        let Some(acc) = accumulators.remove(&city) else {
            continue;
        };
        let days = acc.days();
        let aggregate = acc.finalize()?;

        debug!(
            city = %aggregate.city,
            days,
            avg_temp = aggregate.overall_average_temp,
            avg_clear_hours = aggregate.overall_average_clear_hours,
            score = aggregate.score,
            "City aggregated"
        );

        ranking.insert(aggregate.score, &aggregate.city);
        aggregates.push(aggregate);
    }

    info!(
        cities = aggregates.len(),
        distinct_scores = ranking.descending().count(),
        "Aggregation complete"
    );

    Ok(Rated {
        aggregates,
        ranking,
    })
}
