//! The fetch → reduce → aggregate → rank run.
//!
//! Every city is fetched and reduced in its own task; at most `concurrency`
//! fetches are in flight. Aggregation starts only once every task has
//! reported. Results are ordered by the city list, never by completion
//! order. The first failure aborts the remaining tasks and the run.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info};

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::report::{ReportRow, build_rows, field_order};
use crate::analyzers::types::Rated;
use crate::error::RaterError;
use crate::fetch::ForecastSource;
use crate::stats::{DailyCityStat, reduce};

/// Reduced forecast of one city.
#[derive(Debug, Clone, PartialEq)]
pub struct CityStats {
    /// Name the city was requested under.
    pub requested: String,
    /// Name the forecast document reports; the key used from here on.
    pub display_name: String,
    pub stats: Vec<DailyCityStat>,
}

/// Everything a writer needs, plus the aggregates behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingReport {
    pub rated: Rated,
    pub rows: Vec<ReportRow>,
    pub fields: Vec<String>,
}

/// Fetches and reduces every city concurrently.
///
/// The returned vector follows the order of `cities`.
#[tracing::instrument(skip(source, cities), fields(cities = cities.len()))]
pub async fn collect_stats<S>(
    source: Arc<S>,
    cities: &[String],
    concurrency: usize,
) -> Result<Vec<CityStats>, RaterError>
where
    S: ForecastSource + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut task_cities = HashMap::new();

    for (index, city) in cities.iter().enumerate() {
        let source = source.clone();
        let sem = semaphore.clone();
        let city = city.clone();
        let city_span = tracing::info_span!("process_city", city = %city);

        let handle = tasks.spawn(
            async move {
                let Ok(_permit) = sem.acquire().await else {
                    return Err(RaterError::TaskFailed {
                        city,
                        reason: "concurrency limiter closed".to_string(),
                    });
                };

                let doc = source
                    .fetch(&city)
                    .await
                    .map_err(|e| RaterError::from_fetch(&city, e))?;
                let stats = reduce(&doc);

                Ok((
                    index,
                    CityStats {
                        requested: city,
                        display_name: doc.city_display_name,
                        stats,
                    },
                ))
            }
            .instrument(city_span),
        );
        task_cities.insert(handle.id(), index);
    }

    let mut slots: Vec<Option<CityStats>> = vec![None; cities.len()];

    while let Some(joined) = tasks.join_next_with_id().await {
        let outcome = match joined {
            Ok((_, outcome)) => outcome,
            Err(join_err) => {
                let city = task_cities
                    .get(&join_err.id())
                    .map(|&i| cities[i].clone())
                    .unwrap_or_default();
                Err(RaterError::TaskFailed {
                    city,
                    reason: join_err.to_string(),
                })
            }
        };

        match outcome {
            Ok((index, city_stats)) => slots[index] = Some(city_stats),
            Err(e) => {
                error!(city = %e.city(), stage = %e.stage(), error = %e, "City failed, aborting run");
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    slots
        .into_iter()
        .zip(cities)
        .map(|(slot, city)| {
            slot.ok_or_else(|| RaterError::TaskFailed {
                city: city.clone(),
                reason: "task finished without a result".to_string(),
            })
        })
        .collect()
}

/// Rejects two requested cities whose documents report the same name, since
/// every later stage is keyed by that name.
fn check_display_names(collected: &[CityStats]) -> Result<(), RaterError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for city in collected {
        if let Some(first) = seen.insert(&city.display_name, &city.requested) {
            return Err(RaterError::MalformedDocument {
                city: city.requested.clone(),
                reason: format!(
                    "reports city name {:?}, already reported by {first}",
                    city.display_name
                ),
            });
        }
    }
    Ok(())
}

/// Runs the whole pipeline over `cities` and returns the ranked report.
#[tracing::instrument(skip(source, cities), fields(cities = cities.len()))]
pub async fn rate_cities<S>(
    source: Arc<S>,
    cities: &[String],
    concurrency: usize,
) -> Result<RatingReport, RaterError>
where
    S: ForecastSource + 'static,
{
    let collected = collect_stats(source, cities, concurrency).await?;
    check_display_names(&collected)?;

    let order: Vec<String> = collected.iter().map(|c| c.display_name.clone()).collect();
    let stats: Vec<DailyCityStat> = collected.into_iter().flat_map(|c| c.stats).collect();

    let rated = aggregate(&order, &stats)?;
    let rows = build_rows(&rated.aggregates, &rated.ranking);
    let fields = field_order(&rows);

    info!(cities = rated.aggregates.len(), rows = rows.len(), "Rating complete");

    Ok(RatingReport {
        rated,
        rows,
        fields,
    })
}
