//! Concurrency behaviour of the rating pipeline, run against in-memory sources.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use vacation_rater::error::{FetchError, RaterError, Stage};
use vacation_rater::fetch::ForecastSource;
use vacation_rater::forecast::{Condition, DayForecast, ForecastDocument, HourlyReading};
use vacation_rater::pipeline::{collect_stats, rate_cities};

// =============================================================================
// Test Helpers
// =============================================================================

fn day(d: u32, temp: f64, rainy_hours: usize) -> DayForecast {
    DayForecast {
        date: NaiveDate::from_ymd_opt(2022, 5, d).unwrap(),
        hours: (9..=19u8)
            .enumerate()
            .map(|(i, hour)| HourlyReading {
                hour,
                temperature: temp,
                condition: if i < rainy_hours {
                    Condition::Rain
                } else {
                    Condition::from("clear")
                },
            })
            .collect(),
    }
}

fn document(name: &str, temp: f64, rainy_hours: usize) -> ForecastDocument {
    ForecastDocument {
        city_display_name: name.to_string(),
        days: vec![day(26, temp, rainy_hours), day(27, temp, rainy_hours)],
    }
}

enum Behaviour {
    Answer(ForecastDocument),
    Fail(fn() -> FetchError),
    Panic,
}

struct ScriptedSource {
    script: HashMap<String, (Duration, Behaviour)>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: Vec<(&str, u64, Behaviour)>) -> Self {
        Self {
            script: script
                .into_iter()
                .map(|(city, ms, b)| (city.to_string(), (Duration::from_millis(ms), b)))
                .collect(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ForecastSource for ScriptedSource {
    async fn fetch(&self, city: &str) -> Result<ForecastDocument, FetchError> {
        let (delay, behaviour) = self
            .script
            .get(city)
            .ok_or_else(|| FetchError::MalformedDocument(format!("unknown city {city}")))?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(*delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let result = match behaviour {
            Behaviour::Answer(doc) => Ok(doc.clone()),
            Behaviour::Fail(make) => Err(make()),
            Behaviour::Panic => panic!("source blew up for {city}"),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

fn names(cities: &[&str]) -> Vec<String> {
    cities.iter().map(|c| c.to_string()).collect()
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test]
async fn test_results_follow_city_list_not_completion_order() {
    // Later cities finish first.
    let source = Arc::new(ScriptedSource::new(vec![
        ("A", 120, Behaviour::Answer(document("Alpha", 15.0, 3))),
        ("B", 80, Behaviour::Answer(document("Bravo", 15.0, 3))),
        ("C", 40, Behaviour::Answer(document("Charlie", 15.0, 3))),
        ("D", 0, Behaviour::Answer(document("Delta", 10.0, 0))),
    ]));

    let collected = collect_stats(source.clone(), &names(&["A", "B", "C", "D"]), 4)
        .await
        .unwrap();
    let order: Vec<_> = collected.iter().map(|c| c.display_name.as_str()).collect();
    assert_eq!(order, vec!["Alpha", "Bravo", "Charlie", "Delta"]);
    assert_eq!(collected[0].requested, "A");

    let report = rate_cities(source, &names(&["A", "B", "C", "D"]), 4)
        .await
        .unwrap();
    let tied: Vec<_> = report.rated.ranking.descending().next().unwrap().1.to_vec();
    assert_eq!(tied, names(&["Alpha", "Bravo", "Charlie"]));
}

#[tokio::test]
async fn test_output_identical_under_different_timings() {
    let cities = names(&["A", "B", "C"]);
    let fast_first = Arc::new(ScriptedSource::new(vec![
        ("A", 0, Behaviour::Answer(document("Alpha", 12.3, 1))),
        ("B", 30, Behaviour::Answer(document("Bravo", 12.3, 1))),
        ("C", 60, Behaviour::Answer(document("Charlie", 20.0, 5))),
    ]));
    let slow_first = Arc::new(ScriptedSource::new(vec![
        ("A", 60, Behaviour::Answer(document("Alpha", 12.3, 1))),
        ("B", 30, Behaviour::Answer(document("Bravo", 12.3, 1))),
        ("C", 0, Behaviour::Answer(document("Charlie", 20.0, 5))),
    ]));

    let first = rate_cities(fast_first, &cities, 3).await.unwrap();
    let second = rate_cities(slow_first, &cities, 3).await.unwrap();

    assert_eq!(first.rows, second.rows);
    assert_eq!(first.fields, second.fields);
}

// =============================================================================
// Concurrency limit
// =============================================================================

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let script = (0..6)
        .map(|i| {
            let city: &'static str = ["A", "B", "C", "D", "E", "F"][i];
            (city, 30, Behaviour::Answer(document(city, 10.0 + i as f64, 0)))
        })
        .collect();
    let source = Arc::new(ScriptedSource::new(script));

    let collected = collect_stats(source.clone(), &names(&["A", "B", "C", "D", "E", "F"]), 2)
        .await
        .unwrap();

    assert_eq!(collected.len(), 6);
    assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert_eq!(source.completed.load(Ordering::SeqCst), 6);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failure_aborts_siblings() {
    let source = Arc::new(ScriptedSource::new(vec![
        ("SLOW1", 10_000, Behaviour::Answer(document("Slow1", 10.0, 0))),
        (
            "BROKEN",
            0,
            Behaviour::Fail(|| FetchError::SourceUnavailable("connection refused".into())),
        ),
        ("SLOW2", 10_000, Behaviour::Answer(document("Slow2", 10.0, 0))),
    ]));

    let started = Instant::now();
    let err = rate_cities(source.clone(), &names(&["SLOW1", "BROKEN", "SLOW2"]), 3)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(err, RaterError::SourceUnavailable { ref city, .. } if city == "BROKEN"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    // only the failing fetch ever completed
    assert_eq!(source.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_document_fails_run() {
    let source = Arc::new(ScriptedSource::new(vec![
        ("A", 0, Behaviour::Answer(document("Alpha", 15.0, 3))),
        (
            "B",
            10,
            Behaviour::Fail(|| FetchError::MalformedDocument("missing forecasts".into())),
        ),
    ]));

    let err = rate_cities(source, &names(&["A", "B"]), 2).await.unwrap_err();
    assert!(matches!(err, RaterError::MalformedDocument { .. }));
    assert_eq!(err.city(), "B");
}

#[tokio::test]
async fn test_panicking_task_reports_city() {
    let source = Arc::new(ScriptedSource::new(vec![
        ("A", 0, Behaviour::Answer(document("Alpha", 15.0, 3))),
        ("B", 0, Behaviour::Panic),
    ]));

    let err = collect_stats(source, &names(&["A", "B"]), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, RaterError::TaskFailed { ref city, .. } if city == "B"));
}

#[tokio::test]
async fn test_city_without_complete_days_fails_aggregation() {
    let mut partial = document("Partial", 15.0, 0);
    for d in &mut partial.days {
        d.hours.pop();
    }
    let source = Arc::new(ScriptedSource::new(vec![
        ("A", 0, Behaviour::Answer(document("Alpha", 15.0, 3))),
        ("P", 0, Behaviour::Answer(partial)),
    ]));

    let err = rate_cities(source, &names(&["A", "P"]), 2).await.unwrap_err();
    assert!(matches!(err, RaterError::EmptyCityData { ref city } if city == "Partial"));
}

#[tokio::test]
async fn test_two_cities_reporting_one_name_fail_before_aggregation() {
    let source = Arc::new(ScriptedSource::new(vec![
        ("A", 0, Behaviour::Answer(document("Alpha", 15.0, 3))),
        ("TWIN1", 0, Behaviour::Answer(document("Twin", 15.0, 3))),
        ("TWIN2", 20, Behaviour::Answer(document("Twin", 12.0, 0))),
    ]));

    let err = rate_cities(source, &names(&["A", "TWIN1", "TWIN2"]), 3)
        .await
        .unwrap_err();

    assert!(matches!(err, RaterError::MalformedDocument { .. }));
    assert_eq!(err.city(), "TWIN2");
    assert_eq!(err.stage(), Stage::Fetch);
    let message = err.to_string();
    assert!(message.contains("TWIN1"), "{message}");
    assert!(message.contains("\"Twin\""), "{message}");
}
