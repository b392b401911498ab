//! Report rows: the ranked, rendering-ready form of the aggregates.
//!
//! Every city yields two adjacent rows, temperature first and clear hours
//! second. Only the first carries the city name and the rank.

use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::warn;

use crate::analyzers::rating::RankingIndex;
use crate::analyzers::types::{CityAggregate, RowLabel};
use crate::analyzers::utility::export_round1;

pub const CITY_FIELD: &str = "city/day";
pub const LABEL_FIELD: &str = "";
pub const AVERAGE_FIELD: &str = "average";
pub const RANK_FIELD: &str = "rank";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single report cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    /// Already rounded to one decimal; rendered with one decimal.
    Decimal(f64),
    Count(u64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Decimal(v) => write!(f, "{v:.1}"),
            Cell::Count(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_none(),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Decimal(v) => serializer.serialize_f64(*v),
            Cell::Count(n) => serializer.serialize_u64(*n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub city: Option<String>,
    pub label: RowLabel,
    pub values: BTreeMap<NaiveDate, Cell>,
    pub average: Cell,
    pub rank: Option<usize>,
}

impl ReportRow {
    /// The cell under `field`, [`Cell::Empty`] if the row has none.
    pub fn cell(&self, field: &str) -> Cell {
        match field {
            CITY_FIELD => self.city.clone().map_or(Cell::Empty, Cell::Text),
            LABEL_FIELD => Cell::Text(self.label.as_str().to_string()),
            AVERAGE_FIELD => self.average.clone(),
            RANK_FIELD => self.rank.map_or(Cell::Empty, |r| Cell::Count(r as u64)),
            other => NaiveDate::parse_from_str(other, DATE_FORMAT)
                .ok()
                .and_then(|d| self.values.get(&d).cloned())
                .unwrap_or(Cell::Empty),
        }
    }

    pub fn cells(&self, fields: &[String]) -> Vec<Cell> {
        fields.iter().map(|f| self.cell(f)).collect()
    }

    /// A view of the row that serializes as a map with keys in `fields` order.
    pub fn ordered<'a>(&'a self, fields: &'a [String]) -> OrderedRow<'a> {
        OrderedRow { row: self, fields }
    }
}

pub struct OrderedRow<'a> {
    row: &'a ReportRow,
    fields: &'a [String],
}

impl Serialize for OrderedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in self.fields {
            map.serialize_entry(field, &self.row.cell(field))?;
        }
        map.end()
    }
}

/// Builds the ranked row sequence.
///
/// Scores are visited from highest to lowest; the rank starts at 1 and
/// advances once per distinct score. Cities inside a bucket keep bucket order.
pub fn build_rows(aggregates: &[CityAggregate], ranking: &RankingIndex) -> Vec<ReportRow> {
    let by_city: HashMap<&str, &CityAggregate> =
        aggregates.iter().map(|a| (a.city.as_str(), a)).collect();

    let mut rows = Vec::with_capacity(aggregates.len() * 2);

    for (rank, score, cities) in ranking.ranked() {
        for city in cities {
            let Some(aggregate) = by_city.get(city.as_str()) else {
                warn!(city = %city, score, "Ranked city has no aggregate, skipping");
                continue;
            };

            rows.push(ReportRow {
                city: Some(city.clone()),
                label: RowLabel::AverageTemperature,
                values: aggregate
                    .per_day
                    .iter()
                    .map(|(date, day)| (*date, Cell::Decimal(export_round1(day.avg_temp))))
                    .collect(),
                average: Cell::Decimal(export_round1(aggregate.overall_average_temp)),
                rank: Some(rank),
            });
            rows.push(ReportRow {
                city: None,
                label: RowLabel::ClearHours,
                values: aggregate
                    .per_day
                    .iter()
                    .map(|(date, day)| (*date, Cell::Count(u64::from(day.clear_hours))))
                    .collect(),
                average: Cell::Decimal(export_round1(aggregate.overall_average_clear_hours)),
                rank: None,
            });
        }
    }

    rows
}

/// Column order for the writers: city, label, every date in ascending order,
/// average, rank.
pub fn field_order(rows: &[ReportRow]) -> Vec<String> {
    let dates: BTreeSet<NaiveDate> = rows.iter().flat_map(|r| r.values.keys().copied()).collect();

    let mut fields = Vec::with_capacity(dates.len() + 4);
    fields.push(CITY_FIELD.to_string());
    fields.push(LABEL_FIELD.to_string());
    fields.extend(dates.iter().map(|d| d.format(DATE_FORMAT).to_string()));
    fields.push(AVERAGE_FIELD.to_string());
    fields.push(RANK_FIELD.to_string());
    fields
}
