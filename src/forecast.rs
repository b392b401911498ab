//! Forecast documents: the provider's JSON layout and its validated form.
//!
//! The provider returns a Yandex-Weather style document. Only the fields the
//! rater needs are modelled; everything else is ignored. [`parse_forecast`]
//! turns raw bytes into a [`ForecastDocument`], rejecting anything that does
//! not fit the schema.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;

use crate::error::FetchError;

/// Weather condition code, as reported by the provider (`clear`, `rain`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Condition {
    Rain,
    Snow,
    Hail,
    Thunderstorm,
    Other(String),
}

impl Condition {
    /// Whether this condition belongs to the precipitation set
    /// (rain, snow, hail, thunderstorm).
    pub fn is_precipitation(&self) -> bool {
        !matches!(self, Condition::Other(_))
    }
}

impl From<String> for Condition {
    fn from(code: String) -> Self {
        match code.as_str() {
            "rain" => Condition::Rain,
            "snow" => Condition::Snow,
            "hail" => Condition::Hail,
            "thunderstorm" => Condition::Thunderstorm,
            _ => Condition::Other(code),
        }
    }
}

impl From<&str> for Condition {
    fn from(code: &str) -> Self {
        Condition::from(code.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyReading {
    pub hour: u8,
    pub temperature: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub hours: Vec<HourlyReading>,
}

/// A validated multi-day forecast for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDocument {
    pub city_display_name: String,
    pub days: Vec<DayForecast>,
}

// Wire layout. Every field is optional so that a missing one is reported by
// name instead of as a generic serde error.

#[derive(Debug, Deserialize)]
struct RawResponse {
    geo_object: Option<RawGeoObject>,
    forecasts: Option<Vec<RawForecast>>,
}

#[derive(Debug, Deserialize)]
struct RawGeoObject {
    province: Option<RawName>,
}

#[derive(Debug, Deserialize)]
struct RawName {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    date: Option<NaiveDate>,
    hours: Option<Vec<RawHour>>,
}

#[derive(Debug, Deserialize)]
struct RawHour {
    hour: Option<RawHourValue>,
    temp: Option<f64>,
    condition: Option<Condition>,
}

/// The provider sends `hour` as a numeric string; plain numbers are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawHourValue {
    Number(i64),
    Text(String),
}

impl RawHourValue {
    fn to_hour(&self) -> Result<u8, String> {
        let value = match self {
            RawHourValue::Number(n) => *n,
            RawHourValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("hour {s:?} is not a number"))?,
        };
        u8::try_from(value)
            .ok()
            .filter(|h| *h <= 23)
            .ok_or_else(|| format!("hour {value} is outside 0-23"))
    }
}

/// Decodes and validates a forecast document from raw JSON bytes.
///
/// # Errors
///
/// Returns [`FetchError::MalformedDocument`] if the bytes are not JSON, a
/// required field is missing, an hour is outside 0-23, or a date repeats.
pub fn parse_forecast(bytes: &[u8]) -> Result<ForecastDocument, FetchError> {
    let raw: RawResponse = serde_json::from_slice(bytes)?;
    validate(raw).map_err(FetchError::MalformedDocument)
}

fn validate(raw: RawResponse) -> Result<ForecastDocument, String> {
    let city_display_name = raw
        .geo_object
        .and_then(|g| g.province)
        .and_then(|p| p.name)
        .ok_or("missing geo_object.province.name")?;

    let forecasts = raw.forecasts.ok_or("missing forecasts")?;

    let mut seen_dates = HashSet::new();
    let mut days = Vec::with_capacity(forecasts.len());

    for (i, forecast) in forecasts.into_iter().enumerate() {
        let date = forecast
            .date
            .ok_or_else(|| format!("forecasts[{i}]: missing date"))?;
        if !seen_dates.insert(date) {
            return Err(format!("forecasts[{i}]: date {date} repeated"));
        }

        let raw_hours = forecast
            .hours
            .ok_or_else(|| format!("forecasts[{i}] ({date}): missing hours"))?;

        let hours = raw_hours
            .into_iter()
            .enumerate()
            .map(|(j, h)| -> Result<HourlyReading, String> {
                let at = format!("forecasts[{i}].hours[{j}]");
                let hour = h
                    .hour
                    .ok_or_else(|| format!("{at}: missing hour"))?
                    .to_hour()
                    .map_err(|e| format!("{at}: {e}"))?;
                Ok(HourlyReading {
                    hour,
                    temperature: h.temp.ok_or_else(|| format!("{at}: missing temp"))?,
                    condition: h
                        .condition
                        .ok_or_else(|| format!("{at}: missing condition"))?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        days.push(DayForecast { date, hours });
    }

    Ok(ForecastDocument {
        city_display_name,
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(forecasts: serde_json::Value) -> Vec<u8> {
        serde_json::json!({
            "geo_object": { "province": { "name": "Moscow" } },
            "forecasts": forecasts,
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_parse_valid_document() {
        let bytes = doc(serde_json::json!([{
            "date": "2022-05-26",
            "hours": [
                { "hour": "9", "temp": 12, "condition": "clear" },
                { "hour": 10, "temp": 13.5, "condition": "rain" },
            ]
        }]));

        let parsed = parse_forecast(&bytes).unwrap();
        assert_eq!(parsed.city_display_name, "Moscow");
        assert_eq!(parsed.days.len(), 1);

        let day = &parsed.days[0];
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2022, 5, 26).unwrap());
        assert_eq!(day.hours[0].hour, 9);
        assert_eq!(day.hours[0].temperature, 12.0);
        assert_eq!(day.hours[0].condition, Condition::Other("clear".into()));
        assert_eq!(day.hours[1].hour, 10);
        assert_eq!(day.hours[1].condition, Condition::Rain);
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let bytes = serde_json::json!({
            "now": 1653550000,
            "geo_object": { "province": { "name": "Paris", "id": 1 }, "country": {} },
            "forecasts": [{ "date": "2022-05-26", "week": 21, "hours": [] }],
        })
        .to_string();

        let parsed = parse_forecast(bytes.as_bytes()).unwrap();
        assert_eq!(parsed.city_display_name, "Paris");
        assert!(parsed.days[0].hours.is_empty());
    }

    #[test]
    fn test_parse_missing_hours_is_malformed() {
        let bytes = doc(serde_json::json!([{ "date": "2022-05-26" }]));
        let err = parse_forecast(&bytes).unwrap_err();
        match err {
            FetchError::MalformedDocument(msg) => assert!(msg.contains("missing hours")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_missing_city_name_is_malformed() {
        let bytes = serde_json::json!({ "forecasts": [] }).to_string();
        assert!(matches!(
            parse_forecast(bytes.as_bytes()),
            Err(FetchError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_parse_hour_out_of_range_is_malformed() {
        let bytes = doc(serde_json::json!([{
            "date": "2022-05-26",
            "hours": [{ "hour": "24", "temp": 1, "condition": "clear" }]
        }]));
        assert!(matches!(
            parse_forecast(&bytes),
            Err(FetchError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_parse_repeated_date_is_malformed() {
        let bytes = doc(serde_json::json!([
            { "date": "2022-05-26", "hours": [] },
            { "date": "2022-05-26", "hours": [] },
        ]));
        assert!(matches!(
            parse_forecast(&bytes),
            Err(FetchError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_forecast(b"<html>not json</html>"),
            Err(FetchError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_precipitation_set() {
        assert!(Condition::from("rain").is_precipitation());
        assert!(Condition::from("snow").is_precipitation());
        assert!(Condition::from("hail").is_precipitation());
        assert!(Condition::from("thunderstorm").is_precipitation());
        assert!(!Condition::from("clear").is_precipitation());
        assert!(!Condition::from("light-rain").is_precipitation());
    }
}
