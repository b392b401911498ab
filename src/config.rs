use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const BUILTIN_BASE_URL: &str = "https://code.s3.yandex.net/async-module";

const BUILTIN_CITIES: &[(&str, &str)] = &[
    ("MOSCOW", "moscow"),
    ("PARIS", "paris"),
    ("LONDON", "london"),
    ("BERLIN", "berlin"),
    ("BEIJING", "beijing"),
    ("KAZAN", "kazan"),
    ("SPETERSBURG", "spetersburg"),
    ("VOLGOGRAD", "volgograd"),
    ("NOVOSIBIRSK", "novosibirsk"),
    ("KALININGRAD", "kaliningrad"),
    ("ABUDHABI", "abudhabi"),
    ("WARSZAWA", "warszawa"),
    ("BUCHAREST", "bucharest"),
    ("ROMA", "roma"),
    ("CAIRO", "cairo"),
];

/// A city and where its forecast is read from (URL or local path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub location: String,
}

/// The ordered city list. Its order is the canonical order of a run.
///
/// Stored as JSON on disk:
/// ```json
/// {
///   "cities": [
///     { "name": "MOSCOW", "location": "https://example.com/moscow-response.json" },
///     { "name": "PARIS", "location": "forecasts/paris.json" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitiesConfig {
    cities: Vec<City>,
}

impl CitiesConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read city list '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("invalid city list '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: CitiesConfig = serde_json::from_str(content)?;
        Self::new(config.cities)
    }

    /// Builds a config, rejecting an empty list and repeated names.
    pub fn new(cities: Vec<City>) -> Result<Self> {
        if cities.is_empty() {
            bail!("city list is empty");
        }
        let mut seen = HashSet::new();
        for city in &cities {
            if !seen.insert(city.name.as_str()) {
                bail!("city '{}' is listed more than once", city.name);
            }
        }
        Ok(Self { cities })
    }

    /// The built-in list of fifteen cities served by the public forecast mirror.
    pub fn builtin() -> Self {
        Self {
            cities: BUILTIN_CITIES
                .iter()
                .map(|(name, slug)| City {
                    name: name.to_string(),
                    location: format!("{BUILTIN_BASE_URL}/{slug}-response.json"),
                })
                .collect(),
        }
    }

    /// Loads from `path` if given, otherwise falls back to [`CitiesConfig::builtin`].
    pub fn load_or_builtin(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn location(&self, name: &str) -> Option<&str> {
        self.cities
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.location.as_str())
    }

    pub fn names(&self) -> Vec<String> {
        self.cities.iter().map(|c| c.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &City> {
        self.cities.iter()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}
