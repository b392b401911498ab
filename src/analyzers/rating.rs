use std::collections::BTreeMap;

/// Score buckets: every score maps to the cities holding it, in the order
/// they were inserted. Iteration runs from the highest score down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingIndex {
    buckets: BTreeMap<i64, Vec<String>>,
}

impl RankingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `city` to the bucket for `score`. A city already present in
    /// any bucket is left where it is and `false` is returned.
    pub fn insert(&mut self, score: i64, city: &str) -> bool {
        if self.contains(city) {
            return false;
        }
        self.buckets.entry(score).or_default().push(city.to_string());
        true
    }

    pub fn contains(&self, city: &str) -> bool {
        self.buckets.values().any(|cities| cities.iter().any(|c| c == city))
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets from highest to lowest score.
    pub fn descending(&self) -> impl Iterator<Item = (i64, &[String])> {
        self.buckets
            .iter()
            .rev()
            .map(|(score, cities)| (*score, cities.as_slice()))
    }

    /// Buckets from highest to lowest score with their 1-based rank. Ranks
    /// advance once per distinct score, so tied cities share a rank.
    pub fn ranked(&self) -> impl Iterator<Item = (usize, i64, &[String])> {
        self.descending()
            .enumerate()
            .map(|(i, (score, cities))| (i + 1, score, cities))
    }
}
