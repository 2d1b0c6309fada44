//! Revenue segment and geography aggregation.
//!
//! The provider's segment-reporting payloads are nested inconsistently across
//! companies and API versions: sometimes a list of date-keyed objects,
//! sometimes a `Segments`/`Product` container, sometimes a flat numeric map.
//! Rather than chase each shape, the aggregator walks the whole value and
//! folds every numeric leaf it can attribute to a segment name, tolerating
//! schema drift at the cost of the occasional false positive.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Recursion bound for the traversal. Provider payloads are shallow; anything
/// deeper is treated as noise.
const MAX_DEPTH: usize = 16;

/// Keys whose children are reported segment values.
const CONTAINER_KEYS: &[&str] = &[
    "Segments",
    "Product",
    "Products",
    "segments",
    "product",
    "Geographical",
];

/// A named slice of revenue with its share of the chosen total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentEntry {
    pub name: String,
    pub value: f64,
    pub percentage: f64,
}

pub struct SegmentAggregator {
    date_key: Regex,
    period_key: Regex,
}

impl Default for SegmentAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentAggregator {
    pub fn new() -> Self {
        Self {
            date_key: Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern must compile"),
            period_key: Regex::new(r"(?i)period").expect("period pattern must compile"),
        }
    }

    /// Aggregate all recognizable segment values in `payload`.
    ///
    /// Pure: the same payload always yields the same output. Entries are
    /// sorted descending by value. Strictly positive sums form the percentage
    /// base when any exist; otherwise every entry is kept unfiltered. An
    /// all-zero total yields an empty list.
    pub fn aggregate(&self, payload: &Value) -> Vec<SegmentEntry> {
        let mut sums: BTreeMap<String, f64> = BTreeMap::new();
        self.walk(payload, 0, &mut sums);

        let positives: Vec<(&String, &f64)> = sums.iter().filter(|(_, v)| **v > 0.0).collect();
        let chosen: Vec<(String, f64)> = if positives.is_empty() {
            sums.iter().map(|(k, v)| (k.clone(), *v)).collect()
        } else {
            positives.iter().map(|(k, v)| ((*k).clone(), **v)).collect()
        };

        let total: f64 = chosen.iter().map(|(_, v)| v).sum();
        if total == 0.0 {
            return Vec::new();
        }

        let mut entries: Vec<SegmentEntry> = chosen
            .into_iter()
            .map(|(name, value)| SegmentEntry {
                name,
                value,
                percentage: 100.0 * value / total,
            })
            .collect();

        entries.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
        entries
    }

    fn walk(&self, value: &Value, depth: usize, sums: &mut BTreeMap<String, f64>) {
        if depth > MAX_DEPTH {
            return;
        }

        match value {
            Value::Object(map) => self.walk_object(map, depth, sums),
            Value::Array(items) => {
                for item in items {
                    self.walk(item, depth + 1, sums);
                }
            }
            _ => {}
        }
    }

    fn walk_object(&self, map: &Map<String, Value>, depth: usize, sums: &mut BTreeMap<String, f64>) {
        // Date-keyed wrapper: { "2024-09-28": {...} }
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                if self.date_key.is_match(key) && inner.is_object() {
                    self.walk(inner, depth + 1, sums);
                    return;
                }
            }
        }

        let mut consumed = false;
        for container_key in CONTAINER_KEYS {
            if let Some(container) = map.get(*container_key) {
                self.fold_numeric_leaves(container, depth + 1, sums);
                consumed = true;
            }
        }
        if consumed {
            return;
        }

        // Catch-all: the object itself may be a numeric map.
        for (key, value) in map {
            if let Some(number) = value.as_f64() {
                if key != "date" && !self.period_key.is_match(key) {
                    *sums.entry(normalize_name(key)).or_insert(0.0) += number;
                }
            }
        }

        for value in map.values() {
            if value.is_object() || value.is_array() {
                self.walk(value, depth + 1, sums);
            }
        }
    }

    /// Sum every numeric leaf under `value`, keyed by its immediate name.
    fn fold_numeric_leaves(&self, value: &Value, depth: usize, sums: &mut BTreeMap<String, f64>) {
        if depth > MAX_DEPTH {
            return;
        }

        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if key == "date" || self.period_key.is_match(key) {
                        continue;
                    }
                    match child.as_f64() {
                        Some(number) => {
                            *sums.entry(normalize_name(key)).or_insert(0.0) += number;
                        }
                        None => self.fold_numeric_leaves(child, depth + 1, sums),
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.fold_numeric_leaves(item, depth + 1, sums);
                }
            }
            _ => {}
        }
    }
}

/// Turn a reported key into a display name: underscores become spaces, and a
/// space is inserted before an interior capital that follows a lowercase
/// letter. Single-letter lowercase prefixes ("iPhone", "iPad") stay intact.
fn normalize_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let chars: Vec<char> = key.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            out.push(' ');
            continue;
        }
        if c.is_uppercase() && i >= 2 && chars[i - 1].is_lowercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positive_entries_form_percentage_base() {
        let aggregator = SegmentAggregator::new();
        let payload = json!({ "Segments": { "iPhone": 200, "iPad": 50, "Services": -5 } });
        let entries = aggregator.aggregate(&payload);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], SegmentEntry { name: "iPhone".to_string(), value: 200.0, percentage: 80.0 });
        assert_eq!(entries[1], SegmentEntry { name: "iPad".to_string(), value: 50.0, percentage: 20.0 });
    }

    #[test]
    fn test_all_negative_falls_back_to_unfiltered() {
        let aggregator = SegmentAggregator::new();
        let payload = json!({ "Segments": { "Hardware": -30.0, "Software": -10.0 } });
        let entries = aggregator.aggregate(&payload);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Software");
        assert_eq!(entries[0].percentage, 25.0);
        assert_eq!(entries[1].name, "Hardware");
        assert_eq!(entries[1].percentage, 75.0);
    }

    #[test]
    fn test_zero_total_yields_empty() {
        let aggregator = SegmentAggregator::new();
        let payload = json!({ "Segments": { "A": 0.0, "B": 0.0 } });
        assert!(aggregator.aggregate(&payload).is_empty());
    }

    #[test]
    fn test_date_keyed_wrapper_list() {
        let aggregator = SegmentAggregator::new();
        let payload = json!([
            { "2024-09-28": { "Product": { "Mac": 30.0, "Wearables": 20.0 } } }
        ]);
        let entries = aggregator.aggregate(&payload);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Mac");
        assert_eq!(entries[0].percentage, 60.0);
    }

    #[test]
    fn test_duplicate_names_are_summed() {
        let aggregator = SegmentAggregator::new();
        let payload = json!([
            { "Segments": { "Cloud": 10.0 } },
            { "Segments": { "Cloud": 30.0, "Ads": 60.0 } }
        ]);
        let entries = aggregator.aggregate(&payload);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Ads");
        assert_eq!(entries[0].value, 60.0);
        assert_eq!(entries[1].value, 40.0);
    }

    #[test]
    fn test_catch_all_numeric_map_skips_date_and_period() {
        let aggregator = SegmentAggregator::new();
        let payload = json!({
            "date": 20240928,
            "reportPeriod": 4,
            "NorthAmerica": 120.0,
            "international_markets": 80.0
        });
        let entries = aggregator.aggregate(&payload);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "North America");
        assert_eq!(entries[1].name, "international markets");
        assert_eq!(entries[1].percentage, 40.0);
    }

    #[test]
    fn test_geographical_container() {
        let aggregator = SegmentAggregator::new();
        let payload = json!({
            "Geographical": { "Americas": 150.0, "Europe": 100.0, "GreaterChina": 50.0 }
        });
        let entries = aggregator.aggregate(&payload);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Americas");
        assert_eq!(entries[2].name, "Greater China");
        assert_eq!(entries[2].percentage, 100.0 * 50.0 / 300.0);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let aggregator = SegmentAggregator::new();
        let payload = json!([
            { "2023-12-31": { "Segments": { "Search": 175.0, "YouTube": 31.5, "Cloud": 33.1 } } },
            { "2022-12-31": { "Segments": { "Search": 162.4, "YouTube": 29.2, "Cloud": 26.3 } } }
        ]);
        let first = aggregator.aggregate(&payload);
        let second = aggregator.aggregate(&payload);
        assert_eq!(first, second);
    }

    #[test]
    fn test_depth_limit_stops_runaway_nesting() {
        let mut payload = json!({ "Segments": { "Deep": 1.0 } });
        for _ in 0..40 {
            payload = json!({ "wrapper": payload });
        }
        let aggregator = SegmentAggregator::new();
        assert!(aggregator.aggregate(&payload).is_empty());
    }
}
