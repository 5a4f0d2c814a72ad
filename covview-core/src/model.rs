//! View-model data delivered by a coverage data provider
//!
//! All values are produced once per report generation and are read-only
//! afterwards.

use crate::ratio::Ratio;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coverage of a single metric (line, branch, method, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricResult {
    pub name: String,
    pub ratio: Ratio,
}

impl MetricResult {
    pub fn new(name: impl Into<String>, ratio: Ratio) -> Self {
        MetricResult {
            name: name.into(),
            ratio,
        }
    }
}

/// Child identifier to per-metric results, aligned by metric index
///
/// Ordered so that iteration is lexicographic by child name.
pub type ChildResults = BTreeMap<String, Vec<MetricResult>>;

/// Project-level results of one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResults {
    pub build: String,
    pub results: Vec<MetricResult>,
}

/// Build history, newest build first (provider order)
pub type TrendResults = Vec<BuildResults>;

/// Find a metric by case-insensitive name
pub fn find_metric<'a>(results: &'a [MetricResult], name: &str) -> Option<&'a MetricResult> {
    results
        .iter()
        .find(|result| result.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_results_iterate_sorted() {
        let json = r#"{
            "zeta": [{"name": "Line", "ratio": {"numerator": 1, "denominator": 2}}],
            "alpha": [{"name": "Line", "ratio": {"numerator": 2, "denominator": 2}}]
        }"#;
        let children: ChildResults = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = children.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_find_metric_ignores_case() {
        let results = vec![
            MetricResult::new("Line", Ratio::new(1, 2).unwrap()),
            MetricResult::new("Branch", Ratio::new(0, 2).unwrap()),
        ];
        assert_eq!(find_metric(&results, "branch").unwrap().name, "Branch");
        assert!(find_metric(&results, "method").is_none());
    }
}
