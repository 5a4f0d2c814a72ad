//! Project overview: one stacked covered/missed bar per metric

use crate::color::ChartPalette;
use crate::labels::{format_percentage, unescape_xml};
use crate::model::MetricResult;
use crate::ratio::{normalize, ZeroDenominatorPolicy};
use crate::render::ChartModel;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Pixels per bar
const ROW_HEIGHT_PX: u32 = 31;

/// Legend, axes and margins
const BASE_HEIGHT_PX: u32 = 150;

/// Parallel per-metric arrays feeding the overview bar chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Overview {
    pub metrics: Vec<String>,
    pub covered: Vec<u64>,
    pub missed: Vec<u64>,
    pub covered_percentages: Vec<f64>,
    pub missed_percentages: Vec<f64>,
    pub covered_percentage_labels: Vec<String>,
}

/// Build the overview from project-level results
///
/// With a positive `min_total`, metrics whose total is at or below it are
/// left out; a value of 1 hides metrics such as "module" that only ever count
/// a single element. A `min_total` of 0 keeps every metric, including empty
/// ones, which then show the zero-denominator policy.
pub fn build_overview(
    results: &[MetricResult],
    policy: ZeroDenominatorPolicy,
    min_total: u64,
) -> Overview {
    let mut overview = Overview::default();

    for result in results {
        if min_total > 0 && result.ratio.denominator() <= min_total {
            continue;
        }
        let split = normalize(&result.ratio, policy);
        overview.metrics.push(result.name.clone());
        overview.covered.push(split.covered);
        overview.missed.push(split.missed);
        overview.covered_percentages.push(split.covered_percentage);
        overview.missed_percentages.push(split.missed_percentage);
        overview
            .covered_percentage_labels
            .push(format_percentage(split.covered_percentage));
    }

    overview
}

impl Overview {
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn chart_height(&self) -> u32 {
        self.metrics.len() as u32 * ROW_HEIGHT_PX + BASE_HEIGHT_PX
    }

    /// Stacked horizontal bar chart; bar labels carry the absolute counts
    pub fn to_chart(&self, title: Option<&str>, palette: &ChartPalette) -> ChartModel {
        let covered_data = bar_data(&self.covered_percentages, &self.covered);
        let missed_data = bar_data(&self.missed_percentages, &self.missed);

        let mut option = json!({
            "tooltip": {
                "trigger": "axis",
                "axisPointer": { "type": "shadow" }
            },
            "legend": {
                "data": ["Covered", "Missed"],
                "x": "center",
                "y": "top"
            },
            "grid": {
                "left": "20",
                "right": "10",
                "bottom": "5",
                "top": "40",
                "containLabel": true
            },
            "xAxis": {
                "type": "value",
                "max": 100,
                "axisLabel": { "formatter": "{value}%" }
            },
            "yAxis": [
                {
                    "type": "category",
                    "data": self.metrics,
                    "axisLine": { "show": false },
                    "axisTick": { "show": false }
                },
                {
                    "type": "category",
                    "data": self.covered_percentage_labels,
                    "position": "right",
                    "axisLine": { "show": false },
                    "axisTick": { "show": false }
                }
            ],
            "series": [
                {
                    "name": "Covered",
                    "type": "bar",
                    "stack": "sum",
                    "itemStyle": { "color": palette.covered.to_rgb_hex() },
                    "label": { "show": true, "position": "insideLeft" },
                    "data": covered_data
                },
                {
                    "name": "Missed",
                    "type": "bar",
                    "stack": "sum",
                    "itemStyle": { "color": palette.missed.to_rgb_hex() },
                    "label": { "show": true, "position": "insideRight" },
                    "data": missed_data
                }
            ]
        });

        if let Some(title) = title {
            option["title"] = json!({ "text": unescape_xml(title) });
        }

        ChartModel {
            height_px: self.chart_height(),
            option,
        }
    }
}

fn bar_data(percentages: &[f64], counts: &[u64]) -> Vec<Value> {
    percentages
        .iter()
        .zip(counts)
        .map(|(percentage, count)| {
            json!({
                "value": percentage,
                "label": { "formatter": count.to_string() }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratio::Ratio;

    fn results() -> Vec<MetricResult> {
        vec![
            MetricResult::new("Module", Ratio::new(1, 1).unwrap()),
            MetricResult::new("Line", Ratio::new(3, 4).unwrap()),
            MetricResult::new("Branch", Ratio::new(0, 0).unwrap()),
        ]
    }

    #[test]
    fn test_overview_arrays_are_parallel() {
        let overview = build_overview(&results(), ZeroDenominatorPolicy::Zero, 0);
        assert_eq!(overview.metrics, vec!["Module", "Line", "Branch"]);
        assert_eq!(overview.covered, vec![1, 3, 0]);
        assert_eq!(overview.missed, vec![0, 1, 0]);
        assert_eq!(overview.covered_percentages, vec![100.0, 75.0, 0.0]);
        assert_eq!(overview.missed_percentages, vec![0.0, 25.0, 100.0]);
        assert_eq!(overview.covered_percentage_labels[1], "75.00%");
    }

    #[test]
    fn test_overview_policy_applies_to_empty_metrics() {
        let overview = build_overview(&results(), ZeroDenominatorPolicy::Full, 0);
        assert_eq!(overview.covered_percentages[2], 100.0);
        assert_eq!(overview.missed_percentages[2], 0.0);
    }

    #[test]
    fn test_overview_min_total_hides_trivial_metrics() {
        let overview = build_overview(&results(), ZeroDenominatorPolicy::Zero, 1);
        assert_eq!(overview.metrics, vec!["Line"]);
        assert_eq!(overview.chart_height(), 31 + 150);
    }

    #[test]
    fn test_overview_zero_min_total_keeps_empty_metrics() {
        let overview = build_overview(&results(), ZeroDenominatorPolicy::Zero, 0);
        assert_eq!(overview.len(), 3);
        assert_eq!(overview.metrics[2], "Branch");
        assert_eq!(overview.covered[2], 0);
        assert_eq!(overview.missed[2], 0);
    }

    #[test]
    fn test_overview_chart_option() {
        let overview = build_overview(&results(), ZeroDenominatorPolicy::Zero, 0);
        let chart = overview.to_chart(Some("&lt;init&gt;"), &ChartPalette::default());
        assert_eq!(chart.height_px, 3 * 31 + 150);
        assert_eq!(chart.option["title"]["text"], "<init>");
        assert_eq!(chart.option["series"][0]["itemStyle"]["color"], "#A5D6A7");
        assert_eq!(chart.option["series"][0]["data"][1]["value"], 75.0);
        assert_eq!(chart.option["series"][1]["data"][1]["label"]["formatter"], "1");
        assert_eq!(chart.option["yAxis"][1]["data"][1], "75.00%");
    }

    #[test]
    fn test_overview_without_title() {
        let overview = build_overview(&[], ZeroDenominatorPolicy::Zero, 0);
        assert!(overview.is_empty());
        let chart = overview.to_chart(None, &ChartPalette::default());
        assert!(chart.option.get("title").is_none());
        assert_eq!(chart.height_px, 150);
    }
}
