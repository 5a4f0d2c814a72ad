//! Coverage trend over the build history
//!
//! Global invariants enforced:
//! - Builds are shown oldest first
//! - Series are ordered by first appearance of the metric
//! - A build without a metric leaves a gap, not a zero

use crate::color::{coverage_change_colors, ChangeTendency, ColorProvider};
use crate::model::{find_metric, MetricResult, TrendResults};
use crate::ratio::{normalize, ZeroDenominatorPolicy};
use crate::render::ChartModel;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Height used when the trend chart is shown on its own
pub const TREND_HEIGHT_PX: u32 = 400;

/// Metrics that get a rounded value in [`series_values`]
const SERIES_METRICS: [&str; 2] = ["line", "branch"];

/// One line of the trend chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrendSeries {
    pub name: String,
    pub data: Vec<Option<f64>>,
}

/// Chronological trend: x-axis builds and one series per metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrendChart {
    pub builds: Vec<String>,
    pub series: Vec<TrendSeries>,
}

/// Build the trend from provider results (newest build first)
pub fn build_trend(trend: &TrendResults, policy: ZeroDenominatorPolicy) -> TrendChart {
    let chronological: Vec<_> = trend.iter().rev().collect();

    let mut metrics: Vec<&str> = Vec::new();
    for build in &chronological {
        for result in &build.results {
            if !metrics.iter().any(|m| *m == result.name) {
                metrics.push(&result.name);
            }
        }
    }

    let series = metrics
        .iter()
        .map(|metric| TrendSeries {
            name: metric.to_string(),
            data: chronological
                .iter()
                .map(|build| {
                    build
                        .results
                        .iter()
                        .find(|result| result.name == *metric)
                        .map(|result| normalize(&result.ratio, policy).covered_percentage)
                })
                .collect(),
        })
        .collect();

    tracing::debug!(builds = chronological.len(), metrics = metrics.len(), "trend built");

    TrendChart {
        builds: chronological.iter().map(|build| build.build.clone()).collect(),
        series,
    }
}

/// Rounded line and branch percentages of one build, keyed by series id
///
/// Missing metrics and metrics without anything to cover count as 0.
pub fn series_values(results: &[MetricResult]) -> BTreeMap<String, u32> {
    SERIES_METRICS
        .iter()
        .map(|id| {
            let value = find_metric(results, id)
                .map(|result| result.ratio.rounded_percentage(ZeroDenominatorPolicy::Zero))
                .unwrap_or(0);
            (id.to_string(), value)
        })
        .collect()
}

impl TrendChart {
    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    pub fn to_chart(&self, height_px: u32) -> ChartModel {
        let legend: Vec<&str> = self.series.iter().map(|s| s.name.as_str()).collect();
        let series: Vec<_> = self
            .series
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "type": "line",
                    "symbol": "circle",
                    "data": s.data
                })
            })
            .collect();

        let option = json!({
            "title": { "text": "Trend" },
            "tooltip": { "trigger": "axis" },
            "legend": { "data": legend, "orient": "horizontal", "x": "center", "y": "bottom" },
            "grid": {
                "left": "20",
                "right": "10",
                "bottom": "30",
                "top": "40",
                "containLabel": true
            },
            "xAxis": {
                "type": "category",
                "boundaryGap": false,
                "data": self.builds
            },
            "yAxis": {
                "type": "value",
                "min": 0,
                "max": 100,
                "axisLabel": { "formatter": "{value}%" }
            },
            "series": series
        });

        ChartModel { height_px, option }
    }
}

/// Change of one metric between the two most recent builds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricChange {
    pub metric: String,
    pub current: f64,
    pub previous: Option<f64>,
    pub change: Option<f64>,
    pub tendency: ChangeTendency,
    pub fill: String,
}

/// Latest-vs-previous changes for every metric of the newest build
pub fn latest_changes(
    trend: &TrendResults,
    policy: ZeroDenominatorPolicy,
    colors: &ColorProvider,
) -> Vec<MetricChange> {
    let Some(latest) = trend.first() else {
        return Vec::new();
    };
    let previous_build = trend.get(1);

    latest
        .results
        .iter()
        .map(|result| {
            let current = result.ratio.table_percentage(policy);
            let previous = previous_build
                .and_then(|build| build.results.iter().find(|r| r.name == result.name))
                .map(|r| r.ratio.table_percentage(policy));
            let change = previous.map(|previous| round_points(current - previous));
            let delta = change.unwrap_or(f64::NAN);
            MetricChange {
                metric: result.name.clone(),
                current,
                previous,
                change,
                tendency: ChangeTendency::of(delta),
                fill: coverage_change_colors(delta, colors).fill.to_rgb_hex(),
            }
        })
        .collect()
}

/// Round to two decimals so that table values subtract cleanly
fn round_points(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
