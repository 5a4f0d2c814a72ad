//! Child results filtered by coverage range, binned into a heat-map
//!
//! Global invariants enforced:
//! - Children are listed in lexicographic order
//! - Metric names keep first-seen order by index
//! - Empty ratios count as 0% for filtering and never produce a cell
//! - Range bounds are inclusive

use crate::color::HEATMAP_GRADIENT;
use crate::labels::{truncate_label, url_segment, MAX_AXIS_LABEL_CHARS};
use crate::model::ChildResults;
use crate::ratio::{Ratio, ZeroDenominatorPolicy};
use crate::render::{ChartHandle, ChartModel, ChartRenderer};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Pixels per child row
const ROW_HEIGHT_PX: u32 = 32;

/// Title, axis and visual map
const BASE_HEIGHT_PX: u32 = 120;

const MIN_HEIGHT_PX: u32 = 180;

/// Inclusive percentage range `[lo, hi]` within `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct PercentageRange {
    lo: f64,
    hi: f64,
}

impl PercentageRange {
    pub const FULL: PercentageRange = PercentageRange { lo: 0.0, hi: 100.0 };

    pub fn new(lo: f64, hi: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) {
            anyhow::bail!("percentage range bounds must be within 0..=100 (got {}..{})", lo, hi);
        }
        if lo > hi {
            anyhow::bail!("percentage range lower bound {} exceeds upper bound {}", lo, hi);
        }
        Ok(PercentageRange { lo, hi })
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    pub fn contains(&self, percentage: f64) -> bool {
        percentage >= self.lo && percentage <= self.hi
    }
}

impl Default for PercentageRange {
    fn default() -> Self {
        Self::FULL
    }
}

impl TryFrom<[f64; 2]> for PercentageRange {
    type Error = anyhow::Error;

    fn try_from(bounds: [f64; 2]) -> Result<Self> {
        PercentageRange::new(bounds[0], bounds[1])
    }
}

impl From<PercentageRange> for [f64; 2] {
    fn from(range: PercentageRange) -> Self {
        [range.lo, range.hi]
    }
}

/// One heat-map cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HeatmapCell {
    pub metric_index: usize,
    pub child_index: usize,
    pub percentage: f64,
}

/// Children that passed the range filter plus their sparse cell matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChildFilter {
    pub children: Vec<String>,
    pub metrics: Vec<String>,
    pub cells: Vec<HeatmapCell>,
}

impl ChildFilter {
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Heat-map height for the included children
    pub fn chart_height(&self) -> u32 {
        (self.children.len() as u32 * ROW_HEIGHT_PX + BASE_HEIGHT_PX).max(MIN_HEIGHT_PX)
    }

    /// Relative detail links for the included children, in axis order
    pub fn child_links(&self) -> Vec<String> {
        self.children.iter().map(|name| url_segment(name)).collect()
    }

    pub fn cell(&self, metric_index: usize, child_index: usize) -> Option<&HeatmapCell> {
        self.cells
            .iter()
            .find(|c| c.metric_index == metric_index && c.child_index == child_index)
    }
}

/// Percentage a ratio is filtered by; empty ratios count as 0
fn filter_percentage(ratio: &Ratio) -> f64 {
    ratio.table_percentage(ZeroDenominatorPolicy::Zero)
}

/// Keep children with at least one metric inside `range`
pub fn filter_children(results: &ChildResults, range: PercentageRange) -> ChildFilter {
    let mut filter = ChildFilter::default();

    for (child, metrics) in results {
        let included = metrics
            .iter()
            .any(|metric| range.contains(filter_percentage(&metric.ratio)));
        if !included {
            continue;
        }

        let child_index = filter.children.len();
        filter.children.push(child.clone());

        for (metric_index, metric) in metrics.iter().enumerate() {
            if metric_index == filter.metrics.len() {
                filter.metrics.push(metric.name.clone());
            }
            if !metric.ratio.is_empty() {
                filter.cells.push(HeatmapCell {
                    metric_index,
                    child_index,
                    percentage: filter_percentage(&metric.ratio),
                });
            }
        }
    }

    filter
}

/// Filter with `requested`, falling back to the full range when nothing matches
pub fn initial_filter(results: &ChildResults, requested: PercentageRange) -> (PercentageRange, ChildFilter) {
    let filter = filter_children(results, requested);
    if filter.is_empty() && requested != PercentageRange::FULL {
        tracing::debug!(
            lo = requested.lo(),
            hi = requested.hi(),
            "no child in requested range, showing full range"
        );
        return (PercentageRange::FULL, filter_children(results, PercentageRange::FULL));
    }
    (requested, filter)
}

/// Heat-map chart model for a filter result
///
/// `group` names what the children are (package, file, ...) and goes into
/// the title.
pub fn heatmap_chart(filter: &ChildFilter, range: PercentageRange, group: Option<&str>) -> ChartModel {
    let title = match group {
        Some(group) => format!("Divided by {} Name", group),
        None => "Divided by ".to_string(),
    };
    let axis_labels: Vec<String> = filter
        .children
        .iter()
        .map(|child| truncate_label(child, MAX_AXIS_LABEL_CHARS))
        .collect();
    let gradient: Vec<String> = HEATMAP_GRADIENT.iter().map(|c| c.to_rgb_hex()).collect();
    let data: Value = if filter.is_empty() {
        Value::Null
    } else {
        filter
            .cells
            .iter()
            .map(|c| json!([c.metric_index, c.child_index, c.percentage]))
            .collect()
    };

    let option = json!({
        "title": {
            "text": title,
            "subtext": "click item name to see more details"
        },
        "tooltip": { "position": "top" },
        "animation": false,
        "grid": { "top": "60", "left": "0%", "containLabel": true },
        "xAxis": {
            "type": "category",
            "data": filter.metrics,
            "position": "top",
            "splitArea": { "show": true },
            "axisLine": { "show": false },
            "axisTick": { "show": false },
            "axisLabel": { "interval": 0, "fontWeight": "bold" }
        },
        "yAxis": {
            "type": "category",
            "data": axis_labels,
            "inverse": true,
            "position": "right",
            "splitArea": { "show": true },
            "axisLine": { "show": false },
            "axisTick": { "show": false },
            "triggerEvent": true,
            "axisLabel": { "interval": 0, "fontSize": 13 }
        },
        "visualMap": {
            "min": 0,
            "max": 100,
            "range": [range.lo(), range.hi()],
            "calculable": true,
            "orient": "horizontal",
            "left": "right",
            "top": "top",
            "inRange": { "color": gradient }
        },
        "series": [{
            "name": "Coverage",
            "type": "heatmap",
            "data": data,
            "label": { "show": true, "formatter": "{@[2]}%" }
        }]
    });

    ChartModel {
        height_px: filter.chart_height(),
        option,
    }
}

/// Rendered heat-map that owns its data and supports range re-selection
#[derive(Debug, Clone)]
pub struct HeatmapHandle {
    handle: ChartHandle,
    results: ChildResults,
    group: Option<String>,
    range: PercentageRange,
    filter: ChildFilter,
}

impl HeatmapHandle {
    pub fn render<R: ChartRenderer + ?Sized>(
        renderer: &mut R,
        element_id: impl Into<String>,
        results: ChildResults,
        group: Option<String>,
        requested: PercentageRange,
    ) -> Result<Self> {
        let (range, filter) = initial_filter(&results, requested);
        let chart = heatmap_chart(&filter, range, group.as_deref());
        let handle = ChartHandle::render(renderer, element_id, chart)?;
        Ok(HeatmapHandle {
            handle,
            results,
            group,
            range,
            filter,
        })
    }

    /// Apply a range picked on the visual map and re-render
    pub fn select_range<R: ChartRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        range: PercentageRange,
    ) -> Result<&ChildFilter> {
        let filter = filter_children(&self.results, range);
        tracing::debug!(
            lo = range.lo(),
            hi = range.hi(),
            children = filter.children.len(),
            "heat-map range selected"
        );
        let chart = heatmap_chart(&filter, range, self.group.as_deref());
        self.handle.update(renderer, chart)?;
        self.handle.resize(renderer)?;
        self.range = range;
        self.filter = filter;
        Ok(&self.filter)
    }

    pub fn range(&self) -> PercentageRange {
        self.range
    }

    pub fn filter(&self) -> &ChildFilter {
        &self.filter
    }

    pub fn handle(&self) -> &ChartHandle {
        &self.handle
    }

    pub fn results(&self) -> &ChildResults {
        &self.results
    }
}
