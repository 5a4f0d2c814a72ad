//! Chart handles and the renderer seam
//!
//! A chart is rendered through a [`ChartRenderer`] and the caller keeps the
//! returned [`ChartHandle`]. There is no chart state attached to element ids
//! anywhere else; updates and resizes go through the handle.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Option object for the external charting library plus the element height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChartModel {
    pub height_px: u32,
    pub option: Value,
}

/// External rendering library
pub trait ChartRenderer {
    /// Render (or replace) the chart shown in `element_id`
    fn render(&mut self, element_id: &str, chart: &ChartModel) -> Result<()>;

    /// Re-layout the chart after its container changed size
    fn resize(&mut self, element_id: &str, height_px: u32) -> Result<()>;
}

/// A rendered chart, owned by whoever rendered it
#[derive(Debug, Clone, PartialEq)]
pub struct ChartHandle {
    element_id: String,
    chart: ChartModel,
}

impl ChartHandle {
    pub fn render<R: ChartRenderer + ?Sized>(
        renderer: &mut R,
        element_id: impl Into<String>,
        chart: ChartModel,
    ) -> Result<Self> {
        let element_id = element_id.into();
        renderer
            .render(&element_id, &chart)
            .with_context(|| format!("failed to render chart into '{}'", element_id))?;
        tracing::debug!(element = %element_id, height_px = chart.height_px, "chart rendered");
        Ok(ChartHandle { element_id, chart })
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn chart(&self) -> &ChartModel {
        &self.chart
    }

    pub fn option(&self) -> &Value {
        &self.chart.option
    }

    pub fn height_px(&self) -> u32 {
        self.chart.height_px
    }

    /// Replace the chart model and re-render
    pub fn update<R: ChartRenderer + ?Sized>(&mut self, renderer: &mut R, chart: ChartModel) -> Result<()> {
        renderer
            .render(&self.element_id, &chart)
            .with_context(|| format!("failed to update chart in '{}'", self.element_id))?;
        self.chart = chart;
        Ok(())
    }

    pub fn resize<R: ChartRenderer + ?Sized>(&self, renderer: &mut R) -> Result<()> {
        renderer.resize(&self.element_id, self.chart.height_px)
    }

    /// Change the element height (the chart is resized, not rebuilt)
    pub fn set_height<R: ChartRenderer + ?Sized>(&mut self, renderer: &mut R, height_px: u32) -> Result<()> {
        self.chart.height_px = height_px;
        self.resize(renderer)
    }
}

/// Renderer that keeps the last chart per element in memory
///
/// Used to export all charts of a dashboard as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionBundle {
    charts: BTreeMap<String, ChartModel>,
    #[serde(skip)]
    render_count: usize,
    #[serde(skip)]
    resize_count: usize,
}

impl OptionBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, element_id: &str) -> Option<&ChartModel> {
        self.charts.get(element_id)
    }

    pub fn element_ids(&self) -> impl Iterator<Item = &str> {
        self.charts.keys().map(String::as_str)
    }

    pub fn render_count(&self) -> usize {
        self.render_count
    }

    pub fn resize_count(&self) -> usize {
        self.resize_count
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize chart bundle to JSON")
    }
}

impl ChartRenderer for OptionBundle {
    fn render(&mut self, element_id: &str, chart: &ChartModel) -> Result<()> {
        self.charts.insert(element_id.to_string(), chart.clone());
        self.render_count += 1;
        Ok(())
    }

    fn resize(&mut self, element_id: &str, height_px: u32) -> Result<()> {
        let chart = self
            .charts
            .get_mut(element_id)
            .with_context(|| format!("no chart rendered in '{}'", element_id))?;
        chart.height_px = height_px;
        self.resize_count += 1;
        Ok(())
    }
}
