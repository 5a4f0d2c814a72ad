//! covview core library - chart models for code coverage reports

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Models are pure functions of provider data and configuration
// - No global mutable state; rendered charts are owned through handles
// - No randomness, clocks, threads, or async
// - Ratios with a zero denominator never divide
// - Identical input yields byte-for-byte identical chart options

pub mod color;
pub mod config;
pub mod dashboard;
pub mod heatmap;
pub mod labels;
pub mod model;
pub mod overview;
pub mod provider;
pub mod ratio;
pub mod render;
pub mod report;
pub mod treemap;
pub mod trend;

pub use config::ResolvedConfig;
pub use dashboard::{render_dashboard, Dashboard};
pub use heatmap::{filter_children, ChildFilter, HeatmapHandle, PercentageRange};
pub use model::{BuildResults, ChildResults, MetricResult, TrendResults};
pub use provider::{CoverageDataProvider, JsonDirProvider};
pub use ratio::{normalize, CoverageSplit, Ratio, ZeroDenominatorPolicy};
pub use render::{ChartHandle, ChartModel, ChartRenderer, OptionBundle};
pub use report::render_json;
pub use treemap::{CoverageNode, FileCoverage, TreeMapNode};

use anyhow::{Context, Result};
use std::path::Path;

/// Write data to file atomically using temp file + rename
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    use std::fs;
    use std::io::Write;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }

    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path)
        .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write to temp file: {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync temp file: {}", temp_path.display()))?;
    drop(file);

    fs::rename(&temp_path, path)
        .with_context(|| format!("failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("charts.json");
        atomic_write(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!path.with_extension("tmp").exists());
    }
}
