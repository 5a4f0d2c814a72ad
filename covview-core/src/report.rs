//! Text and JSON output for the chart models
//!
//! Tables are deterministic: rows follow model order, widths are fixed.

use crate::heatmap::ChildFilter;
use crate::overview::Overview;
use crate::treemap::CoverageNode;
use crate::trend::{MetricChange, TrendChart};
use anyhow::{Context, Result};
use serde::Serialize;

/// Render the overview as a table
pub fn render_overview_text(overview: &Overview) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<20} {:>10} {:>10} {:>9}\n",
        "METRIC", "COVERED", "MISSED", "COVERAGE"
    ));

    for (i, metric) in overview.metrics.iter().enumerate() {
        output.push_str(&format!(
            "{:<20} {:>10} {:>10} {:>9}\n",
            truncate_or_pad(metric, 20),
            overview.covered[i],
            overview.missed[i],
            overview.covered_percentage_labels[i],
        ));
    }

    output
}

/// Render the filtered children with one column per metric
///
/// Metrics without anything to cover show as `-`.
pub fn render_children_text(filter: &ChildFilter) -> String {
    let mut output = String::new();

    output.push_str(&format!("{:<40}", "CHILD"));
    for metric in &filter.metrics {
        output.push_str(&format!(" {:>10}", truncate_or_pad(metric, 10).trim_end()));
    }
    output.push('\n');

    for (child_index, child) in filter.children.iter().enumerate() {
        output.push_str(&truncate_or_pad(child, 40));
        for metric_index in 0..filter.metrics.len() {
            let value = filter
                .cell(metric_index, child_index)
                .map(|cell| format!("{:.2}", cell.percentage))
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(" {:>10}", value));
        }
        output.push('\n');
    }

    output
}

/// Render the trend, oldest build first, followed by the latest changes
pub fn render_trend_text(trend: &TrendChart, changes: &[MetricChange]) -> String {
    let mut output = String::new();

    output.push_str(&format!("{:<12}", "BUILD"));
    for series in &trend.series {
        output.push_str(&format!(" {:>10}", truncate_or_pad(&series.name, 10).trim_end()));
    }
    output.push('\n');

    for (build_index, build) in trend.builds.iter().enumerate() {
        output.push_str(&truncate_or_pad(build, 12));
        for series in &trend.series {
            let value = match series.data.get(build_index).copied().flatten() {
                Some(percentage) => format!("{:.2}", percentage),
                None => "-".to_string(),
            };
            output.push_str(&format!(" {:>10}", value));
        }
        output.push('\n');
    }

    if !changes.is_empty() {
        output.push('\n');
        output.push_str(&format!(
            "{:<20} {:>9} {:>9} {:>8}\n",
            "METRIC", "CURRENT", "PREVIOUS", "CHANGE"
        ));
        for change in changes {
            let previous = change
                .previous
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "-".to_string());
            let delta = change
                .change
                .map(|c| format!("{:+.2}", c))
                .unwrap_or_else(|| "n/a".to_string());
            output.push_str(&format!(
                "{:<20} {:>9.2} {:>9} {:>8} {}\n",
                truncate_or_pad(&change.metric, 20),
                change.current,
                previous,
                delta,
                change.tendency.symbol(),
            ));
        }
    }

    output
}

/// Render a coverage tree, indented by depth, down to `max_depth`
pub fn render_tree_text(root: &CoverageNode, max_depth: usize) -> String {
    let mut output = String::new();
    write_tree_node(&mut output, root, 0, max_depth);
    output
}

fn write_tree_node(output: &mut String, node: &CoverageNode, depth: usize, max_depth: usize) {
    let percentage = node
        .covered_percentage()
        .map(|p| format!("{:.2}%", p))
        .unwrap_or_else(|| "n/a".to_string());
    let name = format!("{}{}", "  ".repeat(depth), node.name);
    output.push_str(&format!(
        "{} {:>8} {:>12}\n",
        truncate_or_pad(&name, 50),
        percentage,
        format!("{}/{}", node.covered, node.total),
    ));
    if depth < max_depth {
        for child in &node.children {
            write_tree_node(output, child, depth + 1, max_depth);
        }
    }
}

/// Render any model as pretty JSON
pub fn render_json<T: Serialize + ?Sized>(model: &T) -> Result<String> {
    serde_json::to_string_pretty(model).context("failed to serialize report to JSON")
}

/// Truncate or pad string to fixed width (in characters)
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorProvider;
    use crate::heatmap::{filter_children, PercentageRange};
    use crate::model::{BuildResults, ChildResults, MetricResult};
    use crate::overview::build_overview;
    use crate::ratio::{Ratio, ZeroDenominatorPolicy};
    use crate::treemap::FileCoverage;
    use crate::trend::{build_trend, latest_changes};

    fn metric(name: &str, n: u64, d: u64) -> MetricResult {
        MetricResult::new(name, Ratio::new(n, d).unwrap())
    }

    #[test]
    fn test_overview_text() {
        let overview = build_overview(&[metric("Line", 3, 4)], ZeroDenominatorPolicy::Zero, 0);
        let text = render_overview_text(&overview);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("METRIC"));
        assert!(lines[1].starts_with("Line"));
        assert!(lines[1].ends_with("75.00%"));
    }

    #[test]
    fn test_children_text_marks_empty_cells() {
        let mut children = ChildResults::new();
        children.insert("pkg.a".to_string(), vec![metric("Line", 1, 2), metric("Branch", 0, 0)]);
        let filter = filter_children(&children, PercentageRange::FULL);
        let text = render_children_text(&filter);
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("pkg.a"));
        assert!(row.contains("50.00"));
        assert!(row.trim_end().ends_with('-'));
    }

    #[test]
    fn test_trend_text() {
        let trend_results = vec![
            BuildResults { build: "#2".to_string(), results: vec![metric("Line", 3, 4)] },
            BuildResults { build: "#1".to_string(), results: vec![metric("Line", 1, 2)] },
        ];
        let trend = build_trend(&trend_results, ZeroDenominatorPolicy::Zero);
        let changes = latest_changes(&trend_results, ZeroDenominatorPolicy::Zero, &ColorProvider::default());
        let text = render_trend_text(&trend, &changes);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("#1"));
        assert!(lines[2].starts_with("#2"));
        assert!(text.contains("+25.00"));
        assert!(lines.last().unwrap().ends_with('+'));
    }

    #[test]
    fn test_tree_text_respects_depth() {
        let files = vec![FileCoverage { path: "src/a.rs".to_string(), covered: 1, total: 2 }];
        let root = CoverageNode::from_files("project", &files).unwrap();
        assert_eq!(render_tree_text(&root, 0).lines().count(), 1);
        let full = render_tree_text(&root, 5);
        assert_eq!(full.lines().count(), 3);
        assert!(full.lines().nth(2).unwrap().starts_with("    a.rs"));
        assert!(full.contains("50.00%"));
    }

    #[test]
    fn test_render_json() {
        let overview = build_overview(&[metric("Line", 3, 4)], ZeroDenominatorPolicy::Zero, 0);
        let json = render_json(&overview).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["covered"][0], 3);
    }

    #[test]
    fn test_truncate_or_pad() {
        assert_eq!(truncate_or_pad("abc", 5), "abc  ");
        assert_eq!(truncate_or_pad("abcdefgh", 6), "abc...");
        assert_eq!(truncate_or_pad("ääääääää", 6), "äää...");
    }
}
