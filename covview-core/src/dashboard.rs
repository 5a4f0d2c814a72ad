//! Coverage dashboard: the four charts of a coverage report page

use crate::color::ColorProvider;
use crate::config::ResolvedConfig;
use crate::heatmap::HeatmapHandle;
use crate::overview::build_overview;
use crate::provider::CoverageDataProvider;
use crate::render::{ChartHandle, ChartRenderer};
use crate::treemap::{metric_label, tree_map_chart, tree_map_model};
use crate::trend::build_trend;
use anyhow::{Context, Result};

pub const OVERVIEW_ELEMENT: &str = "coverage-overview";
pub const DETAILS_ELEMENT: &str = "coverage-details";
pub const CHILDREN_ELEMENT: &str = "coverage-children";
pub const TREND_ELEMENT: &str = "coverage-trend";

/// Handles of a rendered dashboard
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub overview: ChartHandle,
    pub tree: ChartHandle,
    pub children: HeatmapHandle,
    pub trend: ChartHandle,
}

/// Fetch everything from `provider` and render the dashboard charts
///
/// Any fetch failure aborts rendering and is returned unchanged.
pub fn render_dashboard<P, R>(provider: &P, config: &ResolvedConfig, renderer: &mut R) -> Result<Dashboard>
where
    P: CoverageDataProvider + ?Sized,
    R: ChartRenderer + ?Sized,
{
    let policy = config.zero_denominator;

    let results = provider.results().context("failed to fetch results")?;
    let overview = build_overview(&results, policy, config.overview_min_total);
    let overview_chart = overview.to_chart(None, &config.palette);
    let overview_height = overview_chart.height_px;
    let overview = ChartHandle::render(renderer, OVERVIEW_ELEMENT, overview_chart)?;

    let mut tree = provider
        .coverage_tree(&config.tree_metric)
        .context("failed to fetch coverage tree")?;
    if config.filters_files() {
        let removed = tree.retain_files(&|path: &str| config.should_include(path));
        tracing::debug!(removed, "files filtered from coverage tree");
    }
    let tree_model = tree_map_model(&tree, &ColorProvider::default());
    let tree = ChartHandle::render(
        renderer,
        DETAILS_ELEMENT,
        tree_map_chart(&tree_model, &metric_label(&config.tree_metric)),
    )?;

    let child_results = provider
        .child_results()
        .context("failed to fetch child results")?;
    let children = HeatmapHandle::render(
        renderer,
        CHILDREN_ELEMENT,
        child_results,
        None,
        config.heatmap_range,
    )?;

    let trend_results = provider
        .trend_results()
        .context("failed to fetch trend results")?;
    let trend = build_trend(&trend_results, policy);
    let trend = ChartHandle::render(renderer, TREND_ELEMENT, trend.to_chart(overview_height))?;

    tracing::info!(
        metrics = results.len(),
        children = children.filter().children.len(),
        builds = trend_results.len(),
        "dashboard rendered"
    );

    Ok(Dashboard {
        overview,
        tree,
        children,
        trend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::PercentageRange;
    use crate::model::{BuildResults, ChildResults, MetricResult, TrendResults};
    use crate::ratio::Ratio;
    use crate::render::OptionBundle;
    use crate::treemap::{CoverageNode, FileCoverage};

    struct StaticProvider {
        fail_trend: bool,
    }

    fn metric(name: &str, n: u64, d: u64) -> MetricResult {
        MetricResult::new(name, Ratio::new(n, d).unwrap())
    }

    impl CoverageDataProvider for StaticProvider {
        fn results(&self) -> Result<Vec<MetricResult>> {
            Ok(vec![metric("Line", 3, 4), metric("Branch", 1, 2)])
        }

        fn child_results(&self) -> Result<ChildResults> {
            let mut children = ChildResults::new();
            children.insert("a".to_string(), vec![metric("Line", 1, 1)]);
            children.insert("b".to_string(), vec![metric("Line", 1, 4)]);
            Ok(children)
        }

        fn trend_results(&self) -> Result<TrendResults> {
            if self.fail_trend {
                anyhow::bail!("trend unavailable");
            }
            Ok(vec![BuildResults {
                build: "#1".to_string(),
                results: self.results()?,
            }])
        }

        fn coverage_tree(&self, _metric: &str) -> Result<CoverageNode> {
            CoverageNode::from_files(
                "project",
                &[
                    FileCoverage { path: "src/a.rs".to_string(), covered: 3, total: 3 },
                    FileCoverage { path: "gen/b.rs".to_string(), covered: 0, total: 1 },
                ],
            )
        }

        fn source_code(&self, file_hash: &str) -> Result<String> {
            Ok(file_hash.to_string())
        }
    }

    #[test]
    fn test_dashboard_renders_all_charts() {
        let config = ResolvedConfig::defaults().unwrap();
        let mut bundle = OptionBundle::new();
        let dashboard = render_dashboard(&StaticProvider { fail_trend: false }, &config, &mut bundle).unwrap();

        let ids: Vec<&str> = bundle.element_ids().collect();
        assert_eq!(
            ids,
            vec![CHILDREN_ELEMENT, DETAILS_ELEMENT, OVERVIEW_ELEMENT, TREND_ELEMENT]
        );
        assert_eq!(dashboard.overview.height_px(), 2 * 31 + 150);
        assert_eq!(dashboard.trend.height_px(), dashboard.overview.height_px());
        assert_eq!(dashboard.children.filter().children, vec!["a", "b"]);
        assert_eq!(dashboard.tree.option()["series"][0]["data"][0]["value"][0], 4);
    }

    #[test]
    fn test_dashboard_applies_config() {
        let config: crate::config::CovviewConfig = serde_json::from_str(
            r#"{"exclude": ["gen/**"], "heatmap_range": {"min": 90.0, "max": 100.0}}"#,
        )
        .unwrap();
        let config = config.resolve().unwrap();
        let mut bundle = OptionBundle::new();
        let dashboard = render_dashboard(&StaticProvider { fail_trend: false }, &config, &mut bundle).unwrap();

        assert_eq!(dashboard.tree.option()["series"][0]["data"][0]["value"][0], 3);
        assert_eq!(dashboard.children.filter().children, vec!["a"]);
        assert_eq!(dashboard.children.range(), PercentageRange::new(90.0, 100.0).unwrap());
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let config = ResolvedConfig::defaults().unwrap();
        let mut bundle = OptionBundle::new();
        let err = render_dashboard(&StaticProvider { fail_trend: true }, &config, &mut bundle).unwrap_err();
        assert!(format!("{:#}", err).contains("trend unavailable"));
    }
}
