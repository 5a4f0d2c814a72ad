//! Configuration file support for covview
//!
//! Loads report-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.covviewrc.json` in the data directory
//! 3. `covview.config.json` in the data directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::color::{ChartPalette, Rgba};
use crate::heatmap::PercentageRange;
use crate::ratio::ZeroDenominatorPolicy;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metric shown in the tree-map when none is configured
const DEFAULT_TREE_METRIC: &str = "line";

/// covview configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CovviewConfig {
    /// Glob patterns for files shown in the tree-map (default: all)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for files hidden from the tree-map (default: none)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Percentage used for ratios with nothing to cover (default: zero)
    #[serde(default)]
    pub zero_denominator: Option<ZeroDenominatorPolicy>,

    /// Initial heat-map range (default: 0..100)
    #[serde(default)]
    pub heatmap_range: Option<RangeConfig>,

    /// Overview skips metrics whose total is at or below this (default: 0)
    #[serde(default)]
    pub overview_min_total: Option<u64>,

    /// Metric of the coverage tree (default: "line")
    #[serde(default)]
    pub tree_metric: Option<String>,

    /// Bar colours of the overview
    #[serde(default)]
    pub palette: Option<PaletteConfig>,
}

/// Initial heat-map percentage range
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeConfig {
    /// Lower bound (default: 0.0)
    pub min: Option<f64>,
    /// Upper bound (default: 100.0)
    pub max: Option<f64>,
}

/// Overview bar colours as `#RRGGBB` strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaletteConfig {
    /// Covered bar (default: #A5D6A7)
    pub covered: Option<String>,
    /// Missed bar (default: #EF9A9A)
    pub missed: Option<String>,
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Compiled include patterns (None means include all)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    pub zero_denominator: ZeroDenominatorPolicy,
    pub heatmap_range: PercentageRange,
    pub overview_min_total: u64,
    pub tree_metric: String,
    pub palette: ChartPalette,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl CovviewConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref range) = self.heatmap_range {
            let min = range.min.unwrap_or(0.0);
            let max = range.max.unwrap_or(100.0);
            PercentageRange::new(min, max).context("invalid heatmap_range")?;
        }

        if let Some(ref metric) = self.tree_metric {
            if metric.trim().is_empty() {
                anyhow::bail!("tree_metric must not be empty");
            }
            if !metric
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                anyhow::bail!(
                    "tree_metric may only contain letters, digits, '_' and '-' (got {})",
                    metric
                );
            }
        }

        if let Some(ref palette) = self.palette {
            for (name, value) in [("covered", &palette.covered), ("missed", &palette.missed)] {
                if let Some(hex) = value {
                    Rgba::parse_hex(hex).with_context(|| format!("invalid palette.{}", name))?;
                }
            }
        }

        // Validate glob patterns compile
        for pattern in &self.include {
            Glob::new(pattern).with_context(|| format!("invalid include pattern: {}", pattern))?;
        }
        for pattern in &self.exclude {
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let include = if self.include.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &self.include {
                builder.add(Glob::new(pattern)?);
            }
            Some(builder.build()?)
        };

        let exclude = {
            let mut builder = GlobSetBuilder::new();
            for pattern in &self.exclude {
                builder.add(Glob::new(pattern)?);
            }
            builder.build()?
        };

        let heatmap_range = match &self.heatmap_range {
            Some(range) => {
                PercentageRange::new(range.min.unwrap_or(0.0), range.max.unwrap_or(100.0))?
            }
            None => PercentageRange::FULL,
        };

        let mut palette = ChartPalette::default();
        if let Some(ref configured) = self.palette {
            if let Some(ref hex) = configured.covered {
                palette.covered = Rgba::parse_hex(hex)?;
            }
            if let Some(ref hex) = configured.missed {
                palette.missed = Rgba::parse_hex(hex)?;
            }
        }

        Ok(ResolvedConfig {
            include,
            exclude,
            zero_denominator: self.zero_denominator.unwrap_or_default(),
            heatmap_range,
            overview_min_total: self.overview_min_total.unwrap_or(0),
            tree_metric: self
                .tree_metric
                .clone()
                .unwrap_or_else(|| DEFAULT_TREE_METRIC.to_string()),
            palette,
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Check if a file path should be shown based on include/exclude patterns
    pub fn should_include(&self, path: &str) -> bool {
        if self.exclude.is_match(path) {
            return false;
        }

        if let Some(ref include) = self.include {
            return include.is_match(path);
        }

        true
    }

    /// True when include or exclude patterns are configured
    pub fn filters_files(&self) -> bool {
        self.include.is_some() || !self.exclude.is_empty()
    }

    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        CovviewConfig::default().resolve()
    }
}

/// Discover and load a config file from the data directory
///
/// Search order:
/// 1. `.covviewrc.json`
/// 2. `covview.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(data_dir: &Path) -> Result<Option<(CovviewConfig, PathBuf)>> {
    for name in [".covviewrc.json", "covview.config.json"] {
        let path = data_dir.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }

    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<CovviewConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: CovviewConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a data directory
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in the data directory.
/// Returns default config if nothing is found.
pub fn load_and_resolve(data_dir: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(data_dir)? {
            Some((config, path)) => (config, Some(path)),
            None => (CovviewConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    tracing::debug!(
        config = ?resolved.config_path,
        zero_denominator = resolved.zero_denominator.as_str(),
        "configuration resolved"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = CovviewConfig::default();
        config.validate().expect("default config should be valid");
        let resolved = config.resolve().expect("default config should resolve");
        assert!(resolved.include.is_none());
        assert!(!resolved.filters_files());
        assert_eq!(resolved.zero_denominator, ZeroDenominatorPolicy::Zero);
        assert_eq!(resolved.heatmap_range, PercentageRange::FULL);
        assert_eq!(resolved.overview_min_total, 0);
        assert_eq!(resolved.tree_metric, "line");
        assert_eq!(resolved.palette, ChartPalette::default());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r##"{
            "include": ["src/**"],
            "exclude": ["**/generated/**"],
            "zero_denominator": "full",
            "heatmap_range": {"min": 50.0, "max": 90.0},
            "overview_min_total": 1,
            "tree_metric": "branch",
            "palette": {"covered": "#00FF00", "missed": "#FF0000"}
        }"##;
        let config: CovviewConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert!(resolved.include.is_some());
        assert_eq!(resolved.zero_denominator, ZeroDenominatorPolicy::Full);
        assert_eq!(resolved.heatmap_range, PercentageRange::new(50.0, 90.0).unwrap());
        assert_eq!(resolved.overview_min_total, 1);
        assert_eq!(resolved.tree_metric, "branch");
        assert_eq!(resolved.palette.covered, Rgba::rgb(0, 255, 0));
        assert_eq!(resolved.palette.missed, Rgba::rgb(255, 0, 0));
    }

    #[test]
    fn test_partial_range_uses_defaults_for_rest() {
        let json = r#"{"heatmap_range": {"min": 80.0}}"#;
        let config: CovviewConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.heatmap_range.lo(), 80.0);
        assert_eq!(resolved.heatmap_range.hi(), 100.0);
    }

    #[test]
    fn test_reject_unknown_fields() {
        let json = r#"{"unknown_field": true}"#;
        let result: Result<CovviewConfig, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown fields should be rejected");
    }

    #[test]
    fn test_reject_unknown_policy() {
        let json = r#"{"zero_denominator": "half"}"#;
        let result: Result<CovviewConfig, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_bad_ranges() {
        for json in [
            r#"{"heatmap_range": {"min": 90.0, "max": 10.0}}"#,
            r#"{"heatmap_range": {"min": -1.0}}"#,
            r#"{"heatmap_range": {"max": 101.0}}"#,
        ] {
            let config: CovviewConfig = serde_json::from_str(json).unwrap();
            assert!(config.validate().is_err(), "{} should be rejected", json);
        }
    }

    #[test]
    fn test_reject_bad_palette() {
        let json = r#"{"palette": {"covered": "green"}}"#;
        let config: CovviewConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_bad_tree_metric() {
        for json in [r#"{"tree_metric": " "}"#, r#"{"tree_metric": "../line"}"#] {
            let config: CovviewConfig = serde_json::from_str(json).unwrap();
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_reject_invalid_glob_pattern() {
        let json = r#"{"include": ["[invalid"]}"#;
        let config: CovviewConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_include_custom_patterns() {
        let config: CovviewConfig = serde_json::from_str(
            r#"{
            "include": ["src/**"],
            "exclude": ["src/generated/**"]
        }"#,
        )
        .unwrap();
        let resolved = config.resolve().unwrap();
        assert!(resolved.filters_files());
        assert!(resolved.should_include("src/api.rs"));
        assert!(!resolved.should_include("lib/util.rs"));
        assert!(!resolved.should_include("src/generated/types.rs"));
    }

    #[test]
    fn test_discover_covviewrc() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".covviewrc.json");
        fs::write(&config_path, r#"{"overview_min_total": 5}"#).unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.overview_min_total, Some(5));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();

        fs::write(dir.path().join(".covviewrc.json"), r#"{"tree_metric": "line"}"#).unwrap();
        fs::write(
            dir.path().join("covview.config.json"),
            r#"{"tree_metric": "branch"}"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(
            config.tree_metric.as_deref(),
            Some("line"),
            ".covviewrc.json should take priority"
        );
    }

    #[test]
    fn test_discover_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("covview.config.json"), "{not json").unwrap();
        assert!(discover_config(dir.path()).is_err());
    }

    #[test]
    fn test_no_config_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_and_resolve_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.tree_metric, "line");
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"zero_denominator": "full"}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.zero_denominator, ZeroDenominatorPolicy::Full);
        assert_eq!(resolved.config_path, Some(config_path));
    }
}
