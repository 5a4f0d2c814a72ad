//! Coverage data provider
//!
//! The provider is the server-side view model: it hands out precomputed
//! results and never computes coverage itself. Calls are synchronous; the
//! caller decides when to fetch.

use crate::model::{ChildResults, MetricResult, TrendResults};
use crate::treemap::{CoverageNode, FileCoverage};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Source of the data behind a coverage report
pub trait CoverageDataProvider {
    /// Project-level results, one per metric
    fn results(&self) -> Result<Vec<MetricResult>>;

    /// Per-child results, keyed by child name
    fn child_results(&self) -> Result<ChildResults>;

    /// Project-level results of previous builds, newest first
    fn trend_results(&self) -> Result<TrendResults>;

    /// Module/package/file tree for one metric, values rolled up
    fn coverage_tree(&self, metric: &str) -> Result<CoverageNode>;

    /// Rendered source of one file
    fn source_code(&self, file_hash: &str) -> Result<String>;
}

/// On-disk form of a coverage tree: nested nodes or a flat file list
#[derive(Deserialize)]
#[serde(untagged)]
enum TreeDocument {
    Tree(CoverageNode),
    Files { root: String, files: Vec<FileCoverage> },
}

/// Provider reading the view model from a directory of JSON files
///
/// Layout:
/// - `results.json`, `children.json`, `trend.json`
/// - `tree-<metric>.json`, falling back to `tree.json`
/// - `source/<hash>.html`
#[derive(Debug, Clone)]
pub struct JsonDirProvider {
    root: PathBuf,
}

impl JsonDirProvider {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("data directory does not exist: {}", root.display());
        }
        Ok(JsonDirProvider { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.root.join(name);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::debug!(file = %path.display(), "view model loaded");
        Ok(value)
    }

    fn tree_file(&self, metric: &str) -> Result<String> {
        validate_key("metric", metric)?;
        let specific = format!("tree-{}.json", metric.to_ascii_lowercase());
        if self.root.join(&specific).exists() {
            return Ok(specific);
        }
        Ok("tree.json".to_string())
    }
}

/// Restrict names that end up in file paths to `[A-Za-z0-9_-]`
fn validate_key(what: &str, key: &str) -> Result<()> {
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        anyhow::bail!("invalid {} '{}': only letters, digits, '_' and '-' are allowed", what, key);
    }
    Ok(())
}

impl CoverageDataProvider for JsonDirProvider {
    fn results(&self) -> Result<Vec<MetricResult>> {
        self.read_json("results.json")
    }

    fn child_results(&self) -> Result<ChildResults> {
        let children: ChildResults = self.read_json("children.json")?;
        for (child, results) in &children {
            if results.is_empty() {
                tracing::warn!(child = %child, "child has no results");
            }
        }
        Ok(children)
    }

    fn trend_results(&self) -> Result<TrendResults> {
        self.read_json("trend.json")
    }

    fn coverage_tree(&self, metric: &str) -> Result<CoverageNode> {
        let file = self.tree_file(metric)?;
        let mut tree = match self.read_json::<TreeDocument>(&file)? {
            TreeDocument::Tree(tree) => tree,
            TreeDocument::Files { root, files } => CoverageNode::from_files(&root, &files)
                .with_context(|| format!("invalid file list in {}", file))?,
        };
        tree.validate()
            .with_context(|| format!("inconsistent coverage tree in {}", file))?;
        tree.rollup();
        Ok(tree)
    }

    fn source_code(&self, file_hash: &str) -> Result<String> {
        validate_key("file hash", file_hash)?;
        let path = self.root.join("source").join(format!("{}.html", file_hash));
        std::fs::read_to_string(&path)
            .with_context(|| format!("no source code for '{}' ({})", file_hash, path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn provider_with(files: &[(&str, &str)]) -> (tempfile::TempDir, JsonDirProvider) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let provider = JsonDirProvider::new(dir.path()).unwrap();
        (dir, provider)
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonDirProvider::new(dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_results_and_missing_file() {
        let (_dir, provider) = provider_with(&[(
            "results.json",
            r#"[{"name": "Line", "ratio": {"numerator": 3.0, "denominator": 4.0}}]"#,
        )]);
        let results = provider.results().unwrap();
        assert_eq!(results[0].ratio.numerator(), 3);

        let err = provider.trend_results().unwrap_err();
        assert!(format!("{:#}", err).contains("trend.json"));
    }

    #[test]
    fn test_tree_prefers_metric_file() {
        let (_dir, provider) = provider_with(&[
            (
                "tree.json",
                r#"{"root": "fallback", "files": [{"path": "a.rs", "covered": 1, "total": 1}]}"#,
            ),
            (
                "tree-branch.json",
                r#"{"name": "branches", "kind": "module", "children": [
                    {"name": "b.rs", "kind": "file", "covered": 1, "total": 4}
                ]}"#,
            ),
        ]);
        let branch = provider.coverage_tree("Branch").unwrap();
        assert_eq!(branch.name, "branches");
        assert_eq!((branch.covered, branch.total), (1, 4));

        let line = provider.coverage_tree("line").unwrap();
        assert_eq!(line.name, "fallback");
        assert_eq!(line.file_count(), 1);
    }

    #[test]
    fn test_inconsistent_tree_is_rejected() {
        let (_dir, provider) = provider_with(&[(
            "tree.json",
            r#"{"name": "m", "kind": "module", "children": [
                {"name": "b.rs", "kind": "file", "covered": 5, "total": 4}
            ]}"#,
        )]);
        assert!(provider.coverage_tree("line").is_err());
    }

    #[test]
    fn test_source_code_hash_is_validated() {
        let (_dir, provider) = provider_with(&[("source/abc-123.html", "<pre>fn main() {}</pre>")]);
        assert_eq!(provider.source_code("abc-123").unwrap(), "<pre>fn main() {}</pre>");
        assert!(provider.source_code("../results").is_err());
        assert!(provider.source_code("").is_err());
        assert!(provider.source_code("missing").is_err());
        assert!(provider.coverage_tree("../x").is_err());
    }
}
