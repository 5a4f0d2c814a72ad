//! Coverage tree and its tree-map chart model
//!
//! Global invariants enforced:
//! - File values are authoritative; package and module values are rollups
//! - Children are ordered by name
//! - Packages left without files after filtering are removed

use crate::color::{coverage_level_colors, ColorProvider};
use crate::labels::format_percentage;
use crate::render::ChartModel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Separates components of input file paths
pub const PATH_SEPARATOR: char = '/';

/// Joins collapsed package names and tooltip paths
pub const NAME_SEPARATOR: &str = ".";

/// Tree-map height; the tree-map fills its container
pub const TREE_MAP_HEIGHT_PX: u32 = 600;

/// Level of a node in the coverage tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Module,
    Package,
    File,
}

/// Coverage of one element of the source tree for a single metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageNode {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub covered: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CoverageNode>,
}

/// Flat per-file coverage, as exported by most report parsers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    pub path: String,
    pub covered: u64,
    pub total: u64,
}

impl CoverageNode {
    pub fn module(name: impl Into<String>) -> Self {
        Self::container(name, NodeKind::Module)
    }

    pub fn package(name: impl Into<String>) -> Self {
        Self::container(name, NodeKind::Package)
    }

    fn container(name: impl Into<String>, kind: NodeKind) -> Self {
        CoverageNode {
            name: name.into(),
            kind,
            covered: 0,
            total: 0,
            children: Vec::new(),
        }
    }

    pub fn file(name: impl Into<String>, covered: u64, total: u64) -> Result<Self> {
        let name = name.into();
        if covered > total {
            anyhow::bail!("file '{}' covers {} of only {} units", name, covered, total);
        }
        Ok(CoverageNode {
            name,
            kind: NodeKind::File,
            covered,
            total,
            children: Vec::new(),
        })
    }

    pub fn with_children(mut self, children: Vec<CoverageNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn missed(&self) -> u64 {
        self.total.saturating_sub(self.covered)
    }

    /// Covered percentage, `None` when there is nothing to cover
    pub fn covered_percentage(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(100.0 * self.covered as f64 / self.total as f64)
        }
    }

    /// Build a module/package/file tree from `/`-separated file paths
    pub fn from_files(root_name: &str, files: &[FileCoverage]) -> Result<Self> {
        let mut root = CoverageNode::module(root_name);

        for file in files {
            let parts: Vec<&str> = file
                .path
                .split(PATH_SEPARATOR)
                .filter(|part| !part.is_empty() && *part != ".")
                .collect();
            let Some((file_name, packages)) = parts.split_last() else {
                anyhow::bail!("empty file path in coverage list");
            };

            let mut node = &mut root;
            for package in packages {
                node = node
                    .child_package(package)
                    .with_context(|| format!("invalid file path: {}", file.path))?;
            }
            if node.children.iter().any(|child| child.name == *file_name) {
                anyhow::bail!("duplicate file path: {}", file.path);
            }
            let leaf = CoverageNode::file(*file_name, file.covered, file.total)
                .with_context(|| format!("invalid coverage for {}", file.path))?;
            node.children.push(leaf);
        }

        root.sort_children();
        root.rollup();
        Ok(root)
    }

    fn child_package(&mut self, name: &str) -> Result<&mut CoverageNode> {
        match self.children.iter().position(|child| child.name == name) {
            Some(index) => {
                if self.children[index].is_file() {
                    anyhow::bail!("'{}' is used both as a file and as a package", name);
                }
                Ok(&mut self.children[index])
            }
            None => {
                let index = self.children.len();
                self.children.push(CoverageNode::package(name));
                Ok(&mut self.children[index])
            }
        }
    }

    fn sort_children(&mut self) {
        self.children.sort_by(|a, b| a.name.cmp(&b.name));
        for child in &mut self.children {
            child.sort_children();
        }
    }

    /// Recompute package and module values as the sum of their children
    ///
    /// Containers without children keep the values they carry.
    pub fn rollup(&mut self) -> (u64, u64) {
        if !self.is_file() && !self.children.is_empty() {
            let (mut covered, mut total) = (0, 0);
            for child in &mut self.children {
                let (c, t) = child.rollup();
                covered += c;
                total += t;
            }
            self.covered = covered;
            self.total = total;
        }
        (self.covered, self.total)
    }

    /// Drop files whose path (relative to this node) fails `keep`, then roll up
    ///
    /// Returns the number of files removed.
    pub fn retain_files<F: Fn(&str) -> bool>(&mut self, keep: &F) -> usize {
        let removed = retain_in(self, "", keep);
        self.rollup();
        removed
    }

    /// Check `covered <= total` everywhere in the tree
    pub fn validate(&self) -> Result<()> {
        if self.covered > self.total {
            anyhow::bail!(
                "node '{}' covers {} of only {} units",
                self.name,
                self.covered,
                self.total
            );
        }
        for child in &self.children {
            child
                .validate()
                .with_context(|| format!("in '{}'", self.name))?;
        }
        Ok(())
    }

    pub fn file_count(&self) -> usize {
        if self.is_file() {
            1
        } else {
            self.children.iter().map(CoverageNode::file_count).sum()
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", prefix, PATH_SEPARATOR, name)
    }
}

fn retain_in<F: Fn(&str) -> bool>(node: &mut CoverageNode, prefix: &str, keep: &F) -> usize {
    let had_children = !node.children.is_empty();
    let mut removed = 0;
    node.children.retain_mut(|child| {
        let path = join_path(prefix, &child.name);
        if child.is_file() {
            let kept = keep(&path);
            if !kept {
                removed += 1;
            }
            kept
        } else {
            let had_children = !child.children.is_empty();
            removed += retain_in(child, &path, keep);
            !(had_children && child.children.is_empty())
        }
    });
    // nothing left to roll up
    if had_children && node.children.is_empty() {
        node.covered = 0;
        node.total = 0;
    }
    removed
}

/// Fill and border colours of a tree-map node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStyle {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLabel {
    pub show: bool,
    pub color: String,
}

/// Tree-map node in the shape the charting library expects
///
/// `value` is `[total, covered]`; the library sizes by the first entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeMapNode {
    pub name: String,
    pub value: [u64; 2],
    pub item_style: ItemStyle,
    pub label: NodeLabel,
    pub upper_label: NodeLabel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeMapNode>,
}

impl TreeMapNode {
    pub fn total(&self) -> u64 {
        self.value[0]
    }

    pub fn covered(&self) -> u64 {
        self.value[1]
    }

    /// Merge this node's chain of single-package packages into one dotted name
    ///
    /// Only the chain starting at this node is merged; descendants keep
    /// their names.
    pub fn collapse_empty_packages(&mut self) {
        while self.children.len() == 1 && !self.children[0].children.is_empty() {
            let child = self.children.remove(0);
            self.name = format!("{}{}{}", self.name, NAME_SEPARATOR, child.name);
            self.children = child.children;
        }
    }
}

/// Convert a coverage tree node by node
pub fn to_tree_map_node(node: &CoverageNode, colors: &ColorProvider) -> TreeMapNode {
    let percentage = node.covered_percentage().unwrap_or(-1.0);
    let display = coverage_level_colors(percentage, colors);
    let line = display.line.to_rgb_hex();
    let fill = display.fill.to_rgb_hex();

    let item_style = if node.is_file() {
        ItemStyle {
            color: fill,
            border_color: None,
            border_width: None,
        }
    } else {
        ItemStyle {
            color: fill.clone(),
            border_color: Some(fill),
            border_width: Some(4),
        }
    };
    let label = NodeLabel {
        show: true,
        color: line,
    };

    TreeMapNode {
        name: node.name.clone(),
        value: [node.total, node.covered],
        item_style,
        upper_label: label.clone(),
        label,
        children: node
            .children
            .iter()
            .map(|child| to_tree_map_node(child, colors))
            .collect(),
    }
}

/// Tree-map model: converted tree with package chains collapsed below the root
pub fn tree_map_model(node: &CoverageNode, colors: &ColorProvider) -> TreeMapNode {
    let mut root = to_tree_map_node(node, colors);
    for child in &mut root.children {
        child.collapse_empty_packages();
    }
    root
}

/// Tooltip for a node, given the names from the chart root down to it
///
/// The first two entries (series root and data root) are not shown.
pub fn tooltip_text(tree_path: &[&str], value: [u64; 2], metric_label: &str) -> String {
    let title = tree_path
        .iter()
        .skip(2)
        .copied()
        .collect::<Vec<_>>()
        .join(NAME_SEPARATOR);
    let [total, covered] = value;
    if total == 0 {
        return format!("{}\n{}: n/a", title, metric_label);
    }
    format!(
        "{}\n{}: {} (covered: {}, missed: {})",
        title,
        metric_label,
        format_percentage(100.0 * covered as f64 / total as f64),
        covered,
        total - covered
    )
}

fn level_options() -> Value {
    let mut levels = vec![
        json!({
            "itemStyle": { "borderColor": "black", "borderWidth": 0, "gapWidth": 1 },
            "upperLabel": { "show": false }
        }),
        json!({
            "itemStyle": { "borderColor": "#ddd", "borderWidth": 2, "gapWidth": 2 }
        }),
    ];
    for depth in 0..8 {
        let saturation = if depth % 2 == 0 { 0.6 } else { 0.7 };
        levels.push(json!({
            "itemStyle": { "borderWidth": 4, "gapWidth": 2, "borderColorSaturation": saturation }
        }));
    }
    Value::Array(levels)
}

/// Tree-map chart for a converted tree
pub fn tree_map_chart(root: &TreeMapNode, metric_label: &str) -> ChartModel {
    let option = json!({
        "tooltip": {},
        "series": [{
            "name": metric_label,
            "type": "treemap",
            "breadcrumb": {
                "itemStyle": { "color": "#A4A4A4" },
                "emphasis": { "itemStyle": { "opacity": 0.6 } }
            },
            "width": "100%",
            "height": "95%",
            "top": "top",
            "label": { "show": true, "formatter": "{b}" },
            "upperLabel": {
                "show": true,
                "height": 30,
                "color": "black",
                "borderColorSaturation": 0.6,
                "colorSaturation": 0.6
            },
            "itemStyle": { "borderColor": "#fff" },
            "levels": level_options(),
            "data": [root]
        }]
    });

    ChartModel {
        height_px: TREE_MAP_HEIGHT_PX,
        option,
    }
}

/// Series label for a metric id, `line` becomes `Line Coverage`
pub fn metric_label(metric: &str) -> String {
    let mut chars = metric.chars();
    match chars.next() {
        Some(first) => format!("{}{} Coverage", first.to_uppercase(), chars.as_str()),
        None => "Coverage".to_string(),
    }
}
