//! covview CLI - render coverage chart models from a view-model directory

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - Logs go to stderr, reports to stdout

use anyhow::Context;
use clap::{Parser, Subcommand};
use covview_core::color::ColorProvider;
use covview_core::config::{self, ResolvedConfig};
use covview_core::heatmap::{filter_children, heatmap_chart, initial_filter, PercentageRange};
use covview_core::overview::build_overview;
use covview_core::report::{
    render_children_text, render_overview_text, render_tree_text, render_trend_text,
};
use covview_core::treemap::{metric_label, tree_map_chart, tree_map_model};
use covview_core::trend::{build_trend, latest_changes, TREND_HEIGHT_PX};
use covview_core::{atomic_write, render_dashboard, render_json, CoverageDataProvider};
use covview_core::{JsonDirProvider, OptionBundle};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "covview")]
#[command(about = "Coverage chart models: overview, tree-map, heat-map and trend")]
#[command(version = env!("COVVIEW_VERSION"))]
struct Cli {
    /// Directory holding the view-model JSON files
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,

    /// Path to config file (default: auto-discover in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Covered and missed units per metric
    Overview {
        /// Chart title (XML entities are unescaped)
        #[arg(long)]
        title: Option<String>,
    },
    /// Children whose coverage falls into a percentage range
    Children {
        /// Lower bound of the range (overrides config file)
        #[arg(long)]
        min: Option<f64>,

        /// Upper bound of the range (overrides config file)
        #[arg(long)]
        max: Option<f64>,

        /// What the children are, e.g. "Package"
        #[arg(long)]
        group: Option<String>,
    },
    /// Coverage history of previous builds
    Trend,
    /// Module/package/file coverage tree
    Tree {
        /// Coverage metric (overrides config file)
        #[arg(long)]
        metric: Option<String>,

        /// Depth shown in text output
        #[arg(long, default_value = "3")]
        depth: usize,
    },
    /// Print the rendered source of a file
    Source {
        /// File hash as used by the report
        hash: String,
    },
    /// Render all dashboard charts into one JSON document
    Dashboard {
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate or show the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without rendering anything
    Validate,
    /// Show the resolved configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Copy, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    /// Plain text table
    Text,
    /// Model as JSON
    Json,
    /// Chart option as JSON
    Chart,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    if let Commands::Config { action } = &cli.command {
        return handle_config(action, &cli.data_dir, cli.config.as_deref());
    }

    let resolved = config::load_and_resolve(&cli.data_dir, cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(config_path) = &resolved.config_path {
        tracing::info!(config = %config_path.display(), "using config");
    }
    let provider = JsonDirProvider::new(&cli.data_dir)?;
    let policy = resolved.zero_denominator;

    match cli.command {
        Commands::Overview { title } => {
            let overview = build_overview(&provider.results()?, policy, resolved.overview_min_total);
            match cli.format {
                OutputFormat::Text => print!("{}", render_overview_text(&overview)),
                OutputFormat::Json => println!("{}", render_json(&overview)?),
                OutputFormat::Chart => {
                    let chart = overview.to_chart(title.as_deref(), &resolved.palette);
                    println!("{}", render_json(&chart)?);
                }
            }
        }
        Commands::Children { min, max, group } => {
            let children = provider.child_results()?;
            let (range, filter) = match (min, max) {
                (None, None) => initial_filter(&children, resolved.heatmap_range),
                (min, max) => {
                    let range = PercentageRange::new(
                        min.unwrap_or(resolved.heatmap_range.lo()),
                        max.unwrap_or(resolved.heatmap_range.hi()),
                    )
                    .context("invalid --min/--max")?;
                    (range, filter_children(&children, range))
                }
            };
            match cli.format {
                OutputFormat::Text => print!("{}", render_children_text(&filter)),
                OutputFormat::Json => println!("{}", render_json(&filter)?),
                OutputFormat::Chart => {
                    let chart = heatmap_chart(&filter, range, group.as_deref());
                    println!("{}", render_json(&chart)?);
                }
            }
        }
        Commands::Trend => {
            let trend_results = provider.trend_results()?;
            let trend = build_trend(&trend_results, policy);
            match cli.format {
                OutputFormat::Text => {
                    let changes = latest_changes(&trend_results, policy, &ColorProvider::default());
                    print!("{}", render_trend_text(&trend, &changes));
                }
                OutputFormat::Json => println!("{}", render_json(&trend)?),
                OutputFormat::Chart => println!("{}", render_json(&trend.to_chart(TREND_HEIGHT_PX))?),
            }
        }
        Commands::Tree { metric, depth } => {
            let metric = metric.unwrap_or_else(|| resolved.tree_metric.clone());
            let mut tree = provider.coverage_tree(&metric)?;
            if resolved.filters_files() {
                tree.retain_files(&|path: &str| resolved.should_include(path));
            }
            match cli.format {
                OutputFormat::Text => print!("{}", render_tree_text(&tree, depth)),
                OutputFormat::Json => println!("{}", render_json(&tree)?),
                OutputFormat::Chart => {
                    let model = tree_map_model(&tree, &ColorProvider::default());
                    println!("{}", render_json(&tree_map_chart(&model, &metric_label(&metric)))?);
                }
            }
        }
        Commands::Source { hash } => {
            print!("{}", provider.source_code(&hash)?);
        }
        Commands::Dashboard { output } => {
            let mut bundle = OptionBundle::new();
            render_dashboard(&provider, &resolved, &mut bundle)?;
            let json = bundle.to_json()?;
            match output {
                Some(path) => {
                    atomic_write(&path, &json)?;
                    eprintln!("Dashboard written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        // handled before the config is resolved
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config(action: &ConfigAction, data_dir: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    match action {
        ConfigAction::Validate => match config::load_and_resolve(data_dir, config_path) {
            Ok(config) => {
                if let Some(ref p) = config.config_path {
                    println!("Config valid: {}", p.display());
                } else {
                    println!("No config file found. Using defaults.");
                }
            }
            Err(e) => {
                eprintln!("Config validation failed: {:#}", e);
                std::process::exit(1);
            }
        },
        ConfigAction::Show => {
            let resolved = config::load_and_resolve(data_dir, config_path)
                .context("failed to load configuration")?;
            print_config(&resolved);
        }
    }
    Ok(())
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Ratios:");
    println!("  zero_denominator: {}", resolved.zero_denominator.as_str());
    println!();
    println!("Charts:");
    println!(
        "  heatmap_range: {}..{}",
        resolved.heatmap_range.lo(),
        resolved.heatmap_range.hi()
    );
    println!("  overview_min_total: {}", resolved.overview_min_total);
    println!("  tree_metric: {}", resolved.tree_metric);
    println!("  palette.covered: {}", resolved.palette.covered.to_rgb_hex());
    println!("  palette.missed: {}", resolved.palette.missed.to_rgb_hex());
    println!();
    println!("Filters:");
    println!(
        "  include: {}",
        if resolved.include.is_some() {
            "custom patterns"
        } else {
            "all files"
        }
    );
    println!(
        "  exclude: {}",
        if resolved.exclude.is_empty() {
            "none"
        } else {
            "custom patterns"
        }
    );
}
