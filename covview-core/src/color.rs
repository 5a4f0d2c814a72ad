//! Colorization of coverage values and coverage changes
//!
//! Global invariants enforced:
//! - Level tables are ordered from the highest threshold to the lowest
//! - Values between two levels blend the neighbouring fill colours by distance
//! - Negative blend weights are rejected

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 8-bit RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    /// `#RRGGBB`
    pub fn to_rgb_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// `#RRGGBBAA`
    pub fn to_rgba_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`
    pub fn parse_hex(value: &str) -> Result<Self> {
        let digits = value
            .strip_prefix('#')
            .with_context(|| format!("colour must start with '#': {}", value))?;
        if !digits.is_ascii() || (digits.len() != 6 && digits.len() != 8) {
            anyhow::bail!("colour must be #RRGGBB or #RRGGBBAA: {}", value);
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex digits in colour: {}", value))
        };
        let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Rgba::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }
}

/// Semantic colour slots of the palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorId {
    Outstanding,
    Excellent,
    VeryGood,
    Good,
    Average,
    Inadequate,
    Bad,
    VeryBad,
    Insufficient,
    White,
    Black,
}

/// Line (text/border) and fill colour pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayColors {
    pub line: Rgba,
    pub fill: Rgba,
}

/// Returned for colour ids the provider does not know
pub const DEFAULT_COLORS: DisplayColors = DisplayColors {
    line: Rgba::rgb(0, 0, 0),
    fill: Rgba::rgb(255, 255, 255),
};

/// (id, fill, line)
const DEFAULT_PALETTE: &[(ColorId, Rgba, Rgba)] = &[
    (ColorId::White, Rgba::rgb(255, 255, 255), Rgba::rgb(0, 0, 0)),
    (ColorId::Black, Rgba::rgb(0, 0, 0), Rgba::rgb(255, 255, 255)),
    (ColorId::Insufficient, Rgba::rgb(230, 0, 31), Rgba::rgb(255, 255, 255)),
    (ColorId::VeryBad, Rgba::rgb(255, 77, 101), Rgba::rgb(255, 255, 255)),
    (ColorId::Bad, Rgba::rgb(254, 130, 10), Rgba::rgb(0, 0, 0)),
    (ColorId::Inadequate, Rgba::rgb(254, 182, 112), Rgba::rgb(0, 0, 0)),
    (ColorId::Average, Rgba::rgb(255, 204, 0), Rgba::rgb(0, 0, 0)),
    (ColorId::Good, Rgba::rgb(255, 224, 102), Rgba::rgb(0, 0, 0)),
    (ColorId::VeryGood, Rgba::rgb(75, 223, 124), Rgba::rgb(0, 0, 0)),
    (ColorId::Excellent, Rgba::rgb(30, 166, 75), Rgba::rgb(255, 255, 255)),
    (ColorId::Outstanding, Rgba::rgb(0, 130, 0), Rgba::rgb(255, 255, 255)),
];

/// Blend two colours channel by channel, weighted
pub fn blend_weighted(first: Rgba, second: Rgba, weight_first: f64, weight_second: f64) -> Result<Rgba> {
    if weight_first < 0.0 || weight_second < 0.0 {
        anyhow::bail!(
            "colour weights must be non-negative (got {} and {})",
            weight_first,
            weight_second
        );
    }
    let total = weight_first + weight_second;
    let (w1, w2, total) = if total == 0.0 {
        (1.0, 1.0, 2.0)
    } else {
        (weight_first, weight_second, total)
    };
    let mix = |a: u8, b: u8| ((a as f64 * w1 + b as f64 * w2) / total) as u8;
    Ok(Rgba::rgba(
        mix(first.r, second.r),
        mix(first.g, second.g),
        mix(first.b, second.b),
        mix(first.a, second.a),
    ))
}

/// Lookup of display colours by [`ColorId`]
#[derive(Debug, Clone)]
pub struct ColorProvider {
    colors: HashMap<ColorId, DisplayColors>,
}

impl Default for ColorProvider {
    fn default() -> Self {
        let colors = DEFAULT_PALETTE
            .iter()
            .map(|&(id, fill, line)| (id, DisplayColors { line, fill }))
            .collect();
        ColorProvider { colors }
    }
}

impl ColorProvider {
    pub fn contains(&self, id: ColorId) -> bool {
        self.colors.contains_key(&id)
    }

    pub fn display_colors(&self, id: ColorId) -> DisplayColors {
        self.colors.get(&id).copied().unwrap_or(DEFAULT_COLORS)
    }

    /// Blend two palette entries; the line colour follows the heavier weight
    pub fn blended_display_colors(
        &self,
        weight_first: f64,
        weight_second: f64,
        first: ColorId,
        second: ColorId,
    ) -> Result<DisplayColors> {
        if !self.contains(first) || !self.contains(second) {
            return Ok(DEFAULT_COLORS);
        }
        let first = self.display_colors(first);
        let second = self.display_colors(second);
        let line = if weight_first > weight_second {
            first.line
        } else {
            second.line
        };
        let fill = blend_weighted(first.fill, second.fill, weight_first, weight_second)?;
        Ok(DisplayColors { line, fill })
    }
}

/// Covered/missed bar colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPalette {
    pub covered: Rgba,
    pub missed: Rgba,
}

impl Default for ChartPalette {
    fn default() -> Self {
        ChartPalette {
            covered: Rgba::rgb(0xA5, 0xD6, 0xA7),
            missed: Rgba::rgb(0xEF, 0x9A, 0x9A),
        }
    }
}

/// Heat-map gradient from 0% to 100%
pub const HEATMAP_GRADIENT: [Rgba; 2] = [Rgba::rgb(0xD5, 0x5E, 0x00), Rgba::rgb(0x00, 0x9E, 0x73)];

/// Coverage percentage thresholds, highest first
const COVERAGE_LEVELS: &[(f64, ColorId)] = &[
    (95.0, ColorId::Excellent),
    (90.0, ColorId::VeryGood),
    (85.0, ColorId::Good),
    (80.0, ColorId::Average),
    (70.0, ColorId::Inadequate),
    (60.0, ColorId::Bad),
    (50.0, ColorId::VeryBad),
    (0.0, ColorId::Insufficient),
];

/// Coverage change thresholds (percentage points), highest first
const CHANGE_LEVELS: &[(f64, ColorId)] = &[
    (5.0, ColorId::Outstanding),
    (2.0, ColorId::Excellent),
    (0.0, ColorId::Average),
    (-2.0, ColorId::Inadequate),
    (-5.0, ColorId::Bad),
    (-10.0, ColorId::VeryBad),
    (-20.0, ColorId::Insufficient),
];

/// Walk a level table and blend between the two levels around `value`
fn level_colors(value: f64, levels: &[(f64, ColorId)], provider: &ColorProvider) -> DisplayColors {
    for (i, &(threshold, id)) in levels.iter().enumerate() {
        if value >= threshold {
            let distance_level = value - threshold;
            if i == 0 || distance_level == 0.0 {
                return provider.display_colors(id);
            }
            let (upper_threshold, upper_id) = levels[i - 1];
            let distance_upper = upper_threshold - value;
            return provider
                .blended_display_colors(distance_level, distance_upper, upper_id, id)
                .unwrap_or(DEFAULT_COLORS);
        }
    }
    provider.display_colors(ColorId::White)
}

/// Colours for a coverage percentage; negative values mean "not available"
pub fn coverage_level_colors(percentage: f64, provider: &ColorProvider) -> DisplayColors {
    if percentage.is_nan() || percentage < 0.0 {
        return provider.display_colors(ColorId::White);
    }
    level_colors(percentage, COVERAGE_LEVELS, provider)
}

/// Colours for a coverage change in percentage points
pub fn coverage_change_colors(change: f64, provider: &ColorProvider) -> DisplayColors {
    if change.is_nan() {
        return provider.display_colors(ColorId::White);
    }
    level_colors(change, CHANGE_LEVELS, provider)
}

/// Direction of a coverage change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTendency {
    Increased,
    Equal,
    Decreased,
    Na,
}

impl ChangeTendency {
    pub fn of(change: f64) -> Self {
        if change.is_nan() {
            ChangeTendency::Na
        } else if change > 0.0 {
            ChangeTendency::Increased
        } else if change < 0.0 {
            ChangeTendency::Decreased
        } else {
            ChangeTendency::Equal
        }
    }

    pub fn colors(&self) -> DisplayColors {
        let black = Rgba::rgb(0, 0, 0);
        let fill = match self {
            ChangeTendency::Increased => Rgba::rgb(145, 212, 140),
            ChangeTendency::Equal => Rgba::rgb(204, 231, 165),
            ChangeTendency::Decreased => Rgba::rgb(239, 130, 140),
            ChangeTendency::Na => Rgba::rgb(200, 200, 200),
        };
        DisplayColors { line: black, fill }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTendency::Increased => "increased",
            ChangeTendency::Equal => "equal",
            ChangeTendency::Decreased => "decreased",
            ChangeTendency::Na => "n/a",
        }
    }

    /// One-character marker for text output
    pub fn symbol(&self) -> &'static str {
        match self {
            ChangeTendency::Increased => "+",
            ChangeTendency::Equal => "=",
            ChangeTendency::Decreased => "-",
            ChangeTendency::Na => "?",
        }
    }
}
