//! Coverage ratios and percentage normalization
//!
//! Global invariants enforced:
//! - `numerator <= denominator` whenever `denominator > 0`
//! - `covered + missed == denominator`
//! - `covered_percentage + missed_percentage == 100`
//! - Zero denominators never divide; they resolve through [`ZeroDenominatorPolicy`]

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Percentage reported for a ratio with nothing to cover (`x/0`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroDenominatorPolicy {
    /// Treat empty ratios as 0% covered
    #[default]
    Zero,
    /// Treat empty ratios as 100% covered
    Full,
}

impl ZeroDenominatorPolicy {
    /// Fallback covered percentage for a zero denominator
    pub fn fallback(&self) -> f64 {
        match self {
            ZeroDenominatorPolicy::Zero => 0.0,
            ZeroDenominatorPolicy::Full => 100.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZeroDenominatorPolicy::Zero => "zero",
            ZeroDenominatorPolicy::Full => "full",
        }
    }
}

/// Covered units over total units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RatioRepr")]
pub struct Ratio {
    numerator: u64,
    denominator: u64,
}

/// Wire form of a ratio; the view model serializes counts as floats
#[derive(Deserialize)]
struct RatioRepr {
    numerator: f64,
    denominator: f64,
}

impl TryFrom<RatioRepr> for Ratio {
    type Error = anyhow::Error;

    fn try_from(repr: RatioRepr) -> Result<Self> {
        let numerator = whole_count("numerator", repr.numerator)?;
        let denominator = whole_count("denominator", repr.denominator)?;
        Ratio::new(numerator, denominator)
    }
}

fn whole_count(field: &str, value: f64) -> Result<u64> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        anyhow::bail!(
            "ratio {} must be a non-negative whole number (got {})",
            field,
            value
        );
    }
    // u64::MAX as f64 rounds up to 2^64, which is already out of range
    if value >= u64::MAX as f64 {
        anyhow::bail!("ratio {} is too large (got {})", field, value);
    }
    Ok(value as u64)
}

impl Ratio {
    /// Create a ratio, rejecting `numerator > denominator` for non-empty ratios
    pub fn new(numerator: u64, denominator: u64) -> Result<Self> {
        if denominator > 0 && numerator > denominator {
            anyhow::bail!(
                "ratio numerator ({}) exceeds denominator ({})",
                numerator,
                denominator
            );
        }
        Ok(Ratio {
            numerator,
            denominator,
        })
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    pub fn is_empty(&self) -> bool {
        self.denominator == 0
    }

    /// Units not covered; zero for empty ratios
    pub fn missed(&self) -> u64 {
        self.denominator.saturating_sub(self.numerator)
    }

    /// Covered percentage in `[0, 100]`
    pub fn percentage(&self, policy: ZeroDenominatorPolicy) -> f64 {
        if self.denominator == 0 {
            return policy.fallback();
        }
        100.0 * self.numerator as f64 / self.denominator as f64
    }

    /// Integer percentage that never rounds a partial coverage up to 100
    ///
    /// 99.6% reports as 99, not 100. Everything else rounds half up.
    pub fn rounded_percentage(&self, policy: ZeroDenominatorPolicy) -> u32 {
        if self.denominator == 0 {
            return policy.fallback() as u32;
        }
        let n = self.numerator as u128;
        let d = self.denominator as u128;
        let rounded = (200 * n + d) / (2 * d);
        if rounded == 100 && n < d {
            (100 * n / d) as u32
        } else {
            rounded as u32
        }
    }

    /// Percentage used for table sorting and heat-map cells
    ///
    /// Two decimals, rounded half up. Values at or above 99.995 are truncated
    /// to three decimals instead, so partial coverage never displays as 100.
    pub fn table_percentage(&self, policy: ZeroDenominatorPolicy) -> f64 {
        if self.denominator == 0 {
            return policy.fallback();
        }
        let n = self.numerator as u128;
        let d = self.denominator as u128;
        // 100n/d >= 99.995  <=>  20000n >= 19999d
        if 20_000 * n >= 19_999 * d {
            (100_000 * n / d) as f64 / 1000.0
        } else {
            ((20_000 * n + d) / (2 * d)) as f64 / 100.0
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Covered/missed counts and percentages for one ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoverageSplit {
    pub covered: u64,
    pub missed: u64,
    pub covered_percentage: f64,
    pub missed_percentage: f64,
}

/// Split a ratio into the values a stacked bar needs
pub fn normalize(ratio: &Ratio, policy: ZeroDenominatorPolicy) -> CoverageSplit {
    let covered_percentage = ratio.percentage(policy);
    CoverageSplit {
        covered: ratio.numerator,
        missed: ratio.missed(),
        covered_percentage,
        missed_percentage: 100.0 - covered_percentage,
    }
}
