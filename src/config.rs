// Pipeline and report settings.
//
// Source exports disagree on a handful of business rules (how reliability
// is scored, how totals are signed, whether status text or variance sign
// decides). Each rule is an explicit enum here so one run applies exactly
// one rule set. Every field has a default, so a missing or partial TOML
// file is valid.
use crate::error::{ReportError, ReportResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityFormula {
    /// 1 when the count matches exactly, 0 otherwise.
    #[default]
    Binary,
    /// 1 − |variance| / max(system, physical, 1), clamped to [0, 1].
    Proportional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityWeighting {
    #[default]
    Uniform,
    /// Weight each item by |adjustment cost|, or 1 when the cost is zero.
    EconomicWeight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeSignConvention {
    /// Plain sum of every charge.
    #[default]
    GrossPositive,
    /// Shortage charges are subtracted.
    NetSigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPrecedence {
    /// Recognized status text wins over the variance sign.
    #[default]
    TextFirst,
    /// A non-zero variance wins; text only settles zero variances.
    SignFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub reliability_formula: ReliabilityFormula,
    pub reliability_weighting: ReliabilityWeighting,
    pub charge_sign_convention: ChargeSignConvention,
    pub status_precedence: StatusPrecedence,
    /// Use |adjustment cost| as the charge when the charge column is zero.
    pub charge_fallback_to_adjustment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// How many rows the critical-item rankings keep.
    pub top_critical: usize,
    /// Rows shown in the console preview of each report.
    pub preview_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_critical: 10,
            preview_rows: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub reports: ReportConfig,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Read a TOML config file from disk.
    pub fn load(path: &Path) -> ReportResult<Self> {
        if !path.exists() {
            return Err(ReportError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|e| ReportError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
