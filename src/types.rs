use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// A single spreadsheet cell as handed over by the file reader.
///
/// Workbooks give us real numbers and dates, CSV gives us text only and
/// JSON can give either, so every parser downstream accepts this enum and
/// decides for itself how forgiving to be.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    /// `true` for missing cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as trimmed text, `None` when blank.
    pub fn as_text(&self) -> Option<String> {
        let s = match self {
            CellValue::Empty => return None,
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
            Value::String(s) => CellValue::Text(s),
            // Nested structures have no meaning in a count sheet.
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// One row of the count sheet, keyed by the header exactly as it appears
/// in the source file.
pub type RawRow = HashMap<String, CellValue>;

/// Canonical outcome of a count line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryStatus {
    #[serde(rename = "Sin Novedad")]
    NoIssue,
    #[serde(rename = "Faltantes")]
    Shortage,
    #[serde(rename = "Sobrantes")]
    Surplus,
}

impl InventoryStatus {
    pub const ALL: [InventoryStatus; 3] = [
        InventoryStatus::NoIssue,
        InventoryStatus::Shortage,
        InventoryStatus::Surplus,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InventoryStatus::NoIssue => "Sin Novedad",
            InventoryStatus::Shortage => "Faltantes",
            InventoryStatus::Surplus => "Sobrantes",
        }
    }

    pub fn is_deviation(self) -> bool {
        self != InventoryStatus::NoIssue
    }
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InventoryStatus {
    type Err = String;

    /// Accepts the Spanish labels (singular or plural, any case) and the
    /// English variant names. Used for filter input, not for raw rows.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect();
        match key.as_str() {
            "SINNOVEDAD" | "NOISSUE" => Ok(InventoryStatus::NoIssue),
            "FALTANTE" | "FALTANTES" | "SHORTAGE" => Ok(InventoryStatus::Shortage),
            "SOBRANTE" | "SOBRANTES" | "SURPLUS" => Ok(InventoryStatus::Surplus),
            _ => Err(format!("unknown inventory status '{}'", s.trim())),
        }
    }
}

/// A normalized count line. Every field is populated: missing source data
/// has already been replaced by its default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedItem {
    pub id: String,
    pub location: String,
    pub article: String,
    pub sub_article: String,
    pub subfamily: String,
    pub cost_center: String,
    pub unit: String,
    pub series: String,
    pub document_number: String,
    pub system_stock: f64,
    pub physical_stock: f64,
    pub variance: f64,
    pub unit_cost: f64,
    pub adjustment_cost: f64,
    pub charge_amount: f64,
    pub status: InventoryStatus,
    pub operative_date: String,
    pub reliability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostCenterMetrics {
    /// 0–100 scale.
    pub reliability: f64,
    pub count: usize,
}

/// Rollup of all items that share a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SedeMetrics {
    pub location: String,
    /// 0–100 scale.
    pub global_reliability: f64,
    pub total_charge_amount: f64,
    pub total_adjustment_cost: f64,
    pub shortage_count: usize,
    pub surplus_count: usize,
    pub item_count: usize,
    pub cost_center_metrics: BTreeMap<String, CostCenterMetrics>,
}

/// Whole-selection figures shown above the per-location table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub item_count: usize,
    pub location_count: usize,
    pub reliable_items: usize,
    pub global_reliability: f64,
    pub total_charge_amount: f64,
    pub total_adjustment_cost: f64,
    pub shortage_count: usize,
    pub surplus_count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SedeSummaryRow {
    #[serde(rename = "Sede")]
    #[tabled(rename = "Sede")]
    pub location: String,
    #[serde(rename = "Items")]
    #[tabled(rename = "Items")]
    pub item_count: usize,
    #[serde(rename = "Confiabilidad")]
    #[tabled(rename = "Confiabilidad")]
    pub reliability: String,
    #[serde(rename = "Semaforo")]
    #[tabled(rename = "Semaforo")]
    pub traffic_light: String,
    #[serde(rename = "Faltantes")]
    #[tabled(rename = "Faltantes")]
    pub shortage_count: usize,
    #[serde(rename = "Sobrantes")]
    #[tabled(rename = "Sobrantes")]
    pub surplus_count: usize,
    #[serde(rename = "TotalCobro")]
    #[tabled(rename = "TotalCobro")]
    pub total_charge: String,
    #[serde(rename = "TotalCostoAjuste")]
    #[tabled(rename = "TotalCostoAjuste")]
    pub total_adjustment: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CostCenterRow {
    #[serde(rename = "Sede")]
    #[tabled(rename = "Sede")]
    pub location: String,
    #[serde(rename = "CentroCostos")]
    #[tabled(rename = "CentroCostos")]
    pub cost_center: String,
    #[serde(rename = "Items")]
    #[tabled(rename = "Items")]
    pub item_count: usize,
    #[serde(rename = "Confiabilidad")]
    #[tabled(rename = "Confiabilidad")]
    pub reliability: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ChargebackRow {
    #[serde(rename = "Fecha")]
    #[tabled(rename = "Fecha")]
    pub operative_date: String,
    #[serde(rename = "Sede")]
    #[tabled(rename = "Sede")]
    pub location: String,
    #[serde(rename = "CentroCostos")]
    #[tabled(rename = "CentroCostos")]
    pub cost_center: String,
    #[serde(rename = "Articulo")]
    #[tabled(rename = "Articulo")]
    pub article: String,
    #[serde(rename = "Subarticulo")]
    #[tabled(rename = "Subarticulo")]
    pub sub_article: String,
    #[serde(rename = "Unidad")]
    #[tabled(rename = "Unidad")]
    pub unit: String,
    #[serde(rename = "Estado")]
    #[tabled(rename = "Estado")]
    pub status: String,
    #[serde(rename = "Cantidad")]
    #[tabled(rename = "Cantidad")]
    pub quantity: String,
    #[serde(rename = "Cobro")]
    #[tabled(rename = "Cobro")]
    pub charge: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CriticalItemRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Sede")]
    #[tabled(rename = "Sede")]
    pub location: String,
    #[serde(rename = "Articulo")]
    #[tabled(rename = "Articulo")]
    pub article: String,
    #[serde(rename = "Estado")]
    #[tabled(rename = "Estado")]
    pub status: String,
    #[serde(rename = "Variacion")]
    #[tabled(rename = "Variacion")]
    pub variance: String,
    #[serde(rename = "Cobro")]
    #[tabled(rename = "Cobro")]
    pub charge: String,
}
