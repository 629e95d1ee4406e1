use crate::config::PipelineConfig;
use crate::fields::{Field, FieldResolver};
use crate::reliability::item_reliability;
use crate::types::{ProcessedItem, RawRow};
use crate::util::{normalize_status, parse_currency, parse_date, parse_number, VARIANCE_EPSILON};
use tracing::{debug, info, warn};

pub const DEFAULT_LOCATION: &str = "Sede Sin Nombre";
pub const DEFAULT_ARTICLE: &str = "Artículo Desconocido";
pub const DEFAULT_COST_CENTER: &str = "General";
pub const DEFAULT_UNIT: &str = "UND";

/// Counters describing how much of a batch had to be defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub total_rows: usize,
    pub defaulted_locations: usize,
    pub defaulted_articles: usize,
    pub undated_rows: usize,
    /// Rows whose explicit variance disagrees with physical − system.
    pub variance_mismatches: usize,
    pub charge_fallbacks: usize,
}

/// Normalize one raw row. Never fails; see `process_batch` for the batch
/// driver with diagnostics.
pub fn process_row(row: &RawRow, index: usize, config: &PipelineConfig) -> ProcessedItem {
    let mut scratch = ProcessReport::default();
    normalize_row(row, index, config, &mut scratch)
}

/// Normalize a whole import in input order.
///
/// Rows are independent of each other; the index only feeds the item id.
pub fn process_batch(
    rows: &[RawRow],
    config: &PipelineConfig,
) -> (Vec<ProcessedItem>, ProcessReport) {
    let mut report = ProcessReport {
        total_rows: rows.len(),
        ..ProcessReport::default()
    };
    let items: Vec<ProcessedItem> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| normalize_row(row, index, config, &mut report))
        .collect();

    info!(
        rows = report.total_rows,
        defaulted_locations = report.defaulted_locations,
        defaulted_articles = report.defaulted_articles,
        undated = report.undated_rows,
        "processed inventory batch"
    );
    if report.variance_mismatches > 0 {
        warn!(
            count = report.variance_mismatches,
            "explicit variance disagrees with physical minus system stock; explicit value kept"
        );
    }
    (items, report)
}

fn normalize_row(
    row: &RawRow,
    index: usize,
    config: &PipelineConfig,
    report: &mut ProcessReport,
) -> ProcessedItem {
    let fields = FieldResolver::new(row);

    let location = fields.text(Field::Location).unwrap_or_else(|| {
        report.defaulted_locations += 1;
        debug!(row = index, "missing location, using default");
        DEFAULT_LOCATION.to_string()
    });
    let article = fields.text(Field::Article).unwrap_or_else(|| {
        report.defaulted_articles += 1;
        debug!(row = index, "missing article, using default");
        DEFAULT_ARTICLE.to_string()
    });

    let number = |field: Field| fields.cell(field).and_then(parse_number);
    let system_stock = number(Field::SystemStock).unwrap_or(0.0);
    let physical_stock = number(Field::PhysicalStock).unwrap_or(0.0);
    let derived_variance = finite_or_zero(physical_stock - system_stock);
    let variance = match number(Field::Variance) {
        Some(explicit) => {
            if (explicit - derived_variance).abs() >= VARIANCE_EPSILON {
                report.variance_mismatches += 1;
                debug!(row = index, explicit, derived = derived_variance, "variance mismatch");
            }
            explicit
        }
        None => derived_variance,
    };

    let unit_cost = fields.cell(Field::UnitCost).map(parse_currency).unwrap_or(0.0);
    // Blank and absent both derive; only a written value (even "-") is taken.
    let adjustment_cost = finite_or_zero(match fields.cell(Field::AdjustmentCost) {
        Some(cell) => parse_currency(cell),
        None => variance * unit_cost,
    });

    let mut charge_amount = fields.cell(Field::ChargeAmount).map(parse_currency).unwrap_or(0.0);
    if config.charge_fallback_to_adjustment && charge_amount == 0.0 && adjustment_cost != 0.0 {
        charge_amount = adjustment_cost.abs();
        report.charge_fallbacks += 1;
    }

    let status_text = fields.text(Field::Status);
    let status = normalize_status(status_text.as_deref(), variance, config.status_precedence);

    let operative_date = fields.cell(Field::OperativeDate).map(parse_date).unwrap_or_default();
    if operative_date.is_empty() {
        report.undated_rows += 1;
    }

    let reliability = item_reliability(
        config.reliability_formula,
        system_stock,
        physical_stock,
        variance,
    );

    ProcessedItem {
        id: format!("{}-{}-{}", location, article, index),
        sub_article: fields.text_or(Field::SubArticle, ""),
        subfamily: fields.text_or(Field::Subfamily, ""),
        cost_center: fields.text_or(Field::CostCenter, DEFAULT_COST_CENTER),
        unit: fields.text_or(Field::Unit, DEFAULT_UNIT),
        series: fields.text_or(Field::Series, ""),
        document_number: fields.text_or(Field::DocumentNumber, ""),
        location,
        article,
        system_stock,
        physical_stock,
        variance,
        unit_cost,
        adjustment_cost,
        charge_amount,
        status,
        operative_date,
        reliability,
    }
}

fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReliabilityFormula, StatusPrecedence};
    use crate::types::{CellValue, InventoryStatus};

    fn row(pairs: &[(&str, CellValue)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    #[test]
    fn empty_row_gets_every_default() {
        let item = process_row(&RawRow::new(), 7, &PipelineConfig::default());
        assert_eq!(item.location, DEFAULT_LOCATION);
        assert_eq!(item.article, DEFAULT_ARTICLE);
        assert_eq!(item.cost_center, DEFAULT_COST_CENTER);
        assert_eq!(item.unit, DEFAULT_UNIT);
        assert_eq!(item.id, "Sede Sin Nombre-Artículo Desconocido-7");
        assert_eq!(item.variance, 0.0);
        assert_eq!(item.adjustment_cost, 0.0);
        assert_eq!(item.charge_amount, 0.0);
        assert_eq!(item.status, InventoryStatus::NoIssue);
        assert_eq!(item.operative_date, "");
        assert_eq!(item.reliability, 1.0);
    }

    #[test]
    fn full_row_from_count_sheet() {
        let r = row(&[
            ("Fecha Doc", "2024-03-01".into()),
            ("Almacén", " Sede Norte ".into()),
            ("Artículo", "Whisky Buchanans".into()),
            ("Subartículo", "Botella 750ml".into()),
            ("Subfamilia", "Licores".into()),
            ("Centro de Costos", "Bar".into()),
            ("Unidad", "UND".into()),
            ("Serie", "A".into()),
            ("Número", "101".into()),
            ("Stock a Fecha", num(100.0)),
            ("Stock Inventario", num(98.0)),
            ("Variación Stock", num(-2.0)),
            ("Coste Línea", "$75.000".into()),
            ("Costo Ajuste", "-$150.000".into()),
            ("Cobro", "$150.000".into()),
            ("Estado", "Faltante".into()),
        ]);
        let item = process_row(&r, 0, &PipelineConfig::default());
        assert_eq!(item.location, "Sede Norte");
        assert_eq!(item.id, "Sede Norte-Whisky Buchanans-0");
        assert_eq!(item.subfamily, "Licores");
        assert_eq!(item.series, "A");
        assert_eq!(item.document_number, "101");
        assert_eq!(item.unit_cost, 75000.0);
        assert_eq!(item.adjustment_cost, -150000.0);
        assert_eq!(item.charge_amount, 150000.0);
        assert_eq!(item.status, InventoryStatus::Shortage);
        assert_eq!(item.operative_date, "2024-03-01");
        assert_eq!(item.reliability, 0.0);
    }

    #[test]
    fn variance_derived_from_stocks_when_absent() {
        let r = row(&[
            ("Stock a Fecha", "20".into()),
            ("Stock Inventario", "15".into()),
            ("Coste Línea", num(50000.0)),
        ]);
        let item = process_row(&r, 0, &PipelineConfig::default());
        assert_eq!(item.variance, -5.0);
        assert_eq!(item.adjustment_cost, -250000.0);
        assert_eq!(item.status, InventoryStatus::Shortage);
    }

    #[test]
    fn explicit_variance_wins_over_stocks() {
        let r = row(&[
            ("Stock a Fecha", num(10.0)),
            ("Stock Inventario", num(10.0)),
            ("Variación Stock", num(4.0)),
        ]);
        let (items, report) = process_batch(&[r], &PipelineConfig::default());
        assert_eq!(items[0].variance, 4.0);
        assert_eq!(items[0].status, InventoryStatus::Surplus);
        assert_eq!(report.variance_mismatches, 1);
    }

    #[test]
    fn unparseable_variance_falls_back_to_stocks() {
        let r = row(&[
            ("Stock a Fecha", num(3.0)),
            ("Stock Inventario", num(5.0)),
            ("Variación Stock", "??".into()),
        ]);
        let item = process_row(&r, 0, &PipelineConfig::default());
        assert_eq!(item.variance, 2.0);
    }

    #[test]
    fn dash_adjustment_is_zero() {
        let r = row(&[
            ("Variación Stock", num(-1.0)),
            ("Coste Línea", num(900.0)),
            ("Costo Ajuste", "-".into()),
        ]);
        let item = process_row(&r, 0, &PipelineConfig::default());
        assert_eq!(item.adjustment_cost, 0.0);
    }

    #[test]
    fn blank_adjustment_is_derived() {
        for blank in [CellValue::Empty, "".into(), "   ".into()] {
            let r = row(&[
                ("Variación Stock", num(-2.0)),
                ("Coste Línea", num(1000.0)),
                ("Costo Ajuste", blank.clone()),
            ]);
            let item = process_row(&r, 0, &PipelineConfig::default());
            assert_eq!(item.adjustment_cost, -2000.0, "blank cell {:?}", blank);
        }
    }

    #[test]
    fn overflowing_stocks_keep_variance_finite() {
        let r = row(&[("Stock a Fecha", num(-1.7e308)), ("Stock Inventario", num(1.7e308))]);
        let item = process_row(&r, 0, &PipelineConfig::default());
        assert!(item.variance.is_finite());
        assert!(item.adjustment_cost.is_finite());
        assert!((0.0..=1.0).contains(&item.reliability));
    }

    #[test]
    fn charge_fallback_only_when_enabled() {
        let r = row(&[("Variación Stock", num(-2.0)), ("Costo Ajuste", num(-8000.0))]);

        let item = process_row(&r, 0, &PipelineConfig::default());
        assert_eq!(item.charge_amount, 0.0);

        let cfg = PipelineConfig {
            charge_fallback_to_adjustment: true,
            ..PipelineConfig::default()
        };
        let (items, report) = process_batch(&[r], &cfg);
        assert_eq!(items[0].charge_amount, 8000.0);
        assert_eq!(report.charge_fallbacks, 1);
    }

    #[test]
    fn status_precedence_is_configurable() {
        let r = row(&[("Variación Stock", num(0.0)), ("Estado", "Faltante".into())]);
        let item = process_row(&r, 0, &PipelineConfig::default());
        assert_eq!(item.status, InventoryStatus::Shortage);

        let r = row(&[("Variación Stock", num(3.0)), ("Estado", "Faltante".into())]);
        let cfg = PipelineConfig {
            status_precedence: StatusPrecedence::SignFirst,
            ..PipelineConfig::default()
        };
        assert_eq!(process_row(&r, 0, &cfg).status, InventoryStatus::Surplus);
    }

    #[test]
    fn empty_status_uses_variance_sign() {
        let r = row(&[("Variación Stock", num(3.0)), ("Estado", "".into())]);
        let item = process_row(&r, 0, &PipelineConfig::default());
        assert_eq!(item.status, InventoryStatus::Surplus);
    }

    #[test]
    fn proportional_reliability_flows_into_item() {
        let r = row(&[("Stock a Fecha", num(100.0)), ("Stock Inventario", num(98.0))]);
        let cfg = PipelineConfig {
            reliability_formula: ReliabilityFormula::Proportional,
            ..PipelineConfig::default()
        };
        let item = process_row(&r, 0, &cfg);
        assert!((item.reliability - 0.98).abs() < 1e-12);
    }

    #[test]
    fn hostile_values_never_leak_nan() {
        let r = row(&[
            ("Stock a Fecha", num(f64::NAN)),
            ("Stock Inventario", "NaN".into()),
            ("Variación Stock", num(f64::INFINITY)),
            ("Coste Línea", num(f64::NEG_INFINITY)),
            ("Cobro", "$$$".into()),
            ("Fecha Doc", CellValue::Bool(true)),
            ("Estado", num(12.0)),
        ]);
        for formula in [ReliabilityFormula::Binary, ReliabilityFormula::Proportional] {
            let cfg = PipelineConfig {
                reliability_formula: formula,
                ..PipelineConfig::default()
            };
            let item = process_row(&r, 0, &cfg);
            for v in [
                item.system_stock,
                item.physical_stock,
                item.variance,
                item.unit_cost,
                item.adjustment_cost,
                item.charge_amount,
                item.reliability,
            ] {
                assert!(v.is_finite());
            }
            assert!((0.0..=1.0).contains(&item.reliability));
        }
    }

    #[test]
    fn ids_are_unique_within_a_batch() {
        let r = row(&[("Almacén", "A".into()), ("Artículo", "Sal".into())]);
        let (items, report) = process_batch(&[r.clone(), r], &PipelineConfig::default());
        assert_ne!(items[0].id, items[1].id);
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.undated_rows, 2);
    }
}
