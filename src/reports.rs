use crate::aggregate::{signed_charge, total_charge};
use crate::config::ChargeSignConvention;
use crate::reliability::TrafficLight;
use crate::types::{
    ChargebackRow, CostCenterRow, CriticalItemRow, ProcessedItem, SedeMetrics, SedeSummaryRow,
};
use crate::util::format_number;
use std::cmp::Ordering;

fn by_abs_desc(a: f64, b: f64) -> Ordering {
    b.abs().partial_cmp(&a.abs()).unwrap_or(Ordering::Equal)
}

/// Deviations ranked by financial impact: |charge| descending, then
/// |variance| descending. Equal items keep their input order.
pub fn rank_by_charge(items: &[ProcessedItem]) -> Vec<&ProcessedItem> {
    let mut ranked: Vec<&ProcessedItem> =
        items.iter().filter(|i| i.status.is_deviation()).collect();
    ranked.sort_by(|a, b| {
        by_abs_desc(a.charge_amount, b.charge_amount)
            .then_with(|| by_abs_desc(a.variance, b.variance))
    });
    ranked
}

/// Deviations ranked by physical impact (|variance| descending).
pub fn rank_by_variance(items: &[ProcessedItem]) -> Vec<&ProcessedItem> {
    let mut ranked: Vec<&ProcessedItem> =
        items.iter().filter(|i| i.status.is_deviation()).collect();
    ranked.sort_by(|a, b| by_abs_desc(a.variance, b.variance));
    ranked
}

pub fn critical_rows(ranked: &[&ProcessedItem], top: usize) -> Vec<CriticalItemRow> {
    ranked
        .iter()
        .take(top)
        .enumerate()
        .map(|(idx, item)| CriticalItemRow {
            rank: idx + 1,
            location: item.location.clone(),
            article: item.article.clone(),
            status: item.status.label().to_string(),
            variance: format_number(item.variance, 2),
            charge: format_number(item.charge_amount, 0),
        })
        .collect()
}

/// Liquidation sheet for the current selection.
#[derive(Debug, Clone)]
pub struct ChargebackReport {
    pub rows: Vec<ChargebackRow>,
    pub total: f64,
}

/// Every item passed in becomes a row, including "Sin Novedad" ones, so
/// the sheet mirrors whatever selection the caller made.
pub fn chargeback_report(
    items: &[ProcessedItem],
    convention: ChargeSignConvention,
) -> ChargebackReport {
    let rows = items
        .iter()
        .map(|item| ChargebackRow {
            operative_date: item.operative_date.clone(),
            location: item.location.clone(),
            cost_center: item.cost_center.clone(),
            article: item.article.clone(),
            sub_article: item.sub_article.clone(),
            unit: item.unit.clone(),
            status: item.status.label().to_string(),
            quantity: format_number(item.variance.abs(), 2),
            charge: if item.charge_amount != 0.0 {
                format_number(signed_charge(item, convention), 0)
            } else {
                "-".to_string()
            },
        })
        .collect();
    ChargebackReport {
        rows,
        total: total_charge(items, convention),
    }
}

/// One row per location, most reliable first.
pub fn sede_summary_rows(metrics: &[SedeMetrics]) -> Vec<SedeSummaryRow> {
    let mut sorted: Vec<&SedeMetrics> = metrics.iter().collect();
    sorted.sort_by(|a, b| {
        b.global_reliability
            .partial_cmp(&a.global_reliability)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.location.cmp(&b.location))
    });
    sorted
        .into_iter()
        .map(|m| SedeSummaryRow {
            location: m.location.clone(),
            item_count: m.item_count,
            reliability: format_number(m.global_reliability, 2),
            traffic_light: TrafficLight::from_percentage(m.global_reliability)
                .label()
                .to_string(),
            shortage_count: m.shortage_count,
            surplus_count: m.surplus_count,
            total_charge: format_number(m.total_charge_amount, 0),
            total_adjustment: format_number(m.total_adjustment_cost, 0),
        })
        .collect()
}

pub fn cost_center_rows(metrics: &[SedeMetrics]) -> Vec<CostCenterRow> {
    metrics
        .iter()
        .flat_map(|m| {
            m.cost_center_metrics.iter().map(move |(name, cc)| CostCenterRow {
                location: m.location.clone(),
                cost_center: name.clone(),
                item_count: cc.count,
                reliability: format_number(cc.reliability, 2),
            })
        })
        .collect()
}
