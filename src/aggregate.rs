// Per-location rollups of a normalized item set.
//
// One pass over the items, grouped by location in first-seen order, with a
// nested grouping by cost center. Results are a pure function of the input
// slice and are recomputed whenever the selection changes.
use crate::config::{ChargeSignConvention, PipelineConfig};
use crate::reliability::ReliabilityAcc;
use crate::types::{CostCenterMetrics, DashboardSummary, InventoryStatus, ProcessedItem, SedeMetrics};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Contribution of one item to a chargeback total.
pub fn signed_charge(item: &ProcessedItem, convention: ChargeSignConvention) -> f64 {
    match (convention, item.status) {
        (ChargeSignConvention::NetSigned, InventoryStatus::Shortage) => -item.charge_amount,
        _ => item.charge_amount,
    }
}

pub fn total_charge(items: &[ProcessedItem], convention: ChargeSignConvention) -> f64 {
    items.iter().map(|i| signed_charge(i, convention)).sum()
}

pub fn aggregate_sede_metrics(items: &[ProcessedItem], config: &PipelineConfig) -> Vec<SedeMetrics> {
    #[derive(Default)]
    struct Acc {
        reliability: ReliabilityAcc,
        total_charge: f64,
        total_adjustment: f64,
        shortages: usize,
        surpluses: usize,
        count: usize,
        cost_centers: BTreeMap<String, (ReliabilityAcc, usize)>,
    }

    let mut order: Vec<&str> = Vec::new();
    let mut map: HashMap<&str, Acc> = HashMap::new();
    for item in items {
        let acc = map.entry(item.location.as_str()).or_insert_with(|| {
            order.push(item.location.as_str());
            Acc::default()
        });
        acc.reliability.push(item, config.reliability_weighting);
        acc.total_charge += signed_charge(item, config.charge_sign_convention);
        acc.total_adjustment += item.adjustment_cost;
        acc.count += 1;
        match item.status {
            InventoryStatus::Shortage => acc.shortages += 1,
            InventoryStatus::Surplus => acc.surpluses += 1,
            InventoryStatus::NoIssue => {}
        }
        let cc = acc.cost_centers.entry(item.cost_center.clone()).or_default();
        cc.0.push(item, config.reliability_weighting);
        cc.1 += 1;
    }

    order
        .into_iter()
        .filter_map(|location| {
            let acc = map.remove(location)?;
            let cost_center_metrics = acc
                .cost_centers
                .into_iter()
                .map(|(name, (rel, count))| {
                    (
                        name,
                        CostCenterMetrics {
                            reliability: rel.percentage(),
                            count,
                        },
                    )
                })
                .collect();
            Some(SedeMetrics {
                location: location.to_string(),
                global_reliability: acc.reliability.percentage(),
                total_charge_amount: acc.total_charge,
                total_adjustment_cost: acc.total_adjustment,
                shortage_count: acc.shortages,
                surplus_count: acc.surpluses,
                item_count: acc.count,
                cost_center_metrics,
            })
        })
        .collect()
}

/// Figures for the whole selection. An empty selection reports 100%
/// reliability rather than NaN.
pub fn summarize(items: &[ProcessedItem], config: &PipelineConfig) -> DashboardSummary {
    let mut reliability = ReliabilityAcc::default();
    let mut locations: HashSet<&str> = HashSet::new();
    let mut summary = DashboardSummary {
        item_count: items.len(),
        location_count: 0,
        reliable_items: 0,
        global_reliability: 100.0,
        total_charge_amount: 0.0,
        total_adjustment_cost: 0.0,
        shortage_count: 0,
        surplus_count: 0,
    };
    for item in items {
        reliability.push(item, config.reliability_weighting);
        locations.insert(item.location.as_str());
        if item.reliability >= 1.0 {
            summary.reliable_items += 1;
        }
        summary.total_charge_amount += signed_charge(item, config.charge_sign_convention);
        summary.total_adjustment_cost += item.adjustment_cost;
        match item.status {
            InventoryStatus::Shortage => summary.shortage_count += 1,
            InventoryStatus::Surplus => summary.surplus_count += 1,
            InventoryStatus::NoIssue => {}
        }
    }
    summary.location_count = locations.len();
    summary.global_reliability = reliability.percentage();
    summary
}
