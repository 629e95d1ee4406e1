// Reliability scoring for single count lines and for groups of them.
use crate::config::{ReliabilityFormula, ReliabilityWeighting};
use crate::types::ProcessedItem;
use crate::util::VARIANCE_EPSILON;

/// Score one count line in [0, 1].
///
/// `Binary` only rewards exact matches. `Proportional` measures the miss
/// against the larger of both stocks, floored at 1 so empty shelves do not
/// divide by zero.
pub fn item_reliability(
    formula: ReliabilityFormula,
    system_stock: f64,
    physical_stock: f64,
    variance: f64,
) -> f64 {
    let score = match formula {
        ReliabilityFormula::Binary => {
            if variance.abs() < VARIANCE_EPSILON {
                1.0
            } else {
                0.0
            }
        }
        ReliabilityFormula::Proportional => {
            let base = system_stock.max(physical_stock).max(1.0);
            1.0 - variance.abs() / base
        }
    };
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Largest weight a single line can carry, so group sums stay finite.
const MAX_WEIGHT: f64 = 1e250;

/// Weight of one item in a group score.
pub fn item_weight(item: &ProcessedItem, weighting: ReliabilityWeighting) -> f64 {
    match weighting {
        ReliabilityWeighting::Uniform => 1.0,
        ReliabilityWeighting::EconomicWeight => {
            let w = item.adjustment_cost.abs();
            // Zero-cost lines still count.
            if w == 0.0 || !w.is_finite() {
                1.0
            } else {
                w.min(MAX_WEIGHT)
            }
        }
    }
}

/// Running weighted mean of item reliabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReliabilityAcc {
    weighted_sum: f64,
    total_weight: f64,
}

impl ReliabilityAcc {
    pub fn push(&mut self, item: &ProcessedItem, weighting: ReliabilityWeighting) {
        let w = item_weight(item, weighting);
        let score = if item.reliability.is_finite() {
            item.reliability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.weighted_sum += score * w;
        self.total_weight += w;
    }

    /// 0–100 scale; an empty group is vacuously 100.
    pub fn percentage(&self) -> f64 {
        if self.total_weight <= 0.0 {
            return 100.0;
        }
        let pct = self.weighted_sum / self.total_weight * 100.0;
        if pct.is_finite() {
            pct.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// Group reliability on a 0–100 scale.
pub fn weighted_reliability<'a, I>(items: I, weighting: ReliabilityWeighting) -> f64
where
    I: IntoIterator<Item = &'a ProcessedItem>,
{
    let mut acc = ReliabilityAcc::default();
    for item in items {
        acc.push(item, weighting);
    }
    acc.percentage()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficLight {
    Green,
    Amber,
    Red,
}

impl TrafficLight {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 95.0 {
            TrafficLight::Green
        } else if pct >= 85.0 {
            TrafficLight::Amber
        } else {
            TrafficLight::Red
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrafficLight::Green => "Verde",
            TrafficLight::Amber => "Ámbar",
            TrafficLight::Red => "Rojo",
        }
    }
}
