use crate::types::{InventoryStatus, ProcessedItem};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateGranularity {
    #[default]
    Day,
    /// Compare only `YYYY-MM`.
    Month,
}

impl DateGranularity {
    fn truncate(self, date: &str) -> &str {
        match self {
            DateGranularity::Day => date,
            DateGranularity::Month => date.get(..7).unwrap_or(date),
        }
    }
}

/// Caller-side selection over a processed batch. `None` means "all".
///
/// Date bounds are inclusive and compared as strings, which is sound because
/// operative dates are canonical `YYYY-MM-DD`. Items without a date never
/// pass an active date bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub location: Option<String>,
    pub cost_center: Option<String>,
    pub status: Option<InventoryStatus>,
    pub subfamily: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub granularity: DateGranularity,
}

impl ItemFilter {
    pub fn is_empty(&self) -> bool {
        *self
            == ItemFilter {
                granularity: self.granularity,
                ..ItemFilter::default()
            }
    }

    pub fn matches(&self, item: &ProcessedItem) -> bool {
        if let Some(loc) = &self.location {
            if item.location != *loc {
                return false;
            }
        }
        if let Some(cc) = &self.cost_center {
            if item.cost_center != *cc {
                return false;
            }
        }
        if let Some(status) = self.status {
            if item.status != status {
                return false;
            }
        }
        if let Some(sf) = &self.subfamily {
            if item.subfamily != *sf {
                return false;
            }
        }
        if self.start_date.is_none() && self.end_date.is_none() {
            return true;
        }
        if item.operative_date.is_empty() {
            return false;
        }
        let date = self.granularity.truncate(&item.operative_date);
        if let Some(start) = &self.start_date {
            if date < self.granularity.truncate(start) {
                return false;
            }
        }
        if let Some(end) = &self.end_date {
            if date > self.granularity.truncate(end) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, items: &[ProcessedItem]) -> Vec<ProcessedItem> {
        items.iter().filter(|i| self.matches(i)).cloned().collect()
    }
}

fn distinct<'a, F>(items: &'a [ProcessedItem], key: F) -> Vec<String>
where
    F: Fn(&'a ProcessedItem) -> &'a str,
{
    items
        .iter()
        .map(key)
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Sorted unique locations, for filter option lists.
pub fn distinct_locations(items: &[ProcessedItem]) -> Vec<String> {
    distinct(items, |i| i.location.as_str())
}

pub fn distinct_cost_centers(items: &[ProcessedItem]) -> Vec<String> {
    distinct(items, |i| i.cost_center.as_str())
}

pub fn distinct_subfamilies(items: &[ProcessedItem]) -> Vec<String> {
    distinct(items, |i| i.subfamily.as_str())
}
