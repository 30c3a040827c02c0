use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::NormalizedShift;

/// Running sums over a set of normalized shifts.
///
/// Built fresh per request and discarded after the view is rendered.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AggregateTotals {
    pub input_totals: BTreeMap<String, f64>,
    pub input_costs: BTreeMap<String, f64>,
    pub output_totals: BTreeMap<String, f64>,
    pub total_output: f64,
    /// Always the sum of `input_costs`.
    pub total_input_cost: f64,
    /// Always the sum of `input_totals`.
    pub total_input_amount: f64,
    /// Inputs lacking a positive unit price in at least one contributing shift.
    pub missing_unit_prices: BTreeSet<String>,
    pub shift_count: usize,
}

impl AggregateTotals {
    pub fn add_shift(&mut self, shift: &NormalizedShift) {
        for (name, q) in &shift.inputs {
            *self.input_totals.entry(name.clone()).or_insert(0.0) += q.amount;
            *self.input_costs.entry(name.clone()).or_insert(0.0) += q.cost();
            if !q.has_price() {
                self.missing_unit_prices.insert(name.clone());
            }
        }
        for (name, q) in &shift.outputs {
            *self.output_totals.entry(name.clone()).or_insert(0.0) += q.amount;
        }
        self.shift_count += 1;
        self.refresh_scalars();
    }

    /// Fold another set of totals into this one.
    pub fn merge(&mut self, other: &AggregateTotals) {
        for (name, v) in &other.input_totals {
            *self.input_totals.entry(name.clone()).or_insert(0.0) += v;
        }
        for (name, v) in &other.input_costs {
            *self.input_costs.entry(name.clone()).or_insert(0.0) += v;
        }
        for (name, v) in &other.output_totals {
            *self.output_totals.entry(name.clone()).or_insert(0.0) += v;
        }
        self.missing_unit_prices
            .extend(other.missing_unit_prices.iter().cloned());
        self.shift_count += other.shift_count;
        self.refresh_scalars();
    }

    pub fn is_empty(&self) -> bool {
        self.shift_count == 0
    }

    // Scalars are recomputed from the maps rather than accumulated so they
    // match the per-field sums exactly.
    fn refresh_scalars(&mut self) {
        self.total_input_cost = self.input_costs.values().sum();
        self.total_input_amount = self.input_totals.values().sum();
        self.total_output = self.output_totals.values().sum();
    }
}

/// Reduce normalized shifts, in any order, into one set of totals.
pub fn aggregate<'a, I>(shifts: I) -> AggregateTotals
where
    I: IntoIterator<Item = &'a NormalizedShift>,
{
    let mut totals = AggregateTotals::default();
    for shift in shifts {
        totals.add_shift(shift);
    }
    totals
}
