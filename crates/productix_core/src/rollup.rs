//! Per-day, last-N-shift and last-N-batch rollups.
//!
//! Every series is ordered oldest first.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateTotals, aggregate};
use crate::model::{Batch, BatchId, BatchStatus, NormalizedShift};
use crate::ratio::guarded_ratio;

/// Totals and derived ratios for one group of shifts.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PeriodSummary {
    pub shift_count: usize,
    pub total_output: f64,
    pub total_input_cost: f64,
    pub total_input_amount: f64,
    pub cost_per_unit: f64,
    pub productivity_ratio: f64,
    pub input_totals: BTreeMap<String, f64>,
    pub output_totals: BTreeMap<String, f64>,
}

impl PeriodSummary {
    pub fn from_totals(totals: &AggregateTotals) -> Self {
        Self {
            shift_count: totals.shift_count,
            total_output: totals.total_output,
            total_input_cost: totals.total_input_cost,
            total_input_amount: totals.total_input_amount,
            cost_per_unit: guarded_ratio(totals.total_input_cost, totals.total_output),
            productivity_ratio: guarded_ratio(totals.total_output, totals.total_input_amount),
            input_totals: totals.input_totals.clone(),
            output_totals: totals.output_totals.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DailyEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: PeriodSummary,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ShiftTrendEntry {
    pub date: NaiveDate,
    pub shift_label: String,
    #[serde(flatten)]
    pub summary: PeriodSummary,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BatchTrendEntry {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: BatchStatus,
    #[serde(flatten)]
    pub summary: PeriodSummary,
}

/// Position of a shift within its day. Unrecognized labels sort after the
/// standard three, alphabetically among themselves.
pub fn shift_rank(label: &str) -> u8 {
    match label.trim().to_ascii_lowercase().as_str() {
        "morning" => 0,
        "evening" => 1,
        "night" => 2,
        _ => 3,
    }
}

fn chronological(a: &NormalizedShift, b: &NormalizedShift) -> Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| shift_rank(&a.shift_label).cmp(&shift_rank(&b.shift_label)))
        .then_with(|| a.shift_label.cmp(&b.shift_label))
}

/// One entry per distinct date, ascending.
pub fn daily_rollup(shifts: &[NormalizedShift]) -> Vec<DailyEntry> {
    let mut by_day: BTreeMap<NaiveDate, AggregateTotals> = BTreeMap::new();
    for shift in shifts {
        by_day.entry(shift.date).or_default().add_shift(shift);
    }
    by_day
        .into_iter()
        .map(|(date, totals)| DailyEntry {
            date,
            summary: PeriodSummary::from_totals(&totals),
        })
        .collect()
}

/// The `n` most recent shifts, returned oldest first.
pub fn recent_shifts(shifts: &[NormalizedShift], n: usize) -> Vec<ShiftTrendEntry> {
    let mut ordered: Vec<&NormalizedShift> = shifts.iter().collect();
    ordered.sort_by(|a, b| chronological(a, b));
    let start = ordered.len().saturating_sub(n);
    ordered[start..]
        .iter()
        .map(|shift| ShiftTrendEntry {
            date: shift.date,
            shift_label: shift.shift_label.clone(),
            summary: PeriodSummary::from_totals(&aggregate([*shift])),
        })
        .collect()
}

/// The `n` most recently started batches, returned oldest first, each
/// summarized over its own shifts. Ties on start date fall back to id.
pub fn recent_batches(batches: &[(Batch, Vec<NormalizedShift>)], n: usize) -> Vec<BatchTrendEntry> {
    let mut ordered: Vec<&(Batch, Vec<NormalizedShift>)> = batches.iter().collect();
    ordered.sort_by(|(a, _), (b, _)| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
    let start = ordered.len().saturating_sub(n);
    ordered[start..]
        .iter()
        .map(|(batch, shifts)| BatchTrendEntry {
            batch_id: batch.id,
            batch_number: batch.batch_number.clone(),
            start_date: batch.start_date,
            end_date: batch.end_date,
            status: batch.status,
            summary: PeriodSummary::from_totals(&aggregate(shifts)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldMap, FieldQuantity};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).expect("date")
    }

    fn shift(d: u32, label: &str, steel: f64, out: f64) -> NormalizedShift {
        let mut inputs = FieldMap::new();
        inputs.insert("steel".into(), FieldQuantity::new(steel, 5.0));
        let mut outputs = FieldMap::new();
        outputs.insert("units".into(), FieldQuantity::new(out, 0.0));
        NormalizedShift {
            date: day(d),
            shift_label: label.into(),
            inputs,
            outputs,
        }
    }

    fn batch(id: BatchId, start: u32) -> Batch {
        Batch {
            id,
            organization_id: 1,
            product_id: 1,
            batch_number: format!("BATCH-{id:03}"),
            start_date: day(start),
            end_date: None,
            status: BatchStatus::Open,
        }
    }

    #[test]
    fn daily_groups_by_date_ascending() {
        let shifts = vec![
            shift(3, "morning", 10.0, 5.0),
            shift(1, "night", 100.0, 80.0),
            shift(1, "morning", 50.0, 40.0),
        ];
        let daily = daily_rollup(&shifts);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, day(1));
        assert_eq!(daily[0].summary.input_totals["steel"], 150.0);
        assert_eq!(daily[0].summary.total_input_cost, 750.0);
        assert_eq!(daily[0].summary.shift_count, 2);
        assert_eq!(daily[1].date, day(3));
    }

    #[test]
    fn daily_of_nothing_is_empty() {
        assert!(daily_rollup(&[]).is_empty());
    }

    #[test]
    fn recent_shifts_takes_latest_oldest_first() {
        let shifts = vec![
            shift(2, "Night", 1.0, 1.0),
            shift(1, "morning", 1.0, 1.0),
            shift(2, "morning", 1.0, 1.0),
            shift(2, "evening", 1.0, 1.0),
        ];
        let trend = recent_shifts(&shifts, 3);
        let labels: Vec<_> = trend
            .iter()
            .map(|t| (t.date, t.shift_label.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![(day(2), "morning"), (day(2), "evening"), (day(2), "Night")]
        );
    }

    #[test]
    fn recent_shifts_short_history_and_zero() {
        let shifts = vec![shift(1, "morning", 2.0, 4.0)];
        let trend = recent_shifts(&shifts, 3);
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].summary.productivity_ratio, 2.0);
        assert!(recent_shifts(&shifts, 0).is_empty());
    }

    #[test]
    fn custom_labels_sort_after_standard_ones() {
        assert!(shift_rank("Night") < shift_rank("overtime"));
        let shifts = vec![shift(1, "overtime", 1.0, 1.0), shift(1, "evening", 1.0, 1.0)];
        let trend = recent_shifts(&shifts, 5);
        assert_eq!(trend[0].shift_label, "evening");
        assert_eq!(trend[1].shift_label, "overtime");
    }

    #[test]
    fn recent_batches_orders_by_start_date() {
        let batches = vec![
            (batch(1, 5), vec![shift(5, "morning", 10.0, 20.0)]),
            (batch(2, 1), vec![]),
            (batch(3, 9), vec![shift(9, "morning", 4.0, 2.0)]),
            (batch(4, 7), vec![]),
        ];
        let trend = recent_batches(&batches, 3);
        let ids: Vec<_> = trend.iter().map(|t| t.batch_id).collect();
        assert_eq!(ids, vec![1, 4, 3]);
        assert_eq!(trend[0].summary.cost_per_unit, 2.5);
        assert_eq!(trend[1].summary, PeriodSummary::default());
    }

    #[test]
    fn flattened_entry_serializes_summary_fields() {
        let daily = daily_rollup(&[shift(1, "morning", 1.0, 1.0)]);
        let value = serde_json::to_value(&daily[0]).expect("serialize");
        assert_eq!(value["date"], "2025-04-01");
        assert_eq!(value["shift_count"], 1);
        assert!(value.get("summary").is_none());
    }
}
