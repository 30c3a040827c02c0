//! Coercion of loosely typed per-field production values into [`FieldQuantity`].
//!
//! Accepted shapes for a single field value:
//! - a bare number or numeric string: `{amount: v, unit_price: 0}`
//! - an object with `amount` and optional `unit_price` (alias `unitPrice`)
//!
//! A missing `amount` counts as zero. Values that cannot be read as a
//! non-negative finite amount are skipped and reported, never raised.

use std::borrow::Cow;

use serde_json::{Map, Value};
use tracing::debug;

use crate::model::{FieldMap, FieldQuantity, NormalizedShift, ShiftRecord};
use crate::observability;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Consumed materials; carry a unit price.
    Input,
    /// Produced goods; amount only.
    Output,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedFields {
    pub fields: FieldMap,
    /// Field names whose values were unusable.
    pub skipped: Vec<String>,
}

/// Normalize one record's field mapping.
///
/// `raw` may be an object, a JSON string encoding an object, or anything
/// else (treated as an empty mapping).
pub fn normalize_fields(raw: &Value, kind: FieldKind) -> NormalizedFields {
    let Some(map) = as_object(raw) else {
        return NormalizedFields::default();
    };

    let mut out = NormalizedFields::default();
    for (name, value) in map.iter() {
        match normalize_value(value, kind) {
            Some(q) => {
                out.fields.insert(name.clone(), q);
            }
            None => out.skipped.push(name.clone()),
        }
    }
    out
}

/// Normalize a single field value. Returns `None` when the value must be skipped.
pub fn normalize_value(value: &Value, kind: FieldKind) -> Option<FieldQuantity> {
    let (amount, unit_price) = match value {
        Value::Number(_) | Value::String(_) => (parse_number(value)?, 0.0),
        Value::Object(obj) => {
            let amount = match obj.get("amount") {
                None | Some(Value::Null) => 0.0,
                Some(v) => parse_number(v)?,
            };
            let unit_price = obj
                .get("unit_price")
                .or_else(|| obj.get("unitPrice"))
                .and_then(parse_number)
                .filter(|p| p.is_finite() && *p > 0.0)
                .unwrap_or(0.0);
            (amount, unit_price)
        }
        _ => return None,
    };

    if !amount.is_finite() || amount < 0.0 {
        return None;
    }

    let unit_price = match kind {
        FieldKind::Input => unit_price,
        FieldKind::Output => 0.0,
    };
    Some(FieldQuantity::new(amount, unit_price))
}

/// Normalize both field maps of a stored shift, logging anything skipped.
pub fn normalize_shift(record: &ShiftRecord) -> NormalizedShift {
    let inputs = normalize_fields(&record.input_materials, FieldKind::Input);
    let outputs = normalize_fields(&record.output_products, FieldKind::Output);

    let skipped = inputs.skipped.len() + outputs.skipped.len();
    if skipped > 0 {
        debug!(
            shift_id = record.id,
            batch_id = record.batch_id,
            inputs = ?inputs.skipped,
            outputs = ?outputs.skipped,
            "skipped unusable field values"
        );
        observability::record_skipped_fields(skipped as u64);
    }

    NormalizedShift {
        date: record.date,
        shift_label: record.shift_label.clone(),
        inputs: inputs.fields,
        outputs: outputs.fields,
    }
}

pub fn normalize_shifts(records: &[ShiftRecord]) -> Vec<NormalizedShift> {
    records.iter().map(normalize_shift).collect()
}

fn as_object(raw: &Value) -> Option<Cow<'_, Map<String, Value>>> {
    match raw {
        Value::Object(map) => Some(Cow::Borrowed(map)),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Some(Cow::Owned(map)),
            _ => {
                debug!("field mapping string is not a JSON object; treating as empty");
                None
            }
        },
        _ => None,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_numbers_have_no_price() {
        let out = normalize_fields(&json!({"steel": 100, "bolts": "12.5"}), FieldKind::Input);
        assert_eq!(out.fields["steel"], FieldQuantity::new(100.0, 0.0));
        assert_eq!(out.fields["bolts"], FieldQuantity::new(12.5, 0.0));
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn objects_carry_amount_and_price() {
        let out = normalize_fields(
            &json!({
                "steel": {"amount": 100, "unit_price": 5},
                "plastic": {"amount": "50", "unitPrice": "3"}
            }),
            FieldKind::Input,
        );
        assert_eq!(out.fields["steel"], FieldQuantity::new(100.0, 5.0));
        assert_eq!(out.fields["plastic"], FieldQuantity::new(50.0, 3.0));
    }

    #[test]
    fn missing_amount_counts_as_zero() {
        let out = normalize_fields(&json!({"steel": {"unit_price": 5}}), FieldKind::Input);
        assert_eq!(out.fields["steel"], FieldQuantity::new(0.0, 5.0));
    }

    #[test]
    fn unusable_values_are_skipped_not_raised() {
        let out = normalize_fields(
            &json!({
                "neg": -4,
                "text": "lots",
                "nothing": null,
                "flag": true,
                "list": [1, 2],
                "bad_amount": {"amount": "n/a", "unit_price": 2},
                "ok": 1
            }),
            FieldKind::Input,
        );
        assert_eq!(out.fields.len(), 1);
        let mut skipped = out.skipped.clone();
        skipped.sort();
        assert_eq!(
            skipped,
            vec!["bad_amount", "flag", "list", "neg", "nothing", "text"]
        );
    }

    #[test]
    fn negative_or_garbage_price_becomes_zero() {
        let out = normalize_fields(
            &json!({"a": {"amount": 1, "unit_price": -3}, "b": {"amount": 1, "unit_price": "?"}}),
            FieldKind::Input,
        );
        assert_eq!(out.fields["a"].unit_price, 0.0);
        assert_eq!(out.fields["b"].unit_price, 0.0);
    }

    #[test]
    fn outputs_never_carry_price() {
        let out = normalize_fields(
            &json!({"widgets": {"amount": 40, "unit_price": 9}}),
            FieldKind::Output,
        );
        assert_eq!(out.fields["widgets"], FieldQuantity::new(40.0, 0.0));
    }

    #[test]
    fn json_encoded_mapping_is_parsed() {
        let raw = json!("{\"steel\": {\"amount\": 3, \"unit_price\": 2}}");
        let out = normalize_fields(&raw, FieldKind::Input);
        assert_eq!(out.fields["steel"], FieldQuantity::new(3.0, 2.0));
    }

    #[test]
    fn unparseable_mapping_is_empty() {
        assert!(normalize_fields(&json!("{not json"), FieldKind::Input)
            .fields
            .is_empty());
        assert!(normalize_fields(&Value::Null, FieldKind::Output)
            .fields
            .is_empty());
        assert!(normalize_fields(&json!([1, 2]), FieldKind::Input)
            .fields
            .is_empty());
    }

    #[test]
    fn non_finite_strings_are_skipped() {
        let out = normalize_fields(&json!({"a": "NaN", "b": "inf"}), FieldKind::Input);
        assert!(out.fields.is_empty());
        assert_eq!(out.skipped.len(), 2);
    }
}
