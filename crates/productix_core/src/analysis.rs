//! Prompt construction for AI-backed analysis and parsing of model replies.
//!
//! Models are asked either for a bare JSON object (batch analysis) or for
//! text split into bracketed sections (calculation analysis). Replies are
//! parsed leniently: surrounding prose is ignored and absent sections come
//! back as `None`.

use std::fmt::Write as _;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::aggregate::aggregate;
use crate::calculator::CalculationResult;
use crate::model::{Batch, Product, ShiftRecord};
use crate::normalize::{normalize_shift, normalize_shifts};
use crate::rollup::PeriodSummary;
use crate::{CompletionRequest, ProductixError, TextCompletion};

pub const EFFICIENCY_SCORE: &str = "[EFFICIENCY SCORE]";
pub const AI_PREDICTION: &str = "[AI PREDICTION]";
pub const TOP_INEFFICIENCIES: &str = "[TOP INEFFICIENCIES]";
pub const AI_PRESCRIPTIONS: &str = "[AI PRESCRIPTIONS]";

const SECTION_HEADERS: [&str; 4] = [
    EFFICIENCY_SCORE,
    AI_PREDICTION,
    TOP_INEFFICIENCIES,
    AI_PRESCRIPTIONS,
];

/// Upper bound on shift lines included in a records context.
const CONTEXT_SHIFT_LIMIT: usize = 50;

/// Model forecast for a batch. Every field tolerates loosely typed replies:
/// non-numeric predictions become `None`, unreadable scores are dropped and
/// structured recommendations are flattened to text.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BatchAnalysis {
    #[serde(default, deserialize_with = "deserialize_opt_f64")]
    pub predicted_output_next_shift: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_values")]
    pub top_3_inefficiencies: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "deserialize_scores")]
    pub top_inefficiency_scores: Vec<f64>,
    #[serde(default, deserialize_with = "deserialize_texts")]
    pub ai_recommendations: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SectionedAnalysis {
    pub efficiency_score: Option<String>,
    pub ai_prediction: Option<String>,
    pub top_inefficiencies: Option<String>,
    pub ai_prescriptions: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AgentReport {
    pub plan: String,
    pub report: String,
}

fn lenient_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Numbers and numeric strings; anything else reads as `None`.
fn deserialize_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(lenient_f64))
}

/// A JSON value that may be a list, a single item or null.
fn into_items(value: Option<serde_json::Value>) -> Vec<serde_json::Value> {
    match value {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

fn deserialize_values<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(into_items(Option::deserialize(deserializer)?))
}

fn deserialize_scores<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(into_items(Option::deserialize(deserializer)?)
        .iter()
        .filter_map(lenient_f64)
        .collect())
}

fn deserialize_texts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(into_items(Option::deserialize(deserializer)?)
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// Ask for a JSON forecast and inefficiency breakdown of one batch.
pub fn batch_analysis_request(batch: &Batch, shifts: &[ShiftRecord]) -> CompletionRequest {
    let shift_data: Vec<serde_json::Value> = shifts
        .iter()
        .map(|record| {
            let shift = normalize_shift(record);
            json!({
                "shift": shift.shift_label,
                "date": shift.date,
                "input_materials": shift.inputs,
                "output_products": shift.outputs,
            })
        })
        .collect();

    let prompt = format!(
        "You are a production analyst. Here is the shift data for batch {number}:\n\n\
         {data:#}\n\n\
         Please provide the following in a JSON object:\n\
         1. predicted_output_next_shift: numeric prediction for the next shift output\n\
         2. top_3_inefficiencies: array of top 3 inefficiency sources with explanation\n\
         3. top_inefficiency_scores: array of numeric scores (0-100) corresponding to each top inefficiency\n\
         4. ai_recommendations: array of 3 short actionable recommendations (1-2 sentences each)\n\n\
         Return ONLY valid JSON, no extra text.",
        number = batch.batch_number,
        data = serde_json::Value::Array(shift_data),
    );
    CompletionRequest::new(prompt)
}

/// Extract the outermost JSON object from a model reply.
pub fn parse_batch_analysis(text: &str) -> Result<BatchAnalysis, ProductixError> {
    let re = Regex::new(r"(?s)\{.*\}").map_err(|e| ProductixError::Config(e.to_string()))?;
    let found = re
        .find(text)
        .ok_or_else(|| ProductixError::MalformedResponse("no JSON found in reply".into()))?;
    serde_json::from_str(found.as_str()).map_err(|e| {
        ProductixError::MalformedResponse(format!("failed to parse reply JSON: {e}"))
    })
}

pub fn calculation_analysis_request(calc: &CalculationResult) -> CompletionRequest {
    let mut prompt = format!(
        "Combined Input Productivity: {:.4}\n",
        calc.combined_productivity
    );
    prompt.push_str("\nInputs Used:\n");
    for (name, v) in &calc.processed_inputs {
        let _ = writeln!(prompt, "- {name}: {v}");
    }
    prompt.push_str("\nOutput Used:\n");
    for (name, v) in &calc.processed_outputs {
        let _ = writeln!(prompt, "- {name}: {v}");
    }
    prompt.push_str("\nSingle Input Productivity Scores:\n");
    for (name, v) in &calc.single_productivity {
        let _ = writeln!(prompt, "- {name}: {v:.4}");
    }

    let instruction = format!(
        "You are an expert productivity analyst. Analyze the provided manufacturing data.\n\
         Your response MUST be structured exactly as follows, using these exact headers in brackets:\n\n\
         {EFFICIENCY_SCORE}\nProvide a single, overall efficiency score as a percentage (e.g., 85%).\n\n\
         {AI_PREDICTION}\nProvide a brief, one or two-sentence prediction about future productivity if current trends continue.\n\n\
         {TOP_INEFFICIENCIES}\nIdentify the top 2-3 most significant inefficiencies as a bulleted list.\n\n\
         {AI_PRESCRIPTIONS}\nProvide a bulleted list of 2-3 specific, actionable steps to improve productivity."
    );
    CompletionRequest::new(prompt).with_system_instruction(instruction)
}

/// Slice a reply into its bracketed sections. Each section runs until the
/// next known header or the end of the text.
pub fn parse_sectioned_analysis(text: &str) -> SectionedAnalysis {
    SectionedAnalysis {
        efficiency_score: section(text, EFFICIENCY_SCORE),
        ai_prediction: section(text, AI_PREDICTION),
        top_inefficiencies: section(text, TOP_INEFFICIENCIES),
        ai_prescriptions: section(text, AI_PRESCRIPTIONS),
    }
}

fn section(text: &str, header: &str) -> Option<String> {
    let start = text.find(header)? + header.len();
    let rest = &text[start..];
    let end = SECTION_HEADERS
        .iter()
        .filter_map(|h| rest.find(h))
        .min()
        .unwrap_or(rest.len());
    let body = rest[..end]
        .trim()
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            match trimmed.strip_prefix("* ") {
                Some(item) => format!("- {item}"),
                None => trimmed.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    Some(body)
}

/// Readable dump of an organization's records for question answering.
pub fn records_context(products: &[Product], batches: &[Batch], shifts: &[ShiftRecord]) -> String {
    let mut out = String::from("Products:\n");
    if products.is_empty() {
        out.push_str("  (none)\n");
    }
    for p in products {
        let _ = writeln!(
            out,
            "  - {} (id {}) | Description: {} | Input fields: {} | Output fields: {}",
            p.name,
            p.id,
            p.description.as_deref().unwrap_or("N/A"),
            p.input_fields.join(", "),
            p.output_fields.join(", "),
        );
    }

    out.push_str("\nBatches:\n");
    if batches.is_empty() {
        out.push_str("  (none)\n");
    }
    for b in batches {
        let own: Vec<ShiftRecord> = shifts
            .iter()
            .filter(|s| s.batch_id == b.id)
            .cloned()
            .collect();
        let normalized = normalize_shifts(&own);
        let summary = PeriodSummary::from_totals(&aggregate(&normalized));
        let _ = writeln!(
            out,
            "  - {} (id {}, product {}) | Status: {} | Start: {} | End: {} | Shifts: {} | \
             Total output: {} | Total input cost: {:.2} | Cost per unit: {:.2} | Productivity ratio: {:.4}",
            b.batch_number,
            b.id,
            b.product_id,
            b.status,
            b.start_date,
            b.end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "N/A".into()),
            summary.shift_count,
            summary.total_output,
            summary.total_input_cost,
            summary.cost_per_unit,
            summary.productivity_ratio,
        );
    }

    out.push_str("\nShift entries (most recent first):\n");
    let mut recent: Vec<&ShiftRecord> = shifts.iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    if recent.is_empty() {
        out.push_str("  (none)\n");
    }
    for s in recent.into_iter().take(CONTEXT_SHIFT_LIMIT) {
        let n = normalize_shift(s);
        let _ = writeln!(
            out,
            "  - Date: {} | Batch: {} | Shift: {} | Inputs: {} | Outputs: {}",
            n.date,
            s.batch_id,
            n.shift_label,
            json!(n.inputs),
            json!(n.outputs),
        );
    }
    out
}

pub fn chat_request(context: &str, question: &str) -> CompletionRequest {
    CompletionRequest::new(format!("{context}\nUser Question: {question}")).with_system_instruction(
        "You are a helpful assistant for a manufacturing productivity tracker. \
         Answer questions only from the given data. \
         If information is missing, say it is not available.",
    )
}

/// Two-step analysis: draft a plan for `goal`, then execute it into a report.
pub async fn agent_report(
    client: &dyn TextCompletion,
    context: &str,
    goal: &str,
) -> Result<AgentReport, ProductixError> {
    let plan = client
        .complete(CompletionRequest::new(format!(
            "Based on the user goal '{goal}' and the following data, create a step-by-step plan \
             to analyze the data.\n\nData:\n{context}"
        )))
        .await?;
    let report = client
        .complete(CompletionRequest::new(format!(
            "Execute the following plan using the provided data to achieve the user's goal \
             '{goal}'. Generate a detailed report of your findings, citing specific data points.\
             \n\nPlan:\n{plan}\n\nData:\n{context}"
        )))
        .await?;
    Ok(AgentReport { plan, report })
}
