use rmcp::model::{GetPromptResult, PromptMessage, PromptMessageRole};

pub fn batch_review_prompt(batch_id: i64) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Review the productivity of batch {id}.\n\nInclude:\n1. Total input cost, total output, cost per unit and productivity ratio\n2. Inputs with missing unit prices and how they distort cost figures\n3. Day-by-day trend: which days were most and least efficient\n4. The last few shifts compared with the batch average\n5. Concrete actions for the remaining shifts\n\nUse get_batch_report with batch_id={id}, get_daily_report for the per-day breakdown and get_shift_trend for recent shifts. Use analyze_batch if an output forecast is needed.",
                id = batch_id
            ),
        )])
    .with_description(format!("Productivity review of batch {}", batch_id))
}

pub fn cost_reduction_prompt(product_id: Option<i64>, focus: &str) -> GetPromptResult {
    let scope = match product_id {
        Some(id) => format!(
            "product {id}. Use get_batch_trend with product_id={id} to compare its recent batches, then get_batch_report on the most expensive one"
        ),
        None => "the whole organization. Start with get_dashboard_summary and drill into the products with the highest cost per unit using get_batch_trend".to_string(),
    };
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Find cost reduction opportunities for {scope}.\n\nFocus on: {focus}.\n\nInclude:\n1. The inputs that dominate total input cost\n2. Inputs whose consumption per output unit is rising across batches\n3. Pricing gaps (inputs without a unit price)\n4. A ranked list of savings with an estimate of their effect on cost per unit"
            ),
        )])
    .with_description(format!("Cost reduction opportunities ({})", focus))
}

pub fn daily_performance_prompt(batch_id: i64, date: Option<&str>) -> GetPromptResult {
    let day = date
        .map(|d| format!("on {d}"))
        .unwrap_or_else(|| "on the most recent production day".to_string());
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Assess the performance of batch {batch_id} {day}.\n\nUse get_daily_report with batch_id={batch_id} and compare that day with the days before it. Report output, input cost, cost per unit and productivity ratio, flag any shift that deviates noticeably, and suggest one adjustment for the next day."
            ),
        )])
    .with_description(format!("Daily performance of batch {} {}", batch_id, day))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(result: &GetPromptResult) -> String {
        serde_json::to_string(&result.messages).expect("messages")
    }

    #[test]
    fn batch_review_mentions_tools() {
        let p = batch_review_prompt(12);
        assert!(p.description.as_deref().is_some_and(|d| d.contains("12")));
        let body = text(&p);
        assert!(body.contains("get_batch_report with batch_id=12"));
        assert!(body.contains("get_daily_report"));
    }

    #[test]
    fn cost_reduction_scopes_to_product() {
        assert!(text(&cost_reduction_prompt(Some(4), "steel")).contains("product_id=4"));
        assert!(text(&cost_reduction_prompt(None, "steel")).contains("get_dashboard_summary"));
    }

    #[test]
    fn daily_performance_uses_date() {
        assert!(text(&daily_performance_prompt(2, Some("2025-04-01"))).contains("on 2025-04-01"));
        assert!(text(&daily_performance_prompt(2, None)).contains("most recent production day"));
    }
}
