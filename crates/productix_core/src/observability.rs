//! Readiness check and metric helpers.
//!
//! Metrics go through the `metrics` facade; without an installed recorder
//! they are no-ops, so library code can call these unconditionally.

use std::time::Duration;

use serde::Serialize;

pub const REPORTS_BUILT: &str = "productix_reports_built_total";
pub const FIELDS_SKIPPED: &str = "productix_fields_skipped_total";
pub const STORE_OPERATION_SECONDS: &str = "productix_store_operation_seconds";
pub const COMPLETION_REQUESTS: &str = "productix_completion_requests_total";

#[derive(Clone, Debug, Serialize)]
pub struct Health {
    pub ready: bool,
    pub version: &'static str,
}

impl Health {
    pub fn readiness() -> Self {
        Self {
            ready: true,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Count a built view; `kind` is e.g. `batch`, `daily`, `shift_trend`.
pub fn record_report(kind: &'static str) {
    metrics::counter!(REPORTS_BUILT, "kind" => kind).increment(1);
}

pub fn record_skipped_fields(count: u64) {
    metrics::counter!(FIELDS_SKIPPED).increment(count);
}

pub fn record_store_operation(op: &'static str, elapsed: Duration) {
    metrics::histogram!(STORE_OPERATION_SECONDS, "op" => op).record(elapsed.as_secs_f64());
}

pub fn record_completion(outcome: &'static str) {
    metrics::counter!(COMPLETION_REQUESTS, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_ok() {
        let h = Health::readiness();
        assert!(h.ready);
        assert!(!h.version.is_empty());
    }

    #[test]
    fn helpers_are_noops_without_recorder() {
        record_report("batch");
        record_skipped_fields(2);
        record_store_operation("list_shifts", Duration::from_millis(3));
        record_completion("ok");
    }
}
