//! Operation counters.
//!
//! Counters go through the `metrics` facade; the host decides whether a
//! recorder is installed.

pub const OPERATIONS_TOTAL: &str = "document_operations_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

pub fn record_operation(operation: &'static str, outcome: Outcome) {
    metrics::counter!(
        OPERATIONS_TOTAL,
        "operation" => operation,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_result<T, E>(operation: &'static str, result: &Result<T, E>) {
    let outcome = if result.is_ok() {
        Outcome::Success
    } else {
        Outcome::Failure
    };
    record_operation(operation, outcome);
}
