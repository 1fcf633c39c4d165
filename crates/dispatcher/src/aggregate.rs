//! Result Aggregator

use contracts::{DispatchOutcome, DispatchSummary, StatusPolicy};

/// Reduce a wave's outcomes to `{total, successful, failed}`.
///
/// `successful + failed == total == outcomes.len()` always holds.
pub fn summarize(outcomes: &[DispatchOutcome], policy: StatusPolicy) -> DispatchSummary {
    let successful = outcomes.iter().filter(|o| o.is_success(policy)).count();
    DispatchSummary {
        total: outcomes.len(),
        successful,
        failed: outcomes.len() - successful,
    }
}
