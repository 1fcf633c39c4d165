//! Relay 指标记录模块
//!
//! 通过 `metrics` facade 记录；安装了 Prometheus recorder 时导出，否则为空操作。

use contracts::{DispatchOutcome, OutcomeKind};
use metrics::{counter, histogram};

/// 记录一次 ingestion 调用的结果
///
/// `result` 取值: `dispatched` / `no_destinations` / `unauthenticated` /
/// `invalid` / `error`
pub fn record_ingest(result: &'static str) {
    counter!("relay_ingest_requests_total", "result" => result).increment(1);
}

/// 记录单个 destination 的分发结果
///
/// `status` 标签为上游状态码，失败时为失败类型（如 `timeout`）。
pub fn record_dispatch_outcome(method: &str, outcome: &DispatchOutcome) {
    let status = match &outcome.kind {
        OutcomeKind::Completed { status } => status.to_string(),
        OutcomeKind::Failed { failure } => failure.label().to_string(),
    };
    counter!(
        "relay_dispatch_total",
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录单次外发请求耗时
pub fn record_dispatch_latency_ms(latency_ms: f64) {
    histogram!("relay_dispatch_latency_ms").record(latency_ms);
}

/// 记录一个分发波次的 destination 数量
pub fn record_wave_size(size: usize) {
    histogram!("relay_wave_size").record(size as f64);
}
