//! # Dispatcher
//!
//! 数据分发模块。
//!
//! 负责：
//! - 按 destination 的 method 构造外发请求（query string 或 JSON body）
//! - 并发 fan-out，每个 destination 独立超时、独立失败
//! - 将各 destination 的结果汇总为 `DispatchSummary`

pub mod adapter;
pub mod aggregate;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod transport;

pub use adapter::adapt;
pub use aggregate::summarize;
pub use contracts::{DispatchOutcome, DispatchSummary, HttpTransport};
pub use dispatcher::{DispatcherConfig, FanOutDispatcher};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use transport::ReqwestTransport;
