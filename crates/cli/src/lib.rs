//! # Fan-out Relay
//!
//! 将各 crate 组装为一个可运行的 relay：
//! - 由 `RelayBlueprint` 播种内存目录
//! - 构造 reqwest transport、fan-out dispatcher 与 ingestion engine
//! - 合并 ingestion 路由、管理 API 路由与根路由
//!
//! `fanout-relay` 二进制与端到端测试共用这里的装配逻辑。

pub mod app;
pub mod error;

pub use app::{build_app, RelayApp, MSG_ROUTE_NOT_FOUND, MSG_WELCOME};
pub use error::{CliError, Result};
