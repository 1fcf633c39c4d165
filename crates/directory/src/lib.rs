//! # Directory
//!
//! Account / destination 目录。
//!
//! 负责：
//! - 按 token 解析 account（`AccountResolver`）
//! - 按 account 列出 destination（`DestinationDirectory`）
//! - 管理 API：account 与 destination 的 CRUD，删除 account 级联删除其 destination
//!
//! 数据保存在内存中，启动时由 `RelayBlueprint` 播种。

pub mod error;
pub mod routes;
pub mod store;

pub use error::DirectoryError;
pub use routes::{ApiError, management_router};
pub use store::{AccountPatch, DestinationPatch, InMemoryDirectory, NewAccount, NewDestination};
