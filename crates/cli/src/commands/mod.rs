//! Command implementations.

mod info;
mod serve;
mod validate;

pub use info::run_info;
pub use serve::run_serve;
pub use validate::run_validate;
