//! # Ingestion
//!
//! Ingestion entry point of the relay.
//!
//! Responsibilities:
//! - Validate the inbound call (token header, method, content type, body shape)
//! - Resolve the token to an account and list its destinations
//! - Fan the payload out through the dispatcher and report aggregate counts
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{ingest_router, IngestionEngine};
//!
//! let engine = Arc::new(IngestionEngine::new(directory.clone(), directory, dispatcher));
//! let router = ingest_router(engine, &blueprint.server)?;
//! axum::serve(listener, router).await?;
//! ```

mod engine;
mod error;
mod server;
#[cfg(test)]
mod test_support;

// Re-exports
pub use engine::{IngestReport, IngestionEngine};
pub use error::{IngestError, Result};
pub use server::{ingest_router, MSG_NO_DESTINATIONS, MSG_PROCESSED};
