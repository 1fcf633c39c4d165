//! HttpTransport trait - Fan-Out Dispatcher output interface

use std::time::Duration;

use crate::{DispatchFailure, OutboundRequest};

/// Sends one adapted request.
///
/// Implementations resolve once response headers arrive; the body is never
/// read back. Any non-transport outcome, including 4xx/5xx, is `Ok(status)`.
#[trait_variant::make(HttpTransport: Send)]
pub trait LocalHttpTransport {
    /// Transport name (used for logging)
    fn name(&self) -> &str;

    /// Send `request`, giving up after `timeout`
    ///
    /// # Errors
    /// `DispatchFailure::Timeout` or `DispatchFailure::Transport`
    async fn send(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<u16, DispatchFailure>;
}
