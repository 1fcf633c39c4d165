//! ReqwestTransport - HttpTransport backed by a pooled `reqwest::Client`

use std::time::Duration;

use tracing::{debug, instrument};

use contracts::{DispatchFailure, HttpTransport, OutboundRequest};

use crate::error::DispatcherError;

/// Real HTTP transport.
///
/// One client (and connection pool) is shared by every unit of every wave;
/// cloning the transport is cheap.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    name: String,
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the given `User-Agent`
    pub fn new(user_agent: &str) -> Result<Self, DispatcherError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| DispatcherError::transport_init(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            name: "reqwest".to_string(),
            client,
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "transport_send",
        skip(self, request),
        fields(
            destination_id = %request.destination_id,
            method = %request.method,
            url = %request.url
        )
    )]
    async fn send(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<u16, DispatchFailure> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone())
            .headers(request.headers.clone())
            .timeout(timeout);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(status, "Destination responded");
                Ok(status)
            }
            Err(err) if err.is_timeout() => Err(DispatchFailure::timeout(timeout)),
            Err(err) => Err(DispatchFailure::transport(err.to_string())),
        }
    }
}
