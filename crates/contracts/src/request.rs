//! OutboundRequest - Request Adapter output, Transport input

use bytes::Bytes;
use http::HeaderMap;
use url::Url;

use crate::{DestinationId, HttpMethod};

/// Fully adapted, protocol-correct request for one destination.
///
/// Headers are already validated; the URL already carries the query string
/// for GET/DELETE.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub destination_id: DestinationId,
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    /// JSON body, `None` for GET/DELETE
    pub body: Option<Bytes>,
}
