//! Request Adapter
//!
//! Turns one (destination, payload) pair into an [`OutboundRequest`]:
//!
//! - GET / DELETE: payload goes to the query string, no body
//! - POST / PUT / PATCH: payload is the JSON body
//!
//! Pure function, no I/O. Failures here mean no network call is made for the
//! destination.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use url::Url;

use contracts::{Destination, DispatchFailure, InboundPayload, OutboundRequest};

const APPLICATION_JSON: &str = "application/json";

/// Build the outbound request for `destination`
///
/// # Errors
/// `UnsupportedMethod`, `InvalidUrl`, `InvalidHeader` or `Encoding`
pub fn adapt(
    destination: &Destination,
    payload: &InboundPayload,
) -> Result<OutboundRequest, DispatchFailure> {
    let method = destination
        .method()
        .map_err(|e| DispatchFailure::UnsupportedMethod { method: e.0 })?;

    let mut url = Url::parse(&destination.url).map_err(|e| DispatchFailure::InvalidUrl {
        url: destination.url.clone(),
        message: e.to_string(),
    })?;

    let mut headers = build_headers(destination)?;

    let body = if method.carries_body() {
        let bytes = payload
            .to_json_bytes()
            .map_err(|e| DispatchFailure::Encoding {
                message: e.to_string(),
            })?;
        // HeaderMap names are case-insensitive, so any spelling of the
        // destination's own Content-Type wins
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        }
        Some(Bytes::from(bytes))
    } else {
        append_query(&mut url, payload);
        None
    };

    Ok(OutboundRequest {
        destination_id: destination.id,
        method,
        url,
        headers,
        body,
    })
}

fn build_headers(destination: &Destination) -> Result<HeaderMap, DispatchFailure> {
    let mut headers = HeaderMap::with_capacity(destination.headers.len() + 1);
    for (name, value) in &destination.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| DispatchFailure::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| DispatchFailure::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

/// Append the payload as form-urlencoded query pairs.
///
/// `&` is used when the URL already has a query, `?` otherwise. Every key
/// yields at least one pair (`[]` becomes `key=`). An empty payload leaves
/// the URL untouched.
fn append_query(url: &mut Url, payload: &InboundPayload) {
    if payload.is_empty() {
        return;
    }

    let mut pairs = url.query_pairs_mut();
    for (key, value) in payload.as_map() {
        match value {
            Value::Array(items) if items.is_empty() => {
                pairs.append_pair(key, "");
            }
            Value::Array(items) => {
                for item in items {
                    pairs.append_pair(key, &scalar_text(item));
                }
            }
            other => {
                pairs.append_pair(key, &scalar_text(other));
            }
        }
    }
}

/// Query text of a single value; nested structures become empty
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
