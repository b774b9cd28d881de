// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;
use std::error::Error;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    header,
    http::{self, HeaderMap},
    Response, StatusCode,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

pub type HttpResponse = Response<Full<Bytes>>;

/// Does two things:
/// 1. Logs the given message. A success status code (within 200-299) will cause a debug log to be
///    written, otherwise error will be written.
/// 2. Returns the given message in the body of JSON response with the given status code.
///
/// Response body format:
/// {
///     "message": message
/// }
pub fn log_and_create_http_response(message: &str, status: StatusCode) -> http::Result<HttpResponse> {
    if status.is_success() {
        debug!("{message}");
    } else {
        error!("{message}");
    }
    let body = json!({ "message": message }).to_string();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
}

/// Returns the given value serialized as a JSON response body with the given status code.
pub fn create_json_http_response<T: Serialize>(
    value: &T,
    status: StatusCode,
) -> http::Result<HttpResponse> {
    match serde_json::to_string(value) {
        Ok(body) => Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body))),
        Err(e) => log_and_create_http_response(
            &format!("Failed to serialize response: {e}"),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}

/// Takes a request's header map, and verifies that the "content-length" and/or "Transfer-Encoding" header
/// is present, valid, and less than the given max_content_length.
///
/// Will return None if no issues are found. Otherwise logs an error (with the given prefix) and
/// returns and HTTP Response with the appropriate error status code.
pub fn verify_request_content_length(
    header_map: &HeaderMap,
    max_content_length: usize,
    error_message_prefix: &str,
) -> Option<http::Result<HttpResponse>> {
    let Some(content_length_header) = header_map.get(header::CONTENT_LENGTH) else {
        if let Some(transfer_encoding_header) = header_map.get(header::TRANSFER_ENCODING) {
            debug!("Transfer-Encoding header is present: {transfer_encoding_header:?}");
            return None;
        }
        return Some(log_and_create_http_response(
            &format!("{error_message_prefix}: Missing Content-Length and Transfer-Encoding header"),
            StatusCode::LENGTH_REQUIRED,
        ));
    };
    let content_length = match content_length_header
        .to_str()
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        Some(res) => res,
        None => {
            return Some(log_and_create_http_response(
                &format!("{error_message_prefix}: Invalid Content-Length header"),
                StatusCode::BAD_REQUEST,
            ));
        }
    };
    if content_length > max_content_length {
        return Some(log_and_create_http_response(
            &format!("{error_message_prefix}: Payload too large"),
            StatusCode::PAYLOAD_TOO_LARGE,
        ));
    }
    None
}

/// Builds a reqwest client with optional proxy configuration and timeout.
/// Uses rustls TLS.
pub fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, Box<dyn Error + Send + Sync>> {
    let mut builder = reqwest::Client::builder().use_rustls_tls().timeout(timeout);
    if let Some(proxy) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    Ok(builder.build()?)
}
