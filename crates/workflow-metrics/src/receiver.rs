// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP endpoint that accepts log-subscription deliveries and runs each one
//! through the [`BatchDriver`].

use std::error::Error as StdError;
use std::io;
use std::sync::Arc;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper::{http, Method, Request, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::decoder::SubscriptionEvent;
use crate::driver::BatchDriver;
use crate::errors::BatchError;
use crate::http_utils::{
    create_json_http_response, log_and_create_http_response, verify_request_content_length,
    HttpResponse,
};

pub const LOGS_ENDPOINT_PATH: &str = "/v1/logs";
pub const HEALTH_ENDPOINT_PATH: &str = "/health";

pub struct LogReceiver {
    driver: Arc<Mutex<BatchDriver>>,
    max_request_content_length: usize,
    cancel_token: CancellationToken,
}

impl LogReceiver {
    #[must_use]
    pub fn new(
        driver: BatchDriver,
        max_request_content_length: usize,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
            max_request_content_length,
            cancel_token,
        }
    }

    /// Serves connections from `listener` until the cancellation token fires.
    pub async fn serve(
        &self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let driver = Arc::clone(&self.driver);
        let max_request_content_length = self.max_request_content_length;
        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
            // called for each http request
            let driver = Arc::clone(&driver);
            async move { Self::endpoint_handler(driver, max_request_content_length, req).await }
        });

        info!("Log receiver listening on {}", listener.local_addr()?);

        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let conn = tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!("Log receiver shutting down");
                    return Ok(());
                },
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        error!("Connection handler panicked: {e:?}");
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    error!("Connection error: {e}");
                }
            });
        }
    }

    /// Routes a request. Generic over the body so it can be driven without a socket.
    pub async fn endpoint_handler<B>(
        driver: Arc<Mutex<BatchDriver>>,
        max_request_content_length: usize,
        req: Request<B>,
    ) -> http::Result<HttpResponse>
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        match (req.method(), req.uri().path()) {
            (&Method::POST, LOGS_ENDPOINT_PATH) => {
                Self::logs_handler(driver, max_request_content_length, req).await
            }
            (&Method::GET, HEALTH_ENDPOINT_PATH) => {
                log_and_create_http_response("OK", StatusCode::OK)
            }
            (method, path @ (LOGS_ENDPOINT_PATH | HEALTH_ENDPOINT_PATH)) => {
                log_and_create_http_response(
                    &format!("Method {method} not allowed on {path}"),
                    StatusCode::METHOD_NOT_ALLOWED,
                )
            }
            (_, path) => log_and_create_http_response(
                &format!("No endpoint at {path}"),
                StatusCode::NOT_FOUND,
            ),
        }
    }

    async fn logs_handler<B>(
        driver: Arc<Mutex<BatchDriver>>,
        max_request_content_length: usize,
        req: Request<B>,
    ) -> http::Result<HttpResponse>
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        if let Some(response) = verify_request_content_length(
            req.headers(),
            max_request_content_length,
            "Error processing logs",
        ) {
            return response;
        }

        // Chunked deliveries carry no Content-Length, so the limit is also
        // enforced while reading.
        let body = match Limited::new(req.into_body(), max_request_content_length)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => {
                return log_and_create_http_response(
                    "Error processing logs: Payload too large",
                    StatusCode::PAYLOAD_TOO_LARGE,
                );
            }
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error reading request body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        let event: SubscriptionEvent = match serde_json::from_slice(&body) {
            Ok(event) => event,
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error processing logs: invalid subscription event: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        let driver = driver.lock().await;
        match driver.process_payload(&event.awslogs.data).await {
            Ok(summary) => create_json_http_response(&summary, StatusCode::ACCEPTED),
            Err(e @ BatchError::Decode(_)) => log_and_create_http_response(
                &format!("Error processing logs: {e}"),
                StatusCode::BAD_REQUEST,
            ),
            Err(e @ BatchError::PublishAborted { .. }) => log_and_create_http_response(
                &format!("Error processing logs: {e}"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        }
    }
}
