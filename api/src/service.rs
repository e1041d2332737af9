use crate::ServiceError;
use crate::dispatch::{Context, Dispatcher, Envelope, respond};
use crate::errors::{ApiError, Result};
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS};
use http::{HeaderMap, Method, StatusCode};
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use serde_json::Value;
use shared::http::json_response;
use shared::{counter, histogram};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use store::ResilientStore;

const REQUEST_ID_HEADER: &str = "x-request-id";
const METHOD_ROUTE: &str = "method";

/// Thin HTTP adapter in front of the [`Dispatcher`].
#[derive(Clone)]
pub struct ScoringService {
    inner: Arc<Inner>,
}

struct Inner {
    dispatcher: Dispatcher,
    store: Arc<ResilientStore>,
}

impl ScoringService {
    pub fn new(dispatcher: Dispatcher, store: Arc<ResilientStore>) -> Self {
        Self {
            inner: Arc::new(Inner { dispatcher, store }),
        }
    }

    /// Handles one call routed at `path` and returns the envelope to send.
    pub async fn handle(&self, path: &str, headers: &HeaderMap, body: &[u8]) -> (Envelope, StatusCode) {
        let start = Instant::now();
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::info!(request_id = %request_id, path, "handling request");

        let mut context = Context::new(request_id.as_str());
        let result = match path.trim_start_matches('/') {
            METHOD_ROUTE => match parse_body(body) {
                Ok(body) => {
                    let (result, dispatched) = self.dispatch(body, context.clone()).await;
                    context = dispatched;
                    result
                }
                Err(err) => Err(err),
            },
            _ => Err(ApiError::NotFound),
        };

        if let Err(ApiError::Internal(reason)) = &result {
            tracing::error!(request_id = %request_id, reason = %reason, "unexpected error");
        }

        let (envelope, status) = respond(result);
        counter!(REQUESTS, "code" => status.as_u16().to_string()).increment(1);
        histogram!(REQUEST_DURATION).record(start.elapsed().as_secs_f64());

        if let Ok(rendered) = serde_json::to_value(&envelope) {
            context.extend(rendered);
        }
        tracing::info!(request_id = %request_id, context = %context, "request completed");

        (envelope, status)
    }

    /// Runs the dispatch on its own task so a panic surfaces as a 500.
    async fn dispatch(&self, body: Value, context: Context) -> (Result<Value>, Context) {
        let inner = self.inner.clone();
        let fallback_context = context.clone();
        let task = tokio::spawn(async move {
            let mut context = context;
            let result = inner
                .dispatcher
                .dispatch(&body, &mut context, &inner.store)
                .await;
            (result, context)
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(err) => (Err(ApiError::Internal(err.to_string())), fallback_context),
        }
    }
}

fn parse_body(body: &[u8]) -> Result<Value> {
    match serde_json::from_slice(body) {
        Ok(body @ Value::Object(_)) => Ok(body),
        Ok(_) => Err(ApiError::BadRequest),
        Err(err) => {
            tracing::debug!(error = %err, "unparseable request body");
            Err(ApiError::BadRequest)
        }
    }
}

impl Service<Request<Incoming>> for ScoringService {
    type Response = Response<BoxBody<Bytes, Self::Error>>;
    type Error = ServiceError;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            let (parts, body) = req.into_parts();

            let (envelope, status) = if parts.method != Method::POST {
                tracing::debug!(method = %parts.method, path = parts.uri.path(), "method not allowed");
                respond(Err(ApiError::NotFound))
            } else {
                match body.collect().await {
                    Ok(collected) => {
                        service
                            .handle(parts.uri.path(), &parts.headers, &collected.to_bytes())
                            .await
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to read request body");
                        respond(Err(ApiError::BadRequest))
                    }
                }
            };

            Ok(json_response(status, &envelope)?)
        })
    }
}
