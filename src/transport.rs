//! One HTTP request/response cycle against the licensing service.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{PremiaError, Result};
use crate::signer::{self, http_date_now};
use crate::types::{ApiErrorEnvelope, Credentials, Entity};

/// Connect timeout for every request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Total timeout for every request. A hang surfaces as a transport error.
const TOTAL_TIMEOUT: Duration = Duration::from_secs(60);
/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// Extension point invoked before every request is dispatched.
///
/// Embedders can rewrite request parameters (e.g. append telemetry opt-in
/// flags) without patching the SDK. The default implementation is a no-op.
pub trait RequestFilter: Send + Sync {
    fn before_request(&self, endpoint: &str, params: &mut Map<String, Value>) {
        let _ = (endpoint, params);
    }
}

/// Default no-op [`RequestFilter`].
#[derive(Debug, Default)]
pub struct NoopRequestFilter;

impl RequestFilter for NoopRequestFilter {}

/// Issues signed (or unauthenticated) requests for one entity and
/// normalizes responses into typed payloads or [`PremiaError`] values.
#[derive(Clone)]
pub struct Transport {
    http: HttpClient,
    base_url: String,
    entity: Entity,
    filter: Arc<dyn RequestFilter>,
}

impl Transport {
    pub fn new(
        base_url: &str,
        entity: Entity,
        accept_invalid_certs: bool,
        filter: Arc<dyn RequestFilter>,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .user_agent(concat!("premia-sdk-rust/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(TOTAL_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| PremiaError::network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            entity,
            filter,
        })
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Resource path as signed and dispatched: `/v1/{scope}s/{id}/{endpoint}`.
    ///
    /// GET query parameters are appended to the URL only; they are never
    /// part of the signed path.
    fn canonical_path(&self, endpoint: &str) -> String {
        format!(
            "/v1/{}/{}/{}",
            self.entity.scope.path_segment(),
            self.entity.id,
            endpoint.trim_start_matches('/')
        )
    }

    /// Issue one request and decode the response into `T`.
    ///
    /// Signs with `credentials` when both keys are non-empty; sends
    /// unauthenticated otherwise.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        mut params: Map<String, Value>,
        credentials: Option<&Credentials>,
    ) -> Result<T> {
        self.filter.before_request(endpoint, &mut params);

        let path = self.canonical_path(endpoint);
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method = %method, path = %path, "dispatching api request");

        let body = if method == Method::GET {
            None
        } else {
            Some(Value::Object(params.clone()))
        };

        let mut request = self.http.request(method.clone(), &url);

        if let Some(credentials) = credentials.filter(|c| c.is_usable()) {
            let signed = signer::sign_request(
                &method,
                &path,
                body.as_ref(),
                &self.entity.id,
                credentials,
                &http_date_now(),
            );
            request = request
                .header("Date", &signed.date)
                .header("Authorization", &signed.authorization);
            if let Some(md5) = &signed.content_md5 {
                request = request.header("Content-MD5", md5);
            }
        }

        request = match &body {
            // Content-Type: application/json is forced by .json()
            Some(body) => request.json(body),
            None => request.query(&query_pairs(&params)),
        };

        let response = request
            .send()
            .await
            .map_err(|e| PremiaError::network(e.to_string()))?;

        self.normalize(response).await
    }

    /// Normalize a response into a typed payload or an error value.
    ///
    /// Some failure responses arrive as an already-structured error object
    /// and others as a JSON-encoded string needing a second decode, so the
    /// `{error: {code, message}}` shape is checked both before and after
    /// decoding.
    async fn normalize<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PremiaError::network(e.to_string()))?;

        // Pre-decode: the raw body may already be the error envelope.
        if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(&text) {
            tracing::warn!(code = %envelope.error.code, "remote error response");
            return Err(PremiaError::remote(
                envelope.error.code,
                envelope.error.message,
            ));
        }

        let mut value: Value = if text.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                // A failed request may carry a plain-text or HTML body
                // (gateway pages); that is a remote failure, not a broken
                // success payload.
                Err(_) if !status.is_success() => {
                    return Err(remote_from_status(status, &text));
                }
                Err(e) => {
                    return Err(PremiaError::ContractViolation(format!(
                        "response is not JSON: {}",
                        e
                    )));
                }
            }
        };

        // Post-decode: a doubly-encoded body decodes to a string holding
        // the real payload.
        if let Value::String(inner) = &value
            && let Ok(decoded) = serde_json::from_str::<Value>(inner)
        {
            value = decoded;
        }

        if let Ok(envelope) = serde_json::from_value::<ApiErrorEnvelope>(value.clone()) {
            tracing::warn!(code = %envelope.error.code, "remote error response");
            return Err(PremiaError::remote(
                envelope.error.code,
                envelope.error.message,
            ));
        }

        if !status.is_success() {
            return Err(remote_from_status(status, &text));
        }

        serde_json::from_value(value)
            .map_err(|e| PremiaError::ContractViolation(e.to_string()))
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("entity", &self.entity)
            .finish()
    }
}

/// HTTP failure without a structured envelope; carry the status as the code.
fn remote_from_status(status: StatusCode, body: &str) -> PremiaError {
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.chars().take(200).collect()
    };
    PremiaError::remote(status.as_u16().to_string(), message)
}

/// Flatten JSON params into query pairs; scalars only, strings unquoted.
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| {
            let rendered = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), rendered)
        })
        .collect()
}
