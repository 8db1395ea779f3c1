//! Request/response pipeline.
//!
//! A `Pipeline` is an ordered list of request stages `(ApiRequest) -> ApiRequest`
//! and response stages `(ApiResponse) -> ApiResponse`. Between the two, the
//! raw transport result is normalized into an `ApiResponse`, so no transport
//! failure ever reaches a caller unshaped.
//!
//! Standard stages:
//! - `AuthHeader`: attaches `Authorization: Bearer <token>` from the session
//! - `RequestLog` / `ResponseLog`: debug tracing of traffic
//! - `RejectedSessionReset`: on 401, drops the session and sends the user to login

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::error::{ApiError, ErrorKind, STATUS_NO_RESPONSE, STATUS_UNKNOWN};
use super::transport::{HttpReply, TransportError};
use crate::auth::session::{strip_scheme, CREDENTIAL_SCHEME};
use crate::auth::SessionManager;
use crate::nav::{is_auth_screen, Navigator, LOGIN_PATH};

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Anything other than GET/HEAD changes server state
    pub fn is_mutation(&self) -> bool {
        self.method != Method::GET && self.method != Method::HEAD
    }

    pub fn has_auth(&self) -> bool {
        self.headers.contains_key(header::AUTHORIZATION)
    }
}

/// Uniform outcome of every call: `{status, message, data}`.
///
/// `status` is the HTTP status, `0` when no response arrived, or `-1` when
/// the request failed before reaching the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ApiResponse {
    pub status: i32,
    pub message: String,
    #[cfg_attr(feature = "ts", ts(type = "unknown"))]
    pub data: Value,
    /// Request path, for logging and stage decisions
    #[serde(skip)]
    pub path: String,
}

impl ApiResponse {
    pub fn classification(&self) -> Option<ErrorKind> {
        ErrorKind::from_status(self.status)
    }

    pub fn is_success(&self) -> bool {
        self.classification().is_none()
    }

    pub fn into_result(self) -> Result<Value, ApiError> {
        match self.classification() {
            None => Ok(self.data),
            Some(kind) => Err(ApiError {
                kind,
                status: self.status,
                message: self.message,
                data: self.data,
            }),
        }
    }
}

/// Shape a raw transport result into an `ApiResponse`.
pub fn normalize(
    result: Result<HttpReply, TransportError>,
    path: &str,
    base_url: &str,
) -> ApiResponse {
    match result {
        Ok(reply) => {
            let status = i32::from(reply.status);
            let data = parse_body(&reply.body);
            let message = if (200..300).contains(&status) {
                String::new()
            } else {
                data.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Request failed with status code {}", status))
            };
            ApiResponse {
                status,
                message,
                data,
                path: path.to_string(),
            }
        }
        Err(TransportError::NoResponse(detail)) => {
            debug!(path, detail = %detail, "No response received");
            ApiResponse {
                status: STATUS_NO_RESPONSE,
                message: format!(
                    "Network error. Please check that the backend is reachable at {}.",
                    base_url
                ),
                data: Value::Null,
                path: path.to_string(),
            }
        }
        Err(TransportError::Other(detail)) => ApiResponse {
            status: STATUS_UNKNOWN,
            message: if detail.is_empty() {
                "An unexpected error occurred".to_string()
            } else {
                detail
            },
            data: Value::Null,
            path: path.to_string(),
        },
    }
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(ApiError::truncate_body(body)))
}

pub trait RequestStage: Send + Sync {
    fn apply(&self, request: ApiRequest) -> ApiRequest;
}

pub trait ResponseStage: Send + Sync {
    fn apply(&self, response: ApiResponse) -> ApiResponse;
}

impl<F> RequestStage for F
where
    F: Fn(ApiRequest) -> ApiRequest + Send + Sync,
{
    fn apply(&self, request: ApiRequest) -> ApiRequest {
        self(request)
    }
}

impl<F> ResponseStage for F
where
    F: Fn(ApiResponse) -> ApiResponse + Send + Sync,
{
    fn apply(&self, response: ApiResponse) -> ApiResponse {
        self(response)
    }
}

#[derive(Clone, Default)]
pub struct Pipeline {
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Auth header, optional traffic logging, and the rejected-session reset.
    pub fn standard(
        session: Arc<SessionManager>,
        navigator: Arc<dyn Navigator>,
        exempt_paths: Vec<String>,
        debug: bool,
    ) -> Self {
        let mut pipeline = Self::new().request_stage(AuthHeader::new(session.clone()));
        if debug {
            pipeline = pipeline.request_stage(RequestLog);
        }
        pipeline = pipeline.response_stage(
            RejectedSessionReset::new(session, navigator).exempt(exempt_paths),
        );
        pipeline.response_stage(ResponseLog { debug })
    }

    pub fn request_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        self.request_stages.push(Arc::new(stage));
        self
    }

    pub fn response_stage(mut self, stage: impl ResponseStage + 'static) -> Self {
        self.response_stages.push(Arc::new(stage));
        self
    }

    pub fn run_request(&self, request: ApiRequest) -> ApiRequest {
        self.request_stages
            .iter()
            .fold(request, |req, stage| stage.apply(req))
    }

    pub fn run_response(&self, response: ApiResponse) -> ApiResponse {
        self.response_stages
            .iter()
            .fold(response, |resp, stage| stage.apply(resp))
    }
}

/// Attaches the session token as a bearer credential.
pub struct AuthHeader {
    session: Arc<SessionManager>,
}

impl AuthHeader {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }
}

impl RequestStage for AuthHeader {
    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        let Some(token) = self.session.token() else {
            return request;
        };
        let value = format!("{} {}", CREDENTIAL_SCHEME, strip_scheme(&token));
        match HeaderValue::from_str(&value) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(header::AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "Session token is not a valid header value"),
        }
        request
    }
}

pub struct RequestLog;

impl RequestStage for RequestLog {
    fn apply(&self, request: ApiRequest) -> ApiRequest {
        debug!(
            method = %request.method,
            path = %request.path,
            has_auth = request.has_auth(),
            "API request"
        );
        request
    }
}

/// On 401: clear the session and route to the login screen, unless the user
/// is already on the login or registration screen.
pub struct RejectedSessionReset {
    session: Arc<SessionManager>,
    navigator: Arc<dyn Navigator>,
    exempt_paths: Vec<String>,
}

impl RejectedSessionReset {
    pub fn new(session: Arc<SessionManager>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            session,
            navigator,
            exempt_paths: Vec::new(),
        }
    }

    /// Request paths whose 401 means "bad credentials" rather than "session rejected"
    pub fn exempt(mut self, paths: Vec<String>) -> Self {
        self.exempt_paths = paths;
        self
    }
}

impl ResponseStage for RejectedSessionReset {
    fn apply(&self, response: ApiResponse) -> ApiResponse {
        if response.classification() != Some(ErrorKind::Unauthorized)
            || self.exempt_paths.iter().any(|p| *p == response.path)
        {
            return response;
        }

        info!(path = %response.path, "Unauthorized, clearing session");
        self.session.clear_rejected();

        let location = self.navigator.current_location();
        if !is_auth_screen(&location) {
            self.navigator.navigate(LOGIN_PATH);
        }
        response
    }
}

/// Logs classified failures, and successes when debug is on.
pub struct ResponseLog {
    pub debug: bool,
}

impl ResponseStage for ResponseLog {
    fn apply(&self, response: ApiResponse) -> ApiResponse {
        match response.classification() {
            None => {
                if self.debug {
                    debug!(status = response.status, path = %response.path, data = %response.data, "API response");
                }
            }
            Some(ErrorKind::NetworkError) => {
                error!(path = %response.path, message = %response.message, "No response from server");
            }
            Some(kind) => {
                warn!(
                    status = response.status,
                    path = %response.path,
                    kind = %kind,
                    message = %response.message,
                    "API error"
                );
            }
        }
        response
    }
}
