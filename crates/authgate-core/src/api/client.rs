//! API client for the authentication backend.
//!
//! Every call goes through the `Pipeline`: request stages, transport,
//! normalization, response stages. Failed calls are retried according to
//! whether they mutate server state.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::pipeline::{normalize, ApiRequest, ApiResponse, Pipeline};
use super::retry::RetryPolicy;
use super::transport::Transport;
use super::ApiError;
use crate::auth::session::{AuthPayload, Role};
use crate::config::{Config, Endpoints};

/// Login request body
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Register request body
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct HealthStatus {
    status: String,
}

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    pipeline: Pipeline,
    query_retry: RetryPolicy,
    mutation_retry: RetryPolicy,
    endpoints: Endpoints,
}

impl ApiClient {
    /// Create a client with default endpoints and retry policies
    pub fn new(transport: Arc<dyn Transport>, pipeline: Pipeline) -> Self {
        let defaults = Config::default();
        Self {
            transport,
            pipeline,
            query_retry: defaults.query_retry(),
            mutation_retry: defaults.mutation_retry(),
            endpoints: defaults.endpoints,
        }
    }

    /// Create a client configured from `config`
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>, pipeline: Pipeline) -> Self {
        Self::new(transport, pipeline)
            .with_retry(config.query_retry(), config.mutation_retry())
            .with_endpoints(config.endpoints.clone())
    }

    pub fn with_retry(mut self, query: RetryPolicy, mutation: RetryPolicy) -> Self {
        self.query_retry = query;
        self.mutation_retry = mutation;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Run a request through the pipeline with the retry policy for its method.
    pub async fn execute(&self, request: ApiRequest) -> ApiResponse {
        let policy = if request.is_mutation() {
            self.mutation_retry
        } else {
            self.query_retry
        };
        self.execute_with(request, policy).await
    }

    pub async fn execute_with(&self, request: ApiRequest, policy: RetryPolicy) -> ApiResponse {
        let mut attempt = 0;
        loop {
            let response = self.dispatch(request.clone()).await;
            let Some(kind) = response.classification() else {
                return response;
            };
            match policy.next_delay(attempt, kind) {
                Some(delay) => {
                    attempt += 1;
                    warn!(
                        path = %request.path,
                        status = response.status,
                        retry = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return response,
            }
        }
    }

    /// One attempt. Request stages run per attempt so a retry picks up the
    /// latest committed token.
    async fn dispatch(&self, request: ApiRequest) -> ApiResponse {
        let request = self.pipeline.run_request(request);
        let result = self.transport.send(&request).await;
        let response = normalize(result, &request.path, self.transport.base_url());
        self.pipeline.run_response(response)
    }

    /// Execute and decode the response data as `T`
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(request).await;
        let status = response.status;
        let data = response.into_result()?;
        serde_json::from_value(data).map_err(|e| ApiError::invalid_body(status, &e))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send_json(ApiRequest::post(path).with_json(to_value(body)?))
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send_json(ApiRequest::new(Method::PUT, path).with_json(to_value(body)?))
            .await
    }

    /// DELETE; the response body, if any, is returned as raw JSON
    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(ApiRequest::new(Method::DELETE, path))
            .await
            .into_result()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
        self.post(&self.endpoints.login, credentials).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthPayload, ApiError> {
        self.post(&self.endpoints.register, registration).await
    }

    /// Probe the backend. Single attempt; any failure means down.
    pub async fn health(&self) -> bool {
        let response = self
            .execute_with(ApiRequest::get(&self.endpoints.health), RetryPolicy::none())
            .await;
        let status = response.status;
        let health = response.into_result().and_then(|data| {
            serde_json::from_value::<HealthStatus>(data)
                .map_err(|e| ApiError::invalid_body(status, &e))
        });
        match health {
            Ok(health) => health.status == "UP",
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }
}

fn to_value<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| {
        ApiError::new(
            super::ErrorKind::Unknown,
            super::error::STATUS_UNKNOWN,
            format!("Failed to encode request body: {}", e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;
    use crate::auth::SessionManager;
    use crate::nav::{MemoryNavigator, Navigator, LOGIN_PATH};
    use crate::store::MemoryStore;
    use crate::testing::ScriptedTransport;
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        session: Arc<SessionManager>,
        nav: Arc<MemoryNavigator>,
        client: ApiClient,
    }

    fn harness(location: &str) -> Harness {
        let transport = Arc::new(ScriptedTransport::new());
        let session = Arc::new(SessionManager::new(Arc::new(MemoryStore::new())));
        let nav = Arc::new(MemoryNavigator::starting_at(location));
        let endpoints = Endpoints::default();
        let pipeline = Pipeline::standard(
            session.clone(),
            nav.clone(),
            vec![endpoints.login.clone(), endpoints.register.clone()],
            false,
        );
        let client = ApiClient::new(transport.clone(), pipeline).with_retry(
            RetryPolicy::query(Duration::ZERO, Duration::ZERO),
            RetryPolicy::mutation(Duration::ZERO),
        );
        Harness {
            transport,
            session,
            nav,
            client,
        }
    }

    fn sign_in(session: &SessionManager) {
        session.login(&AuthPayload {
            token: "xyz".into(),
            email: "a@b.com".into(),
            full_name: Some("Jane Doe".into()),
            role: Role::Admin,
        });
    }

    #[tokio::test]
    async fn test_get_decodes_json() {
        let h = harness("/students");
        h.transport.reply(200, r#"[{"id":1},{"id":2}]"#);

        let data: Vec<Value> = h.client.get("/admins").await.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(h.transport.requests()[0].method, Method::GET);
    }

    #[tokio::test]
    async fn test_every_attempt_carries_auth_header() {
        let h = harness("/students");
        sign_in(&h.session);
        h.transport.reply(500, "").reply(200, "{}");

        let _: Value = h.client.get("/admins").await.unwrap();
        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        for request in requests {
            assert_eq!(
                request.headers.get(reqwest::header::AUTHORIZATION).unwrap(),
                "Bearer xyz"
            );
        }
    }

    #[tokio::test]
    async fn test_query_retried_twice() {
        let h = harness("/students");
        h.transport.reply(500, "").reply(500, "").reply(500, "").reply(200, "{}");

        let err = h.client.get::<Value>("/admins").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServerError);
        assert_eq!(h.transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_mutation_retried_once() {
        let h = harness("/students");
        h.transport.no_response().no_response().reply(200, "{}");

        let err = h
            .client
            .post::<Value, _>("/admins", &json!({"name": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NetworkError);
        assert_eq!(err.status, 0);
        assert_eq!(h.transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_not_retried_and_session_cleared() {
        let h = harness("/students");
        sign_in(&h.session);
        h.transport.reply(401, r#"{"message":"Token expired"}"#).reply(200, "{}");

        let err = h.client.get::<Value>("/admins").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, "Token expired");
        assert_eq!(h.transport.requests().len(), 1);
        assert!(!h.session.check_auth());
        assert_eq!(h.nav.current_location(), LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_other_failures_leave_session_alone() {
        let h = harness("/students");
        sign_in(&h.session);
        h.transport.reply(403, "").reply(404, "");

        // DELETE is a mutation: one retry, the last outcome wins
        let err = h.client.delete("/admins/7").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(h.transport.requests().len(), 2);
        assert!(h.session.check_auth());
        assert_eq!(h.nav.moves(), 0);
    }

    #[tokio::test]
    async fn test_login_rejection_keeps_existing_session() {
        let h = harness("/login");
        sign_in(&h.session);
        h.transport.reply(401, r#"{"message":"Bad credentials"}"#);

        let err = h
            .client
            .login(&Credentials::new("a@b.com", "wrong"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(h.session.check_auth());
        assert_eq!(h.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_login_request_shape() {
        let h = harness("/login");
        h.transport.reply(
            200,
            r#"{"token":"Bearer xyz","type":"Bearer","email":"a@b.com","fullName":"Jane Doe","role":"ADMIN"}"#,
        );

        let payload = h
            .client
            .login(&Credentials::new("a@b.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(payload.token, "Bearer xyz");
        assert_eq!(payload.role, Role::Admin);

        let request = &h.transport.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/login");
        assert_eq!(
            request.body,
            Some(json!({"email": "a@b.com", "password": "secret1"}))
        );
        assert!(!request.has_auth());
    }

    #[tokio::test]
    async fn test_register_omits_absent_fields() {
        let h = harness("/register");
        h.transport
            .reply(200, r#"{"token":"t","email":"a@b.com","role":"USER"}"#);

        let registration = Registration {
            email: "a@b.com".into(),
            password: "secret1".into(),
            full_name: None,
            role: Some(Role::User),
        };
        h.client.register(&registration).await.unwrap();
        assert_eq!(
            h.transport.requests()[0].body,
            Some(json!({"email": "a@b.com", "password": "secret1", "role": "USER"}))
        );
    }

    #[tokio::test]
    async fn test_invalid_success_body() {
        let h = harness("/login");
        h.transport.reply(200, r#"{"unexpected":true}"#);

        let err = h
            .client
            .login(&Credentials::new("a@b.com", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.status, 200);
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness("/");
        h.transport.reply(200, r#"{"status":"UP"}"#);
        assert!(h.client.health().await);

        h.transport.reply(200, r#"{"status":"DOWN"}"#);
        assert!(!h.client.health().await);

        h.transport.no_response();
        assert!(!h.client.health().await);
        // Single attempt each
        assert_eq!(h.transport.requests().len(), 3);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("a@b.com", "hunter2");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("a@b.com"));
        assert!(!shown.contains("hunter2"));
    }
}
