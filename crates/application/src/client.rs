//! Authenticated portal client
//!
//! [`ApiClient`] is the single entry point for talking to the portal
//! service. It reads credentials from a [`TokenStore`] on every
//! dispatch, attaches the bearer token, and on a 401 coordinates an
//! at-most-one-concurrent token refresh before replaying the request.

use std::sync::Arc;

use portico_domain::{
    ApiError, RawResponse, RequestDescriptor, ResponseBody, Session, SessionKey,
};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::ports::{HttpTransport, TokenStore};

const LOGIN_ENDPOINT: &str = "/api/auth/login/";
const REFRESH_ENDPOINT: &str = "/api/auth/token/refresh/";

/// Callback invoked exactly once when the session expires
/// irrecoverably. The view layer hooks this to redirect to a login
/// screen; the CLI prints a hint.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// Refresh coordination state.
///
/// `InFlight` holds the requests that arrived while a refresh was
/// running, in arrival order. Each gets the refresh outcome through
/// its channel and then replays its own request.
enum RefreshState {
    Idle,
    InFlight(Vec<oneshot::Sender<Result<String, ApiError>>>),
}

/// The authenticated portal client.
///
/// Cloning is cheap and clones share the token store, the transport
/// and the refresh coordination state, so concurrent requests from
/// clones still trigger at most one refresh.
///
/// # Example
///
/// ```ignore
/// let config = ClientConfig::new("http://127.0.0.1:8000")?;
/// let client = ApiClient::new(config, Arc::new(transport), Arc::new(store));
///
/// client.login("amina", "secret").await?;
/// let courses = client.courses().await?;
/// ```
pub struct ApiClient<T, S> {
    transport: Arc<T>,
    store: Arc<S>,
    config: ClientConfig,
    refresh: Arc<Mutex<RefreshState>>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl<T, S> Clone for ApiClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            refresh: Arc::clone(&self.refresh),
            on_session_expired: self.on_session_expired.clone(),
        }
    }
}

impl<T, S> ApiClient<T, S>
where
    T: HttpTransport,
    S: TokenStore,
{
    /// Creates a client over the given transport and token store.
    pub fn new(config: ClientConfig, transport: Arc<T>, store: Arc<S>) -> Self {
        Self {
            transport,
            store,
            config,
            refresh: Arc::new(Mutex::new(RefreshState::Idle)),
            on_session_expired: None,
        }
    }

    /// Registers a callback fired when the session cannot be kept
    /// alive. It runs after the store is cleared and before the
    /// failing requests resolve.
    #[must_use]
    pub fn with_session_expired_hook(
        mut self,
        hook: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    /// The client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying token store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Dispatches a request with bearer authentication.
    ///
    /// The access token is read from the store at dispatch time. On a
    /// 401 with a token attached, the client refreshes the token
    /// (joining any refresh already in flight) and replays this
    /// request once with the new token. A second 401 is returned as a
    /// plain [`ApiError::Http`].
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] variant, per the client taxonomy: `Timeout`
    /// and `Network` from the transport, `Http` for non-2xx
    /// responses, `Auth` when a required refresh fails.
    pub async fn request(
        &self,
        mut request: RequestDescriptor,
    ) -> Result<ResponseBody, ApiError> {
        let url = self.config.endpoint_url(&request.endpoint)?;
        if request.timeout_ms.is_none() {
            request.timeout_ms = Some(self.config.timeout_ms());
        }

        let token = self.store.get(SessionKey::AccessToken).await;
        if let Some(token) = &token {
            request.set_bearer(token);
        }

        let request_id = Uuid::now_v7();
        debug!(
            %request_id,
            method = %request.method,
            endpoint = %request.endpoint,
            "dispatching request"
        );
        let response = self.transport.send(url.clone(), &request).await?;
        debug!(
            %request_id,
            status = response.status,
            elapsed = ?response.elapsed,
            "response received"
        );

        if response.status == 401 && token.is_some() {
            let fresh = self.coordinate_refresh().await?;
            request.set_bearer(&fresh);
            debug!(%request_id, "replaying request with refreshed token");
            let replayed = self.transport.send(url, &request).await?;
            return complete(replayed);
        }

        complete(response)
    }

    /// Authenticates with username and password and stores the
    /// resulting session.
    ///
    /// The login call itself carries no bearer token and never
    /// triggers a refresh. When the server omits the user profile, a
    /// minimal `{"username": ...}` object is stored in its place.
    ///
    /// # Errors
    ///
    /// [`ApiError::Http`] with the server's `detail`/`message` text
    /// (or "Login failed") on a rejected login, [`ApiError::Network`]
    /// when the success response is not the expected JSON shape, and
    /// transport errors as themselves.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let request = RequestDescriptor::post(
            LOGIN_ENDPOINT,
            serde_json::json!({ "username": username, "password": password }),
        )
        .with_timeout_ms(self.config.timeout_ms());
        let url = self.config.endpoint_url(LOGIN_ENDPOINT)?;

        debug!(username, "logging in");
        let response = self.transport.send(url, &request).await?;
        if !response.is_success() {
            warn!(username, status = response.status, "login rejected");
            return Err(login_error(&response));
        }

        let body: Value = serde_json::from_slice(&response.body).map_err(|err| {
            ApiError::network(format!("Login response was not valid JSON: {err}"))
        })?;
        let (Some(access), Some(refresh)) = (
            non_empty_str(&body, "access"),
            non_empty_str(&body, "refresh"),
        ) else {
            return Err(ApiError::network(
                "Login response did not include access and refresh tokens",
            ));
        };

        let user = body
            .get("user")
            .filter(|user| !user.is_null())
            .cloned()
            .unwrap_or_else(|| serde_json::json!({ "username": username }));

        let session =
            Session::authenticated(access.to_owned(), refresh.to_owned(), user);
        self.store.store_session(&session).await;
        info!(username, "login successful");
        Ok(session)
    }

    /// Discards the stored session. Subsequent requests go out
    /// anonymously. Never fails, even when no session exists.
    pub async fn logout(&self) {
        self.store.clear_session().await;
        debug!("session cleared");
    }

    /// Returns true if an access token is currently stored.
    pub async fn is_authenticated(&self) -> bool {
        self.store.get(SessionKey::AccessToken).await.is_some()
    }

    /// Obtains a fresh access token, joining a refresh already in
    /// flight instead of starting a second one.
    ///
    /// Exactly one caller performs the refresh; the rest enqueue and
    /// receive the shared outcome in arrival order. Every caller then
    /// replays its own request.
    async fn coordinate_refresh(&self) -> Result<String, ApiError> {
        let waiter = {
            let mut state = self.refresh.lock().await;
            match &mut *state {
                RefreshState::InFlight(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::InFlight(Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            debug!("refresh already in flight, queueing");
            return match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(ApiError::auth("Token refresh was interrupted")),
            };
        }

        let outcome = self.refresh_access_token().await;

        // Collect waiters and reset to Idle in one critical section
        // so a late 401 starts a new cycle instead of joining a
        // finished one.
        let waiters = {
            let mut state = self.refresh.lock().await;
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::InFlight(waiters) => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };

        if outcome.is_err() {
            self.expire_session().await;
        }

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    /// Exchanges the stored refresh token for a new access token and
    /// stores it. Every failure path returns [`ApiError::Auth`].
    async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let Some(refresh_token) = self.store.get(SessionKey::RefreshToken).await else {
            return Err(ApiError::no_refresh_token());
        };

        info!("access token rejected, refreshing");
        let request = RequestDescriptor::post(
            REFRESH_ENDPOINT,
            serde_json::json!({ "refresh": refresh_token }),
        )
        .with_timeout_ms(self.config.timeout_ms());
        let url = self
            .config
            .endpoint_url(REFRESH_ENDPOINT)
            .map_err(|err| ApiError::auth(format!("Token refresh failed: {err}")))?;

        let response = self
            .transport
            .send(url, &request)
            .await
            .map_err(|err| ApiError::auth(format!("Token refresh failed: {err}")))?;
        if !response.is_success() {
            return Err(ApiError::auth(format!(
                "Token refresh failed (HTTP {})",
                response.status
            )));
        }

        let body: Value = serde_json::from_slice(&response.body)
            .map_err(|_| ApiError::auth("Token refresh returned an unreadable body"))?;
        let Some(access) = non_empty_str(&body, "access") else {
            return Err(ApiError::auth("Token refresh returned no access token"));
        };

        self.store.set(SessionKey::AccessToken, access).await;
        info!("access token refreshed");
        Ok(access.to_owned())
    }

    /// Clears the session and notifies the expiry hook. Runs once per
    /// failed refresh, regardless of how many requests were waiting.
    async fn expire_session(&self) {
        warn!("token refresh failed, clearing session");
        self.store.clear_session().await;
        if let Some(hook) = &self.on_session_expired {
            hook();
        }
    }
}

/// Turns a raw response into the caller-facing result: non-2xx
/// statuses become [`ApiError::Http`], everything else is classified
/// by content type.
fn complete(response: RawResponse) -> Result<ResponseBody, ApiError> {
    if !response.is_success() {
        return Err(ApiError::from_response(&response));
    }
    ResponseBody::classify(response)
}

/// Builds the login failure error: the body's `detail` or `message`
/// when it is JSON, otherwise a generic message. Login never falls
/// back to raw body text the way other endpoints do.
fn login_error(response: &RawResponse) -> ApiError {
    let payload = serde_json::from_slice::<Value>(&response.body).ok();
    let message = payload
        .as_ref()
        .and_then(ApiError::json_message)
        .unwrap_or("Login failed")
        .to_owned();
    ApiError::http(response.status, message, payload)
}

/// Reads a non-empty string field out of a JSON object.
fn non_empty_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use portico_domain::{HttpMethod, RequestBody};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::{RwLock, Semaphore};
    use url::Url;

    use super::*;

    /// In-memory token store for exercising the client.
    struct MemoryStore {
        values: RwLock<HashMap<SessionKey, String>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                values: RwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl TokenStore for MemoryStore {
        async fn get(&self, key: SessionKey) -> Option<String> {
            self.values.read().await.get(&key).cloned()
        }

        async fn set(&self, key: SessionKey, value: &str) {
            self.values.write().await.insert(key, value.to_string());
        }

        async fn remove(&self, key: SessionKey) {
            self.values.write().await.remove(&key);
        }
    }

    #[derive(Debug, Clone)]
    struct RecordedCall {
        method: HttpMethod,
        path: String,
        authorization: Option<String>,
        body: RequestBody,
    }

    /// Transport that replays scripted responses per method and path,
    /// recording every call. An optional gate holds refresh calls
    /// open so tests can pile up concurrent 401 handling.
    struct ScriptedTransport {
        scripts: StdMutex<HashMap<String, VecDeque<Result<RawResponse, ApiError>>>>,
        calls: StdMutex<Vec<RecordedCall>>,
        refresh_gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self {
                scripts: StdMutex::new(HashMap::new()),
                calls: StdMutex::new(Vec::new()),
                refresh_gate: None,
            }
        }

        fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                refresh_gate: Some(gate),
                ..Self::new()
            }
        }

        fn script(
            &self,
            method: HttpMethod,
            path: &str,
            response: Result<RawResponse, ApiError>,
        ) {
            self.scripts
                .lock()
                .unwrap()
                .entry(format!("{method} {path}"))
                .or_default()
                .push_back(response);
        }

        fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
            self.calls()
                .into_iter()
                .filter(|call| call.path == path)
                .collect()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(
            &self,
            url: Url,
            request: &RequestDescriptor,
        ) -> Result<RawResponse, ApiError> {
            let path = url.path().to_string();
            self.calls.lock().unwrap().push(RecordedCall {
                method: request.method,
                path: path.clone(),
                authorization: request.authorization().map(str::to_owned),
                body: request.body.clone(),
            });

            if path == REFRESH_ENDPOINT {
                if let Some(gate) = &self.refresh_gate {
                    gate.acquire().await.unwrap().forget();
                }
            }

            let key = format!("{} {path}", request.method);
            let mut scripts = self.scripts.lock().unwrap();
            scripts
                .get_mut(&key)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| panic!("no scripted response for {key}"))
        }
    }

    fn json_response(status: u16, body: &serde_json::Value) -> RawResponse {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/json".to_string(),
        );
        RawResponse::new(
            status,
            headers,
            serde_json::to_vec(body).unwrap(),
            Duration::from_millis(4),
        )
    }

    fn text_response(status: u16, body: &str) -> RawResponse {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        RawResponse::new(
            status,
            headers,
            body.as_bytes().to_vec(),
            Duration::from_millis(4),
        )
    }

    fn unauthorized() -> RawResponse {
        json_response(401, &json!({"detail": "Token expired"}))
    }

    fn harness(
        transport: ScriptedTransport,
    ) -> (
        ApiClient<ScriptedTransport, MemoryStore>,
        Arc<ScriptedTransport>,
        Arc<MemoryStore>,
    ) {
        let transport = Arc::new(transport);
        let store = Arc::new(MemoryStore::new());
        let config = ClientConfig::new("http://portal.test").unwrap();
        let client = ApiClient::new(config, Arc::clone(&transport), Arc::clone(&store));
        (client, transport, store)
    }

    async fn seed_session(store: &MemoryStore, access: &str, refresh: &str) {
        store.set(SessionKey::AccessToken, access).await;
        store.set(SessionKey::RefreshToken, refresh).await;
    }

    /// Spins until the refresh queue holds `count` waiters.
    async fn wait_for_waiters(
        client: &ApiClient<ScriptedTransport, MemoryStore>,
        count: usize,
    ) {
        for _ in 0..10_000 {
            {
                let state = client.refresh.lock().await;
                if let RefreshState::InFlight(waiters) = &*state {
                    if waiters.len() == count {
                        return;
                    }
                }
            }
            tokio::task::yield_now().await;
        }
        panic!("refresh queue never reached {count} waiter(s)");
    }

    #[tokio::test]
    async fn attaches_bearer_token_from_the_store() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Get,
            "/api/courses/courses/",
            Ok(json_response(200, &json!([]))),
        );
        let (client, transport, store) = harness(transport);
        seed_session(&store, "t1", "r1").await;

        client
            .request(RequestDescriptor::get("/api/courses/courses/"))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer t1"));
    }

    #[tokio::test]
    async fn anonymous_requests_carry_no_authorization_header() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Get,
            "/api/courses/notices/",
            Ok(json_response(200, &json!([]))),
        );
        let (client, transport, _store) = harness(transport);

        client
            .request(RequestDescriptor::get("/api/courses/notices/"))
            .await
            .unwrap();

        assert_eq!(transport.calls()[0].authorization, None);
    }

    #[tokio::test]
    async fn json_success_is_classified_by_content_type() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Get,
            "/api/results/results/",
            Ok(json_response(200, &json!({"count": 1}))),
        );
        let (client, _transport, _store) = harness(transport);

        let body = client
            .request(RequestDescriptor::get("/api/results/results/"))
            .await
            .unwrap();

        assert_eq!(body.as_json(), Some(&json!({"count": 1})));
    }

    #[tokio::test]
    async fn error_responses_surface_the_detail_message() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Post,
            "/api/library/books/3/borrow/",
            Ok(json_response(403, &json!({"detail": "Borrowing limit reached"}))),
        );
        let (client, _transport, _store) = harness(transport);

        let error = client
            .request(RequestDescriptor::post(
                "/api/library/books/3/borrow/",
                json!({}),
            ))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Borrowing limit reached");
        assert_eq!(error.status(), Some(403));
    }

    #[tokio::test]
    async fn timeout_errors_pass_through_without_refresh() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Get,
            "/api/courses/schedules/",
            Err(ApiError::Timeout { timeout_ms: 30_000 }),
        );
        let (client, transport, store) = harness(transport);
        seed_session(&store, "t1", "r1").await;

        let error = client
            .request(RequestDescriptor::get("/api/courses/schedules/"))
            .await
            .unwrap_err();

        assert!(error.is_timeout());
        assert!(transport.calls_to(REFRESH_ENDPOINT).is_empty());
    }

    #[tokio::test]
    async fn unauthorized_without_stored_token_is_a_plain_http_error() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Get,
            "/api/auth/student-profile/",
            Ok(unauthorized()),
        );
        let (client, transport, _store) = harness(transport);

        let error = client
            .request(RequestDescriptor::get("/api/auth/student-profile/"))
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(401));
        assert!(transport.calls_to(REFRESH_ENDPOINT).is_empty());
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_the_request_replayed() {
        let transport = ScriptedTransport::new();
        transport.script(HttpMethod::Post, "/api/todos/todos/", Ok(unauthorized()));
        transport.script(
            HttpMethod::Post,
            REFRESH_ENDPOINT,
            Ok(json_response(200, &json!({"access": "t2"}))),
        );
        transport.script(
            HttpMethod::Post,
            "/api/todos/todos/",
            Ok(json_response(201, &json!({"id": 9, "title": "study"}))),
        );
        let (client, transport, store) = harness(transport);
        seed_session(&store, "t1", "r1").await;
        let hook_count = Arc::new(AtomicUsize::new(0));
        let client = {
            let hook_count = Arc::clone(&hook_count);
            client.with_session_expired_hook(move || {
                hook_count.fetch_add(1, Ordering::SeqCst);
            })
        };

        let body = client
            .request(RequestDescriptor::post(
                "/api/todos/todos/",
                json!({"title": "study"}),
            ))
            .await
            .unwrap();

        assert_eq!(body.as_json(), Some(&json!({"id": 9, "title": "study"})));

        let todo_calls = transport.calls_to("/api/todos/todos/");
        assert_eq!(todo_calls.len(), 2);
        assert_eq!(todo_calls[0].authorization.as_deref(), Some("Bearer t1"));
        assert_eq!(todo_calls[1].authorization.as_deref(), Some("Bearer t2"));
        assert_eq!(todo_calls[0].body, todo_calls[1].body);

        let refresh_calls = transport.calls_to(REFRESH_ENDPOINT);
        assert_eq!(refresh_calls.len(), 1);
        assert_eq!(
            refresh_calls[0].body,
            RequestBody::Json(json!({"refresh": "r1"}))
        );
        assert_eq!(refresh_calls[0].authorization, None);

        assert_eq!(store.get(SessionKey::AccessToken).await.as_deref(), Some("t2"));
        assert_eq!(hook_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn requests_after_a_refresh_attach_the_new_token() {
        let transport = ScriptedTransport::new();
        transport.script(HttpMethod::Get, "/api/results/results/", Ok(unauthorized()));
        transport.script(
            HttpMethod::Post,
            REFRESH_ENDPOINT,
            Ok(json_response(200, &json!({"access": "t2"}))),
        );
        transport.script(
            HttpMethod::Get,
            "/api/results/results/",
            Ok(json_response(200, &json!([]))),
        );
        transport.script(
            HttpMethod::Get,
            "/api/courses/schedules/",
            Ok(json_response(200, &json!([]))),
        );
        let (client, transport, store) = harness(transport);
        seed_session(&store, "t1", "r1").await;

        client
            .request(RequestDescriptor::get("/api/results/results/"))
            .await
            .unwrap();
        client
            .request(RequestDescriptor::get("/api/courses/schedules/"))
            .await
            .unwrap();

        let schedule_calls = transport.calls_to("/api/courses/schedules/");
        assert_eq!(schedule_calls.len(), 1);
        assert_eq!(schedule_calls[0].authorization.as_deref(), Some("Bearer t2"));
        assert_eq!(transport.calls_to(REFRESH_ENDPOINT).len(), 1);
    }

    #[tokio::test]
    async fn second_unauthorized_after_refresh_is_terminal() {
        let transport = ScriptedTransport::new();
        transport.script(HttpMethod::Get, "/api/courses/courses/", Ok(unauthorized()));
        transport.script(
            HttpMethod::Post,
            REFRESH_ENDPOINT,
            Ok(json_response(200, &json!({"access": "t2"}))),
        );
        transport.script(HttpMethod::Get, "/api/courses/courses/", Ok(unauthorized()));
        let (client, transport, store) = harness(transport);
        seed_session(&store, "t1", "r1").await;

        let error = client
            .request(RequestDescriptor::get("/api/courses/courses/"))
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(401));
        assert_eq!(transport.calls_to(REFRESH_ENDPOINT).len(), 1);
    }

    #[tokio::test]
    async fn refresh_waiters_replay_their_own_requests() {
        let gate = Arc::new(Semaphore::new(0));
        let transport = ScriptedTransport::gated(Arc::clone(&gate));
        transport.script(HttpMethod::Get, "/api/courses/courses/", Ok(unauthorized()));
        transport.script(HttpMethod::Get, "/api/results/results/", Ok(unauthorized()));
        transport.script(
            HttpMethod::Post,
            REFRESH_ENDPOINT,
            Ok(json_response(200, &json!({"access": "t2"}))),
        );
        transport.script(
            HttpMethod::Get,
            "/api/courses/courses/",
            Ok(json_response(200, &json!({"kind": "courses"}))),
        );
        transport.script(
            HttpMethod::Get,
            "/api/results/results/",
            Ok(json_response(200, &json!({"kind": "results"}))),
        );
        let (client, transport, store) = harness(transport);
        seed_session(&store, "t1", "r1").await;

        let courses_client = client.clone();
        let courses = tokio::spawn(async move {
            courses_client
                .request(RequestDescriptor::get("/api/courses/courses/"))
                .await
        });
        let results_client = client.clone();
        let results = tokio::spawn(async move {
            results_client
                .request(RequestDescriptor::get("/api/results/results/"))
                .await
        });

        wait_for_waiters(&client, 1).await;
        gate.add_permits(1);

        let courses = courses.await.unwrap().unwrap();
        let results = results.await.unwrap().unwrap();

        assert_eq!(courses.as_json(), Some(&json!({"kind": "courses"})));
        assert_eq!(results.as_json(), Some(&json!({"kind": "results"})));
        assert_eq!(transport.calls_to(REFRESH_ENDPOINT).len(), 1);

        for path in ["/api/courses/courses/", "/api/results/results/"] {
            let calls = transport.calls_to(path);
            assert_eq!(calls.len(), 2, "one original and one replay for {path}");
            assert_eq!(calls[1].authorization.as_deref(), Some("Bearer t2"));
        }
    }

    #[tokio::test]
    async fn failed_refresh_rejects_all_waiters_with_the_same_error() {
        let gate = Arc::new(Semaphore::new(0));
        let transport = ScriptedTransport::gated(Arc::clone(&gate));
        transport.script(HttpMethod::Get, "/api/courses/courses/", Ok(unauthorized()));
        transport.script(HttpMethod::Get, "/api/results/results/", Ok(unauthorized()));
        transport.script(
            HttpMethod::Post,
            REFRESH_ENDPOINT,
            Ok(json_response(401, &json!({"detail": "refresh expired"}))),
        );
        let (client, transport, store) = harness(transport);
        seed_session(&store, "t1", "r1").await;
        store.set(SessionKey::User, r#"{"username":"amina"}"#).await;

        let hook_count = Arc::new(AtomicUsize::new(0));
        let client = {
            let hook_count = Arc::clone(&hook_count);
            client.with_session_expired_hook(move || {
                hook_count.fetch_add(1, Ordering::SeqCst);
            })
        };

        let first_client = client.clone();
        let first = tokio::spawn(async move {
            first_client
                .request(RequestDescriptor::get("/api/courses/courses/"))
                .await
        });
        let second_client = client.clone();
        let second = tokio::spawn(async move {
            second_client
                .request(RequestDescriptor::get("/api/results/results/"))
                .await
        });

        wait_for_waiters(&client, 1).await;
        gate.add_permits(1);

        let first = first.await.unwrap().unwrap_err();
        let second = second.await.unwrap().unwrap_err();

        assert!(first.is_auth());
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "Token refresh failed (HTTP 401)");

        assert_eq!(hook_count.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(SessionKey::AccessToken).await, None);
        assert_eq!(store.get(SessionKey::RefreshToken).await, None);
        assert_eq!(store.get(SessionKey::User).await, None);
        assert_eq!(transport.calls_to(REFRESH_ENDPOINT).len(), 1);
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_fast_and_clears_the_session() {
        let transport = ScriptedTransport::new();
        transport.script(HttpMethod::Get, "/api/todos/todos/", Ok(unauthorized()));
        let (client, transport, store) = harness(transport);
        store.set(SessionKey::AccessToken, "t1").await;

        let hook_count = Arc::new(AtomicUsize::new(0));
        let client = {
            let hook_count = Arc::clone(&hook_count);
            client.with_session_expired_hook(move || {
                hook_count.fetch_add(1, Ordering::SeqCst);
            })
        };

        let error = client
            .request(RequestDescriptor::get("/api/todos/todos/"))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "No refresh token available");
        assert!(error.is_auth());
        assert!(transport.calls_to(REFRESH_ENDPOINT).is_empty());
        assert_eq!(hook_count.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(SessionKey::AccessToken).await, None);
    }

    #[tokio::test]
    async fn refresh_payload_without_access_token_expires_the_session() {
        let transport = ScriptedTransport::new();
        transport.script(HttpMethod::Get, "/api/courses/courses/", Ok(unauthorized()));
        transport.script(
            HttpMethod::Post,
            REFRESH_ENDPOINT,
            Ok(json_response(200, &json!({"ok": true}))),
        );
        let (client, _transport, store) = harness(transport);
        seed_session(&store, "t1", "r1").await;

        let error = client
            .request(RequestDescriptor::get("/api/courses/courses/"))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Token refresh returned no access token");
        assert_eq!(store.get(SessionKey::RefreshToken).await, None);
    }

    #[tokio::test]
    async fn login_stores_tokens_and_the_user_profile() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Post,
            LOGIN_ENDPOINT,
            Ok(json_response(
                200,
                &json!({
                    "access": "a1",
                    "refresh": "r1",
                    "user": {"username": "amina", "student_id": "S-1042"}
                }),
            )),
        );
        let (client, transport, store) = harness(transport);

        let session = client.login("amina", "secret").await.unwrap();

        assert_eq!(session.access_token.as_deref(), Some("a1"));
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
        assert_eq!(
            session.user,
            Some(json!({"username": "amina", "student_id": "S-1042"}))
        );

        let login_calls = transport.calls_to(LOGIN_ENDPOINT);
        assert_eq!(login_calls[0].authorization, None);
        assert_eq!(
            login_calls[0].body,
            RequestBody::Json(json!({"username": "amina", "password": "secret"}))
        );

        let stored = store.session().await;
        assert_eq!(stored, session);
        assert!(client.is_authenticated().await);
    }

    #[tokio::test]
    async fn login_synthesizes_a_user_object_when_the_server_omits_one() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Post,
            LOGIN_ENDPOINT,
            Ok(json_response(200, &json!({"access": "a1", "refresh": "r1"}))),
        );
        let (client, _transport, _store) = harness(transport);

        let session = client.login("amina", "secret").await.unwrap();

        assert_eq!(session.user, Some(json!({"username": "amina"})));
    }

    #[tokio::test]
    async fn rejected_login_surfaces_the_detail_message() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Post,
            LOGIN_ENDPOINT,
            Ok(json_response(400, &json!({"detail": "Invalid credentials"}))),
        );
        let (client, _transport, store) = harness(transport);

        let error = client.login("amina", "wrong").await.unwrap_err();

        assert_eq!(error.to_string(), "Invalid credentials");
        assert_eq!(error.status(), Some(400));
        assert_eq!(store.get(SessionKey::AccessToken).await, None);
    }

    #[tokio::test]
    async fn rejected_login_without_json_body_uses_the_generic_message() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Post,
            LOGIN_ENDPOINT,
            Ok(text_response(502, "<html>bad gateway</html>")),
        );
        let (client, _transport, _store) = harness(transport);

        let error = client.login("amina", "secret").await.unwrap_err();

        assert_eq!(error.to_string(), "Login failed");
        assert_eq!(error.status(), Some(502));
    }

    #[tokio::test]
    async fn login_success_without_tokens_is_a_network_error() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Post,
            LOGIN_ENDPOINT,
            Ok(json_response(200, &json!({"access": "a1"}))),
        );
        let (client, _transport, store) = harness(transport);

        let error = client.login("amina", "secret").await.unwrap_err();

        assert!(matches!(error, ApiError::Network { .. }));
        assert_eq!(store.get(SessionKey::AccessToken).await, None);
    }

    #[tokio::test]
    async fn logout_downgrades_requests_to_anonymous() {
        let transport = ScriptedTransport::new();
        transport.script(
            HttpMethod::Get,
            "/api/courses/notices/",
            Ok(json_response(200, &json!([]))),
        );
        let (client, transport, store) = harness(transport);
        seed_session(&store, "t1", "r1").await;
        store.set(SessionKey::User, r#"{"username":"amina"}"#).await;

        client.logout().await;
        assert!(!client.is_authenticated().await);

        client
            .request(RequestDescriptor::get("/api/courses/notices/"))
            .await
            .unwrap();

        assert_eq!(transport.calls()[0].authorization, None);
        assert_eq!(store.session().await, Session::anonymous());
    }
}
