//! The remote-authority client.

use crate::error::{ApiError, ApiResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::multipart::MultipartForm;
use crate::types::{
    LoginRequest, LoginResponse, LoginResult, PushSubscriptionInfo, RegisterRequest, RemoteStory,
    StatusResponse, StoryListResponse, SubscribeRequest, UnsubscribeRequest,
};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the remote authority, without a trailing slash.
    pub base_url: String,
    /// Page size for list reads.
    pub page_size: u32,
    /// Advisory request timeout for transport implementations.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://story-api.dicoding.dev/v1".to_string(),
            page_size: 30,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Creates a config pointing at the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the list-read page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the advisory request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A photo attachment for story creation.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    /// Original file name.
    pub file_name: String,
    /// MIME type of the data.
    pub content_type: String,
    /// The raw image bytes.
    pub data: Vec<u8>,
}

/// Caller-supplied fields for a story submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryDraft {
    /// Free-text description.
    pub description: String,
    /// Photo attachment, if any.
    pub photo: Option<PhotoUpload>,
    /// Latitude, if geotagged.
    pub lat: Option<f64>,
    /// Longitude, if geotagged.
    pub lon: Option<f64>,
}

impl StoryDraft {
    /// Creates a draft with the given description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Attaches a photo.
    #[must_use]
    pub fn with_photo(
        mut self,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.photo = Some(PhotoUpload {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        });
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }
}

/// Client for the remote authority's story and notification endpoints.
///
/// Holds the bearer token for authenticated requests; operations that
/// need one fail fast with [`ApiError::AuthRequired`] when it is absent.
pub struct StoryClient<C: HttpClient> {
    config: ApiConfig,
    client: C,
    token: RwLock<Option<String>>,
}

impl<C: HttpClient> StoryClient<C> {
    /// Creates a client over the given transport.
    pub fn new(config: ApiConfig, client: C) -> Self {
        Self {
            config,
            client,
            token: RwLock::new(None),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Installs a bearer token for subsequent authenticated requests.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Removes the bearer token.
    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    /// Returns true if a bearer token is set.
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorize(&self, request: HttpRequest) -> ApiResult<HttpRequest> {
        let guard = self.token.read();
        let token = guard.as_deref().ok_or(ApiError::AuthRequired)?;
        Ok(request.with_header("Authorization", format!("Bearer {token}")))
    }

    fn execute(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "request");
        let response = self
            .client
            .execute(request)
            .map_err(ApiError::network)?;

        if response.is_success() {
            return Ok(response);
        }

        // Prefer the authority's own message text when the body has one.
        let message = response
            .json::<StatusResponse>()
            .map(|s| s.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", response.status));
        Err(ApiError::rejected(response.status, message))
    }

    fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> ApiResult<HttpRequest> {
        let bytes = serde_json::to_vec(body)?;
        Ok(HttpRequest::post(self.url(path), bytes)
            .with_header("Content-Type", "application/json"))
    }

    /// Exchanges credentials for a bearer token.
    ///
    /// The token is installed on this client before returning, so the
    /// caller can go straight to authenticated operations.
    pub fn login(&self, email: impl Into<String>, password: impl Into<String>) -> ApiResult<LoginResult> {
        let request = self.post_json(
            "/login",
            &LoginRequest {
                email: email.into(),
                password: password.into(),
            },
        )?;
        let response = self.execute(&request)?;
        let parsed: LoginResponse = response.json()?;
        let result = parsed.login_result.ok_or_else(|| {
            ApiError::rejected(response.status, parsed.message)
        })?;

        self.set_token(&result.token);
        Ok(result)
    }

    /// Creates an account. Returns the authority's status message.
    pub fn register(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> ApiResult<String> {
        let request = self.post_json(
            "/register",
            &RegisterRequest {
                name: name.into(),
                email: email.into(),
                password: password.into(),
            },
        )?;
        let response = self.execute(&request)?;
        let parsed: StatusResponse = response.json()?;
        Ok(parsed.message)
    }

    /// Fetches a page of stories.
    pub fn list_stories(&self) -> ApiResult<Vec<RemoteStory>> {
        let url = format!("{}?size={}", self.url("/stories"), self.config.page_size);
        let request = self.authorize(HttpRequest::get(url))?;
        let response = self.execute(&request)?;
        let parsed: StoryListResponse = response.json()?;
        Ok(parsed.items)
    }

    /// Submits a story as multipart form data.
    ///
    /// Used identically for direct submissions and queued-operation
    /// replay. Returns the authority's status message.
    pub fn create_story(&self, draft: &StoryDraft) -> ApiResult<String> {
        let mut form = MultipartForm::new().text("description", &draft.description);
        if let Some(photo) = &draft.photo {
            form = form.file("photo", &photo.file_name, &photo.content_type, &photo.data);
        }
        if let (Some(lat), Some(lon)) = (draft.lat, draft.lon) {
            form = form.text("lat", &lat.to_string());
            form = form.text("lon", &lon.to_string());
        }
        let (content_type, body) = form.finish();

        let request = self.authorize(
            HttpRequest::post(self.url("/stories"), body)
                .with_header("Content-Type", content_type),
        )?;
        let response = self.execute(&request)?;
        let parsed: StatusResponse = response.json()?;
        Ok(parsed.message)
    }

    /// Mirrors a platform push registration to the authority.
    pub fn subscribe_push(
        &self,
        subscription: &PushSubscriptionInfo,
        device_id: &str,
    ) -> ApiResult<()> {
        let request = self.post_json(
            "/notifications/subscribe",
            &SubscribeRequest {
                endpoint: subscription.endpoint.clone(),
                keys: subscription.keys.clone(),
                device_id: device_id.to_string(),
            },
        )?;
        let request = self.authorize(request)?;
        self.execute(&request)?;
        Ok(())
    }

    /// Removes a push registration mirror, keyed on its endpoint.
    pub fn unsubscribe_push(&self, endpoint: &str) -> ApiResult<()> {
        let request = self.post_json(
            "/notifications/unsubscribe",
            &UnsubscribeRequest {
                endpoint: endpoint.to_string(),
            },
        )?;
        let request = self.authorize(request)?;
        self.execute(&request)?;
        Ok(())
    }
}

impl<C: HttpClient> std::fmt::Debug for StoryClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryClient")
            .field("base_url", &self.config.base_url)
            .field("has_token", &self.has_token())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;
    use crate::types::PushSubscriptionKeys;

    fn client() -> StoryClient<MockHttpClient> {
        StoryClient::new(
            ApiConfig::new("https://api.test/v1").with_page_size(5),
            MockHttpClient::new(),
        )
    }

    #[test]
    fn login_installs_token() {
        let client = client();
        client.mock().push_response(HttpResponse::ok_json(
            r#"{"error":false,"message":"ok","loginResult":{"userId":"u1","name":"Dina","token":"tok-1"}}"#,
        ));

        let result = client.login("dina@example.com", "secret").unwrap();
        assert_eq!(result.token, "tok-1");
        assert!(client.has_token());

        let request = &client.mock().requests()[0];
        assert_eq!(request.url, "https://api.test/v1/login");
        assert_eq!(request.header("content-type"), Some("application/json"));
    }

    #[test]
    fn list_stories_requires_token() {
        let client = client();
        let result = client.list_stories();
        assert!(matches!(result, Err(ApiError::AuthRequired)));
        // Failed fast: nothing hit the transport.
        assert_eq!(client.mock().request_count(), 0);
    }

    #[test]
    fn list_stories_sends_bearer_and_page_size() {
        let client = client();
        client.set_token("tok-1");
        client.mock().push_response(HttpResponse::ok_json(
            r#"{"error":false,"message":"ok","listStory":[{"id":"s1","description":"d"}]}"#,
        ));

        let stories = client.list_stories().unwrap();
        assert_eq!(stories.len(), 1);

        let request = &client.mock().requests()[0];
        assert_eq!(request.url, "https://api.test/v1/stories?size=5");
        assert_eq!(request.header("authorization"), Some("Bearer tok-1"));
    }

    #[test]
    fn create_story_builds_multipart_with_photo_and_location() {
        let client = client();
        client.set_token("tok-1");
        client
            .mock()
            .push_response(HttpResponse::ok_json(r#"{"error":false,"message":"created"}"#));

        let draft = StoryDraft::new("Cokelat Dingin")
            .with_photo("snap.jpg", "image/jpeg", vec![1, 2, 3])
            .with_location(-6.2, 106.8);
        let message = client.create_story(&draft).unwrap();
        assert_eq!(message, "created");

        let request = &client.mock().requests()[0];
        let content_type = request.header("content-type").unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8_lossy(&request.body);
        assert!(body.contains("Cokelat Dingin"));
        assert!(body.contains("filename=\"snap.jpg\""));
        assert!(body.contains("name=\"lat\""));
        assert!(body.contains("-6.2"));
    }

    #[test]
    fn non_success_surfaces_authority_message() {
        let client = client();
        client.set_token("tok-1");
        client.mock().push_response(HttpResponse::new(
            413,
            br#"{"error":true,"message":"photo too large"}"#.to_vec(),
        ));

        let result = client.create_story(&StoryDraft::new("x"));
        match result {
            Err(ApiError::Rejected { status, message }) => {
                assert_eq!(status, 413);
                assert_eq!(message, "photo too large");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn transport_failure_is_retryable_network_error() {
        let client = client();
        client.set_token("tok-1");
        client.mock().push_failure("connection refused");

        let err = client.list_stories().unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn push_mirror_endpoints() {
        let client = client();
        client.set_token("tok-1");
        client
            .mock()
            .push_response(HttpResponse::ok_json(r#"{"error":false,"message":"ok"}"#));
        client
            .mock()
            .push_response(HttpResponse::ok_json(r#"{"error":false,"message":"ok"}"#));

        let subscription = PushSubscriptionInfo {
            endpoint: "https://push/e1".into(),
            keys: PushSubscriptionKeys {
                p256dh: "pk".into(),
                auth: "a".into(),
            },
        };
        client.subscribe_push(&subscription, "device-1").unwrap();
        client.unsubscribe_push("https://push/e1").unwrap();

        let requests = client.mock().requests();
        assert_eq!(requests[0].url, "https://api.test/v1/notifications/subscribe");
        assert_eq!(
            requests[1].url,
            "https://api.test/v1/notifications/unsubscribe"
        );
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["deviceId"], "device-1");
    }

    impl StoryClient<MockHttpClient> {
        fn mock(&self) -> &MockHttpClient {
            &self.client
        }
    }
}
