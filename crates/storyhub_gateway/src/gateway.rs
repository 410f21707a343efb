//! The request gateway: per-request strategy selection.

use crate::cache::{CacheKey, CacheStore, CachedResponse};
use crate::error::{GatewayError, GatewayResult};
use serde_json::json;
use std::sync::Arc;
use storyhub_api::{HttpClient, HttpRequest, HttpResponse, Method};
use tracing::{debug, info, warn};

/// How the gateway will treat a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// A GET against the dynamic list endpoint: network-first.
    DynamicRead,
    /// Any other GET: cache-first.
    StaticAsset,
    /// Any non-GET: pass straight to the network.
    PassThrough,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Generation tag, typically the build version. Namespaces created
    /// by this gateway carry it; activation purges every other tag.
    pub generation: String,
    /// URL path prefix identifying the dynamic list endpoint.
    pub api_prefix: String,
    /// Shell asset URLs precached during activation.
    pub shell_manifest: Vec<String>,
    /// Message placed in the synthesized offline fallback body.
    pub offline_message: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            generation: "v1".to_string(),
            api_prefix: "/v1/stories".to_string(),
            shell_manifest: Vec::new(),
            offline_message: "You are offline".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Creates a config with the given generation tag.
    #[must_use]
    pub fn new(generation: impl Into<String>) -> Self {
        Self {
            generation: generation.into(),
            ..Self::default()
        }
    }

    /// Sets the dynamic endpoint path prefix.
    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Sets the shell asset manifest.
    #[must_use]
    pub fn with_shell_manifest(mut self, manifest: Vec<String>) -> Self {
        self.shell_manifest = manifest;
        self
    }

    /// Sets the offline fallback message.
    #[must_use]
    pub fn with_offline_message(mut self, message: impl Into<String>) -> Self {
        self.offline_message = message.into();
        self
    }
}

/// Chooses, per request, between network, cache, and synthesized
/// degraded responses.
pub struct RequestGateway<C: HttpClient> {
    client: C,
    cache: Arc<CacheStore>,
    config: GatewayConfig,
    shell_namespace: String,
    api_namespace: String,
}

impl<C: HttpClient> RequestGateway<C> {
    /// Creates a gateway with its own cache store.
    pub fn new(config: GatewayConfig, client: C) -> Self {
        Self::with_cache(config, client, Arc::new(CacheStore::new()))
    }

    /// Creates a gateway over a shared cache store, so successive
    /// generations can see and purge their predecessors' namespaces.
    pub fn with_cache(config: GatewayConfig, client: C, cache: Arc<CacheStore>) -> Self {
        let shell_namespace = format!("shell-{}", config.generation);
        let api_namespace = format!("api-{}", config.generation);
        cache.open(&shell_namespace, &config.generation);
        cache.open(&api_namespace, &config.generation);
        Self {
            client,
            cache,
            config,
            shell_namespace,
            api_namespace,
        }
    }

    /// Returns the cache store.
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Classifies a request.
    pub fn classify(&self, request: &HttpRequest) -> RequestClass {
        if request.method != Method::Get {
            return RequestClass::PassThrough;
        }
        let path = request
            .url
            .split_once("://")
            .and_then(|(_, rest)| rest.find('/').map(|i| &rest[i..]))
            .unwrap_or(&request.url);
        if path.starts_with(&self.config.api_prefix) {
            RequestClass::DynamicRead
        } else {
            RequestClass::StaticAsset
        }
    }

    /// Handles a request with the strategy its class calls for.
    ///
    /// # Errors
    ///
    /// `Fetch` only on the cache-first and pass-through paths when the
    /// network fails and no cached copy exists; the network-first path
    /// always produces a response.
    pub fn handle(&self, request: &HttpRequest) -> GatewayResult<HttpResponse> {
        match self.classify(request) {
            RequestClass::DynamicRead => Ok(self.network_first(request)),
            RequestClass::StaticAsset => self.cache_first(request),
            RequestClass::PassThrough => self
                .client
                .execute(request)
                .map_err(GatewayError::fetch),
        }
    }

    fn network_first(&self, request: &HttpRequest) -> HttpResponse {
        let key = CacheKey::from(request);
        match self.client.execute(request) {
            Ok(response) => {
                // Fire-and-forget capture of the live copy.
                self.cache
                    .put(&self.api_namespace, key, CachedResponse::from(&response));
                response
            }
            Err(err) => {
                debug!(url = %request.url, error = %err, "network-first falling back");
                match self.cache.get(&self.api_namespace, &key) {
                    Some(cached) => cached.into(),
                    None => self.offline_fallback(),
                }
            }
        }
    }

    fn cache_first(&self, request: &HttpRequest) -> GatewayResult<HttpResponse> {
        let key = CacheKey::from(request);
        if let Some(cached) = self.cache.get(&self.shell_namespace, &key) {
            return Ok(cached.into());
        }
        let response = self
            .client
            .execute(request)
            .map_err(GatewayError::fetch)?;
        self.cache
            .put(&self.shell_namespace, key, CachedResponse::from(&response));
        Ok(response)
    }

    /// Synthesizes the degraded dynamic-read response: success-coded
    /// with an empty item list, so callers treat it as a valid empty
    /// result rather than an exception.
    fn offline_fallback(&self) -> HttpResponse {
        let body = json!({
            "error": self.config.offline_message,
            "items": [],
        });
        HttpResponse::ok_json(body.to_string())
    }

    /// Precaches the shell manifest and retires older generations.
    ///
    /// Every asset is fetched first; the batch is installed only when
    /// all of them resolved, so a half-precached shell cannot exist.
    /// Afterwards, namespaces from other generations are purged.
    ///
    /// # Errors
    ///
    /// `Activation` naming the first asset that failed; nothing is
    /// installed in that case.
    pub fn activate(&self) -> GatewayResult<()> {
        let mut batch = Vec::with_capacity(self.config.shell_manifest.len());
        for asset in &self.config.shell_manifest {
            let request = HttpRequest::get(asset.clone());
            let response = match self.client.execute(&request) {
                Ok(response) if response.is_success() => response,
                Ok(response) => {
                    warn!(asset = %asset, status = response.status, "activation fetch rejected");
                    return Err(GatewayError::activation(
                        asset.clone(),
                        format!("HTTP {}", response.status),
                    ));
                }
                Err(err) => {
                    warn!(asset = %asset, error = %err, "activation fetch failed");
                    return Err(GatewayError::activation(asset.clone(), err));
                }
            };
            batch.push((CacheKey::from(&request), CachedResponse::from(&response)));
        }

        self.cache.put_batch(&self.shell_namespace, batch);
        let purged = self.cache.purge_stale(&self.config.generation);
        info!(
            generation = %self.config.generation,
            assets = self.config.shell_manifest.len(),
            purged,
            "activated"
        );
        Ok(())
    }
}

impl<C: HttpClient> std::fmt::Debug for RequestGateway<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("generation", &self.config.generation)
            .field("api_prefix", &self.config.api_prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyhub_api::MockHttpClient;

    fn gateway(client: MockHttpClient) -> RequestGateway<MockHttpClient> {
        RequestGateway::new(
            GatewayConfig::new("v1").with_offline_message("offline"),
            client,
        )
    }

    fn stories_request() -> HttpRequest {
        HttpRequest::get("https://api.test/v1/stories?size=30")
    }

    #[test]
    fn classification() {
        let gateway = gateway(MockHttpClient::new());

        assert_eq!(
            gateway.classify(&stories_request()),
            RequestClass::DynamicRead
        );
        assert_eq!(
            gateway.classify(&HttpRequest::get("https://app.test/styles/app.css")),
            RequestClass::StaticAsset
        );
        assert_eq!(
            gateway.classify(&HttpRequest::post("https://api.test/v1/stories", Vec::new())),
            RequestClass::PassThrough
        );
    }

    #[test]
    fn network_first_returns_live_and_captures() {
        let client = MockHttpClient::new();
        client.push_response(HttpResponse::ok_json(r#"{"items":[1]}"#));
        let gateway = gateway(client);

        let live = gateway.handle(&stories_request()).unwrap();
        assert_eq!(live.body, br#"{"items":[1]}"#);

        // The captured copy now serves network failures.
        let fallback = gateway.handle(&stories_request()).unwrap();
        assert_eq!(fallback.body, br#"{"items":[1]}"#);
    }

    #[test]
    fn network_first_synthesizes_fallback_without_capture() {
        let gateway = gateway(MockHttpClient::new());

        let response = gateway.handle(&stories_request()).unwrap();
        assert!(response.is_success());
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["error"], "offline");
        assert_eq!(body["items"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn newest_capture_wins() {
        let client = MockHttpClient::new();
        client.push_response(HttpResponse::ok_json(r#"{"items":[1]}"#));
        client.push_response(HttpResponse::ok_json(r#"{"items":[1,2]}"#));
        let gateway = gateway(client);

        gateway.handle(&stories_request()).unwrap();
        gateway.handle(&stories_request()).unwrap();

        let fallback = gateway.handle(&stories_request()).unwrap();
        assert_eq!(fallback.body, br#"{"items":[1,2]}"#);
    }

    #[test]
    fn static_assets_are_cache_first() {
        let client = MockHttpClient::new();
        client.push_response(HttpResponse::new(200, b"body{}".to_vec()));
        let gateway = gateway(client);
        let request = HttpRequest::get("https://app.test/app.css");

        assert_eq!(gateway.handle(&request).unwrap().body, b"body{}");
        // Served from cache: no second network hit is scripted.
        assert_eq!(gateway.handle(&request).unwrap().body, b"body{}");
    }

    #[test]
    fn static_asset_miss_with_network_failure_propagates() {
        let gateway = gateway(MockHttpClient::new());
        let request = HttpRequest::get("https://app.test/missing.css");

        let result = gateway.handle(&request);
        assert!(matches!(result, Err(GatewayError::Fetch { .. })));
    }

    #[test]
    fn pass_through_never_caches() {
        let client = MockHttpClient::new();
        client.push_response(HttpResponse::ok_json(r#"{"message":"created"}"#));
        let gateway = gateway(client);
        let request = HttpRequest::post("https://api.test/v1/stories", b"...".to_vec());

        assert!(gateway.handle(&request).is_ok());
        assert!(gateway.cache().is_empty("api-v1"));
        assert!(gateway.cache().is_empty("shell-v1"));
    }

    #[test]
    fn activation_is_all_or_nothing() {
        let client = MockHttpClient::new();
        client.push_response(HttpResponse::new(200, b"<html>".to_vec()));
        client.push_response(HttpResponse::new(404, Vec::new()));
        let gateway = RequestGateway::new(
            GatewayConfig::new("v1").with_shell_manifest(vec![
                "https://app.test/index.html".to_string(),
                "https://app.test/app.css".to_string(),
            ]),
            client,
        );

        let result = gateway.activate();
        match result {
            Err(GatewayError::Activation { asset, reason }) => {
                assert_eq!(asset, "https://app.test/app.css");
                assert_eq!(reason, "HTTP 404");
            }
            other => panic!("unexpected: {other:?}"),
        }
        // Nothing installed, including the asset that did resolve.
        assert!(gateway.cache().is_empty("shell-v1"));
    }

    #[test]
    fn activation_precaches_and_purges_old_generations() {
        let store = Arc::new(CacheStore::new());

        let old_client = MockHttpClient::new();
        old_client.push_response(HttpResponse::new(200, b"old".to_vec()));
        let old = RequestGateway::with_cache(
            GatewayConfig::new("v1")
                .with_shell_manifest(vec!["https://app.test/index.html".to_string()]),
            old_client,
            Arc::clone(&store),
        );
        old.activate().unwrap();
        assert_eq!(store.len("shell-v1"), 1);

        let new_client = MockHttpClient::new();
        new_client.push_response(HttpResponse::new(200, b"new".to_vec()));
        let new = RequestGateway::with_cache(
            GatewayConfig::new("v2")
                .with_shell_manifest(vec!["https://app.test/index.html".to_string()]),
            new_client,
            Arc::clone(&store),
        );
        new.activate().unwrap();

        // Old generation gone, fresh precache survives its own purge.
        assert_eq!(store.len("shell-v1"), 0);
        assert_eq!(store.len("shell-v2"), 1);
        let mut names = store.namespace_names();
        names.sort();
        assert_eq!(names, vec!["api-v2".to_string(), "shell-v2".to_string()]);

        let cached = new
            .handle(&HttpRequest::get("https://app.test/index.html"))
            .unwrap();
        assert_eq!(cached.body, b"new");
    }
}
