//! Push subscription management.
//!
//! The platform push transport sits behind the [`PushPlatform`] trait;
//! [`PushManager`] keeps the platform registration and its mirror on the
//! remote authority consistent, with the local state authoritative for
//! the UI.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::RwLock;
use std::sync::Arc;
use storyhub_api::{HttpClient, PushSubscriptionInfo, StoryClient};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Subscription state of this installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// The platform has no push transport. Terminal for the session;
    /// every toggle is a no-op returning false.
    Unsupported,
    /// Push is available and no registration exists.
    Unsubscribed,
    /// An active registration exists.
    Subscribed,
}

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    /// The user granted notifications.
    Granted,
    /// The user denied notifications.
    Denied,
    /// The user has not decided yet.
    #[default]
    Prompt,
}

/// Failures from the platform push transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The user denied notification permission.
    #[error("notification permission denied")]
    PermissionDenied,
    /// Any other platform failure.
    #[error("{0}")]
    Other(String),
}

/// The platform's push transport.
pub trait PushPlatform: Send + Sync {
    /// Returns true if the platform offers a push transport at all.
    fn is_supported(&self) -> bool;

    /// Returns the current notification permission.
    fn permission(&self) -> Permission;

    /// Returns the existing registration, if one is active.
    fn current_subscription(&self) -> Option<PushSubscriptionInfo>;

    /// Creates a registration using the decoded application server key.
    fn subscribe(&self, server_key: &[u8]) -> Result<PushSubscriptionInfo, PlatformError>;

    /// Cancels the registration with the given endpoint.
    fn unsubscribe(&self, endpoint: &str) -> Result<(), PlatformError>;
}

/// Push manager configuration.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Server-provided VAPID public key, base64url without padding.
    pub public_key: String,
    /// Per-installation identifier submitted with the remote mirror.
    pub device_id: Uuid,
}

impl PushConfig {
    /// Creates a config with the given public key and a fresh device id.
    #[must_use]
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            device_id: Uuid::new_v4(),
        }
    }

    /// Sets the device identifier.
    #[must_use]
    pub fn with_device_id(mut self, device_id: Uuid) -> Self {
        self.device_id = device_id;
        self
    }

    fn decoded_key(&self) -> Result<Vec<u8>, String> {
        URL_SAFE_NO_PAD
            .decode(self.public_key.trim_end_matches('='))
            .map_err(|e| format!("invalid application server key: {e}"))
    }
}

/// Keeps the platform push registration and its remote mirror consistent.
///
/// Subscribe and unsubscribe never panic into the UI; they return a bool
/// and leave a user-facing explanation in [`PushManager::status_message`].
pub struct PushManager<C: HttpClient, P: PushPlatform> {
    platform: P,
    client: Arc<StoryClient<C>>,
    config: PushConfig,
    state: RwLock<PushState>,
    message: RwLock<Option<String>>,
}

impl<C: HttpClient, P: PushPlatform> PushManager<C, P> {
    /// Creates a manager. Call [`PushManager::initialize`] before use.
    pub fn new(platform: P, client: Arc<StoryClient<C>>, config: PushConfig) -> Self {
        Self {
            platform,
            client,
            config,
            state: RwLock::new(PushState::Unsupported),
            message: RwLock::new(None),
        }
    }

    /// Probes the platform and adopts its current registration state.
    pub fn initialize(&self) -> PushState {
        let state = if !self.platform.is_supported() {
            PushState::Unsupported
        } else if self.platform.current_subscription().is_some() {
            PushState::Subscribed
        } else {
            PushState::Unsubscribed
        };
        debug!(?state, "push manager initialized");
        *self.state.write() = state;
        state
    }

    /// Returns the current state.
    pub fn state(&self) -> PushState {
        *self.state.read()
    }

    /// Returns the last user-facing status text.
    pub fn status_message(&self) -> Option<String> {
        self.message.read().clone()
    }

    fn set_message(&self, message: impl Into<String>) {
        *self.message.write() = Some(message.into());
    }

    /// Creates a platform registration and mirrors it to the authority.
    ///
    /// Returns true on success or when already subscribed. On any
    /// failure the state stays `Unsubscribed` and the status message
    /// distinguishes permission denial from other errors.
    pub fn subscribe(&self) -> bool {
        match self.state() {
            PushState::Unsupported => return false,
            PushState::Subscribed => return true,
            PushState::Unsubscribed => {}
        }

        // Probe before requesting a registration: a previously denied
        // permission never reaches the platform prompt.
        if self.platform.permission() == Permission::Denied {
            self.set_message("Notification permission was denied");
            return false;
        }

        let server_key = match self.config.decoded_key() {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "subscribe aborted");
                self.set_message("Failed to enable notifications");
                return false;
            }
        };

        let subscription = match self.platform.subscribe(&server_key) {
            Ok(subscription) => subscription,
            Err(PlatformError::PermissionDenied) => {
                self.set_message("Notification permission was denied");
                return false;
            }
            Err(PlatformError::Other(err)) => {
                warn!(error = %err, "platform subscribe failed");
                self.set_message("Failed to enable notifications");
                return false;
            }
        };

        let device_id = self.config.device_id.to_string();
        if let Err(err) = self.client.subscribe_push(&subscription, &device_id) {
            warn!(error = %err, "mirror registration failed, rolling back");
            // Without the mirror the authority would never target this
            // registration; cancel it rather than keep a half-open channel.
            if let Err(platform_err) = self.platform.unsubscribe(&subscription.endpoint) {
                warn!(error = %platform_err, "rollback unsubscribe failed");
            }
            self.set_message("Failed to enable notifications");
            return false;
        }

        info!(endpoint = %subscription.endpoint, "push subscribed");
        *self.state.write() = PushState::Subscribed;
        self.set_message("Notifications enabled");
        true
    }

    /// Cancels the platform registration and informs the authority.
    ///
    /// The remote mirror removal is best-effort: its failure is logged
    /// but does not resurrect the local registration.
    pub fn unsubscribe(&self) -> bool {
        match self.state() {
            PushState::Unsupported => return false,
            PushState::Unsubscribed => return true,
            PushState::Subscribed => {}
        }

        let Some(subscription) = self.platform.current_subscription() else {
            // Platform already dropped it; adopt that.
            *self.state.write() = PushState::Unsubscribed;
            return true;
        };

        if let Err(err) = self.platform.unsubscribe(&subscription.endpoint) {
            warn!(error = %err, "platform unsubscribe failed");
            self.set_message("Failed to disable notifications");
            return false;
        }

        *self.state.write() = PushState::Unsubscribed;
        if let Err(err) = self.client.unsubscribe_push(&subscription.endpoint) {
            warn!(error = %err, "mirror removal failed, local state kept");
        }

        info!(endpoint = %subscription.endpoint, "push unsubscribed");
        self.set_message("Notifications disabled");
        true
    }

    /// Dispatches to subscribe or unsubscribe based on current state.
    pub fn toggle(&self) -> bool {
        match self.state() {
            PushState::Unsupported => false,
            PushState::Unsubscribed => self.subscribe(),
            PushState::Subscribed => self.unsubscribe(),
        }
    }
}

impl<C: HttpClient, P: PushPlatform> std::fmt::Debug for PushManager<C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushManager")
            .field("state", &self.state())
            .field("device_id", &self.config.device_id)
            .finish_non_exhaustive()
    }
}

/// A scripted platform for tests.
#[derive(Debug, Default)]
pub struct MockPlatform {
    supported: bool,
    permission: RwLock<Permission>,
    subscription: RwLock<Option<PushSubscriptionInfo>>,
    fail_subscribe: RwLock<Option<PlatformError>>,
    fail_unsubscribe: RwLock<bool>,
}

impl MockPlatform {
    /// Creates a supported platform with permission not yet decided.
    #[must_use]
    pub fn supported() -> Self {
        Self {
            supported: true,
            ..Self::default()
        }
    }

    /// Creates a platform with no push transport.
    #[must_use]
    pub fn unsupported() -> Self {
        Self::default()
    }

    /// Sets the reported permission. `Denied` also makes subscribe fail
    /// with [`PlatformError::PermissionDenied`].
    pub fn set_permission(&self, permission: Permission) {
        *self.permission.write() = permission;
    }

    /// Seeds an existing registration.
    pub fn set_subscription(&self, subscription: PushSubscriptionInfo) {
        *self.subscription.write() = Some(subscription);
    }

    /// Makes the next subscribe call fail with the given error.
    pub fn fail_next_subscribe(&self, error: PlatformError) {
        *self.fail_subscribe.write() = Some(error);
    }

    /// Makes unsubscribe calls fail.
    pub fn fail_unsubscribe(&self, fail: bool) {
        *self.fail_unsubscribe.write() = fail;
    }

    /// Returns the registration the platform currently holds.
    #[must_use]
    pub fn subscription(&self) -> Option<PushSubscriptionInfo> {
        self.subscription.read().clone()
    }
}

impl PushPlatform for MockPlatform {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> Permission {
        *self.permission.read()
    }

    fn current_subscription(&self) -> Option<PushSubscriptionInfo> {
        self.subscription.read().clone()
    }

    fn subscribe(&self, _server_key: &[u8]) -> Result<PushSubscriptionInfo, PlatformError> {
        if let Some(error) = self.fail_subscribe.write().take() {
            return Err(error);
        }
        if *self.permission.read() == Permission::Denied {
            return Err(PlatformError::PermissionDenied);
        }
        let subscription = PushSubscriptionInfo {
            endpoint: format!("https://push.test/{}", Uuid::new_v4()),
            keys: storyhub_api::PushSubscriptionKeys {
                p256dh: "mock-p256dh".into(),
                auth: "mock-auth".into(),
            },
        };
        *self.subscription.write() = Some(subscription.clone());
        Ok(subscription)
    }

    fn unsubscribe(&self, _endpoint: &str) -> Result<(), PlatformError> {
        if *self.fail_unsubscribe.read() {
            return Err(PlatformError::Other("platform refused".into()));
        }
        *self.subscription.write() = None;
        Ok(())
    }
}
