//! JSON wire types for the remote authority.
//!
//! Response shapes use serde aliases where the authority has drifted
//! between field names across deployments, so older and newer payloads
//! both decode.

use serde::{Deserialize, Serialize};

/// Credential exchange request.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Account creation request.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Token payload inside a successful login response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    /// Authority-assigned user identifier.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Bearer token for authenticated endpoints.
    pub token: String,
}

/// Login response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Authority error flag.
    #[serde(default)]
    pub error: bool,
    /// Human-readable status text.
    #[serde(default)]
    pub message: String,
    /// Present on success.
    pub login_result: Option<LoginResult>,
}

/// One story as the authority serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStory {
    /// Authority-assigned identifier.
    pub id: String,
    /// Author or item display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Photo URL, if any.
    #[serde(default, alias = "photo")]
    pub photo_url: Option<String>,
    /// Creation time as an RFC 3339 string.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Latitude, if the story is geotagged.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude, if the story is geotagged.
    #[serde(default)]
    pub lon: Option<f64>,
}

/// List-read response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryListResponse {
    /// Authority error flag.
    #[serde(default)]
    pub error: bool,
    /// Human-readable status text.
    #[serde(default)]
    pub message: String,
    /// The stories. The authority has served this field as `listStory`,
    /// `stories`, and `list` at different times.
    #[serde(default, alias = "listStory", alias = "stories", alias = "list")]
    pub items: Vec<RemoteStory>,
}

/// Generic status envelope for write endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// Authority error flag.
    #[serde(default)]
    pub error: bool,
    /// Human-readable status text.
    #[serde(default)]
    pub message: String,
}

/// A platform push registration as mirrored to the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSubscriptionInfo {
    /// Push endpoint URL, unique per registration.
    pub endpoint: String,
    /// Encryption keys supplied by the platform.
    pub keys: PushSubscriptionKeys,
}

/// Encryption keys attached to a push registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSubscriptionKeys {
    /// Client public key, base64url.
    pub p256dh: String,
    /// Shared auth secret, base64url.
    pub auth: String,
}

/// Push registration mirror request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    /// Push endpoint URL.
    pub endpoint: String,
    /// Encryption keys supplied by the platform.
    pub keys: PushSubscriptionKeys,
    /// Per-installation identifier, so the authority can distinguish
    /// registrations from the same account on different devices.
    pub device_id: String,
}

/// Push registration removal request, keyed on the endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct UnsubscribeRequest {
    /// Push endpoint URL of the registration to remove.
    pub endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_response_tolerates_field_drift() {
        for field in ["listStory", "stories", "list", "items"] {
            let payload = format!(
                r#"{{"error":false,"message":"ok","{field}":[{{"id":"s1","description":"d"}}]}}"#
            );
            let parsed: StoryListResponse = serde_json::from_str(&payload).unwrap();
            assert_eq!(parsed.items.len(), 1, "field {field}");
            assert_eq!(parsed.items[0].id, "s1");
        }
    }

    #[test]
    fn remote_story_optional_fields_default() {
        let parsed: RemoteStory = serde_json::from_str(r#"{"id":"s2"}"#).unwrap();
        assert!(parsed.name.is_none());
        assert!(parsed.photo_url.is_none());
        assert!(parsed.lat.is_none());
        assert_eq!(parsed.description, "");
    }

    #[test]
    fn login_response_camel_case() {
        let payload = r#"{
            "error": false,
            "message": "success",
            "loginResult": {"userId": "u1", "name": "Dina", "token": "abc"}
        }"#;
        let parsed: LoginResponse = serde_json::from_str(payload).unwrap();
        let result = parsed.login_result.unwrap();
        assert_eq!(result.user_id, "u1");
        assert_eq!(result.token, "abc");
    }

    #[test]
    fn subscribe_request_serializes_camel_case() {
        let request = SubscribeRequest {
            endpoint: "https://push/e1".into(),
            keys: PushSubscriptionKeys {
                p256dh: "pk".into(),
                auth: "a".into(),
            },
            device_id: "device-1".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["deviceId"], "device-1");
        assert_eq!(json["keys"]["p256dh"], "pk");
    }
}
