//! HTTP client for the StoryHub remote authority.
//!
//! The actual transport is abstracted behind the [`HttpClient`] trait so
//! callers can plug in any HTTP library (or a mock). [`StoryClient`]
//! layers the authority's JSON/multipart endpoints and bearer-token
//! handling on top of that seam.
//!
//! # Example
//!
//! ```
//! use storyhub_api::{ApiConfig, MockHttpClient, StoryClient};
//!
//! let client = StoryClient::new(ApiConfig::default(), MockHttpClient::new());
//! assert!(!client.has_token());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod http;
mod multipart;
mod types;

pub use client::{ApiConfig, PhotoUpload, StoryClient, StoryDraft};
pub use error::{ApiError, ApiResult};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, MockHttpClient};
pub use multipart::MultipartForm;
pub use types::{
    LoginRequest, LoginResponse, LoginResult, PushSubscriptionInfo, PushSubscriptionKeys,
    RegisterRequest, RemoteStory, StatusResponse, StoryListResponse, SubscribeRequest,
    UnsubscribeRequest,
};
