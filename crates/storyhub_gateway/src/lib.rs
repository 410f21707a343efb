//! Request interception and response caching.
//!
//! [`RequestGateway`] sits between the application and the network,
//! choosing per request whether to serve live, from cache, or to
//! synthesize a degraded response. Cached responses live in
//! generation-tagged namespaces so a new deployment can atomically
//! replace the app shell and purge its predecessors.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod error;
mod gateway;

pub use cache::{CacheKey, CacheStore, CachedResponse};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{GatewayConfig, RequestClass, RequestGateway};
