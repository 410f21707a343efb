//! Reconciliation between the local store and the remote authority.
//!
//! [`SyncEngine`] replays the durable mutation queue once connectivity
//! returns; [`ConnectivitySignal`] delivers the offline-to-online edge
//! that triggers it; [`PushManager`] keeps a platform push registration
//! and its remote mirror consistent.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connectivity;
mod engine;
mod error;
mod push;

pub use connectivity::ConnectivitySignal;
pub use engine::{DrainReport, ItemOutcome, ItemState, SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use push::{
    MockPlatform, Permission, PlatformError, PushConfig, PushManager, PushPlatform, PushState,
};
