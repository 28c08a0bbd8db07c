//! Outbound delivery: HTTP transport, token refresh, and the publish
//! client that ties them together.

pub mod client;
pub mod refresh;
pub mod transport;

pub use client::{PublishClient, PublishError};
pub use refresh::{DeviceIdentity, HttpTokenRefresher, RefreshError, TokenRefresher};
pub use transport::{build_http_client, HttpTransport, PublishTransport, TransportError};
