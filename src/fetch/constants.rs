//! Constants for the fetch module (timeouts, size limits).

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default total fetch timeout, headers and body included (20 seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 20;

/// Default maximum accepted response body (10 MiB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Filename prefix for disk-staged images.
pub(crate) const STAGING_PREFIX: &str = "qrdecode-";
