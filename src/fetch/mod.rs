//! Image fetcher: retrieves raw image bytes from an untrusted remote URL.
//!
//! # Features
//!
//! - Strict URL validation (absolute http/https only)
//! - Bounded fetches (connect timeout, total timeout, maximum body size)
//! - `200 OK` is the only success status
//! - Streaming into memory or a uniquely named, self-deleting temporary file
//!
//! # Example
//!
//! ```no_run
//! use qrdecode_core::fetch::{FetchConfig, ImageFetcher, StagingStrategy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig {
//!     staging: StagingStrategy::os_temp_dir(),
//!     ..FetchConfig::default()
//! };
//! let fetcher = ImageFetcher::new(config)?;
//! let image = fetcher.fetch("https://example.com/qr.png").await?;
//! println!("staged at {:?}", image.staged_path());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod staging;

pub use client::{FetchConfig, ImageFetcher, validate_image_url};
pub use constants::{CONNECT_TIMEOUT_SECS, FETCH_TIMEOUT_SECS, MAX_IMAGE_BYTES};
pub use error::FetchError;
pub use staging::{FetchedImage, StagingStrategy};

pub(crate) use staging::Payload;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, FetchError>` explicitly in function signatures.
