//! Pipeline orchestrator: fetch → materialize → decode.
//!
//! [`Pipeline::run`] is the only entry point the HTTP layer uses. It
//! short-circuits on the first failing stage, reports every failure as a
//! [`PipelineError`] and keeps nothing between runs: each run owns its
//! [`FetchedImage`](crate::fetch::FetchedImage) and pixel grid, and any staged
//! file is removed when the run's image drops, on success or failure.
//!
//! # Example
//!
//! ```no_run
//! use qrdecode_core::pipeline::{FetchRequest, Pipeline, PipelineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let decoded = pipeline.run(&FetchRequest::new("https://example.com/qr.png")).await?;
//! println!("{}", decoded.text);
//! # Ok(())
//! # }
//! ```

mod error;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument};

use crate::decode::{
    BarcodeDecoder, BarcodeReader, CodecConfig, DecodeHints, ImageCodec, ImageCrateCodec,
    ImageMaterializer, RqrrReader,
};
use crate::fetch::{FetchConfig, ImageFetcher};

pub use error::{ErrorKind, PipelineError, Stage};

/// Default overall deadline for one run (30 seconds).
pub const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_secs(30);

/// Input of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub source_url: String,
}

impl FetchRequest {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
        }
    }
}

/// Successful result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Payload exactly as embedded in the symbol.
    pub text: String,
}

/// Everything needed to assemble a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub codec: CodecConfig,
    pub hints: DecodeHints,
    /// Upper bound on a whole run, fetch and decode included.
    pub deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            codec: CodecConfig::default(),
            hints: DecodeHints::default(),
            deadline: DEFAULT_REQUEST_DEADLINE,
        }
    }
}

/// Fetch-and-decode pipeline shared by all requests.
#[derive(Debug, Clone)]
pub struct Pipeline {
    fetcher: ImageFetcher,
    materializer: ImageMaterializer,
    decoder: BarcodeDecoder,
    deadline: Duration,
}

impl Pipeline {
    /// Builds a pipeline with the `image` codec and the `rqrr` reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let fetcher = ImageFetcher::new(config.fetch)?;
        Ok(Self::with_components(
            fetcher,
            Arc::new(ImageCrateCodec::new(config.codec)),
            Arc::new(RqrrReader),
            config.hints,
            config.deadline,
        ))
    }

    /// Builds a pipeline from explicit capabilities.
    #[must_use]
    pub fn with_components(
        fetcher: ImageFetcher,
        codec: Arc<dyn ImageCodec>,
        reader: Arc<dyn BarcodeReader>,
        hints: DecodeHints,
        deadline: Duration,
    ) -> Self {
        Self {
            fetcher,
            materializer: ImageMaterializer::new(codec),
            decoder: BarcodeDecoder::new(reader, hints),
            deadline,
        }
    }

    /// Fetches the image at `request.source_url` and decodes its QR code.
    ///
    /// Materialization and decoding run on the blocking pool. The whole run
    /// is bounded by the configured deadline; if the caller drops the future,
    /// the in-flight fetch is cancelled with it.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; see [`PipelineError::kind`] for the
    /// caller-facing classification.
    #[instrument(skip(self, request), fields(url = %request.source_url))]
    pub async fn run(&self, request: &FetchRequest) -> Result<Decoded, PipelineError> {
        if request.source_url.trim().is_empty() {
            return Err(PipelineError::invalid_request("img_url is required"));
        }

        let started = Instant::now();
        let deadline = started + self.deadline;

        let image = timeout_at(deadline, self.fetcher.fetch(&request.source_url))
            .await
            .map_err(|_| PipelineError::DeadlineExceeded {
                stage: Stage::Fetch,
                deadline: self.deadline,
            })??;
        debug!(
            bytes = image.len(),
            content_type = image.content_type().unwrap_or("-"),
            "fetched; decoding"
        );

        let materializer = self.materializer.clone();
        let decoder = self.decoder.clone();
        let task = tokio::task::spawn_blocking(move || {
            let grid = materializer.materialize(&image)?;
            drop(image);
            decoder.decode(&grid)
        });

        let text = match timeout_at(deadline, task).await {
            Err(_) => {
                return Err(PipelineError::DeadlineExceeded {
                    stage: Stage::Decode,
                    deadline: self.deadline,
                });
            }
            Ok(Err(join_error)) => {
                return Err(PipelineError::internal(format!(
                    "decode task failed: {join_error}"
                )));
            }
            Ok(Ok(result)) => result?,
        };

        info!(
            chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis(),
            "QR code decoded"
        );
        Ok(Decoded { text })
    }
}
