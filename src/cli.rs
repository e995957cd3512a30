//! CLI argument definitions using clap derive macros.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use image::ImageFormat;

use qrdecode_core::decode::{CodecConfig, DEFAULT_MAX_DIMENSION, DecodeHints, parse_format};
use qrdecode_core::fetch::{
    CONNECT_TIMEOUT_SECS, FETCH_TIMEOUT_SECS, FetchConfig, MAX_IMAGE_BYTES, StagingStrategy,
};
use qrdecode_core::pipeline::PipelineConfig;

/// Where fetched bytes wait until they are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StagingMode {
    /// Keep the body in memory
    Memory,
    /// Stream the body into a unique temporary file
    Disk,
}

/// Fetch a remote image and decode the QR code it contains.
///
/// Serves `POST /decode` with a JSON body `{"img_url": "..."}` and answers
/// `{"qr_string": "..."}` or `{"err": "...", "kind": "..."}`.
#[derive(Parser, Debug)]
#[command(name = "qrdecode")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Address to bind
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Connect timeout for image fetches in seconds (1-60)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=60))]
    pub connect_timeout: u64,

    /// Total timeout for one image fetch in seconds (1-300)
    #[arg(long, default_value_t = FETCH_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=300))]
    pub fetch_timeout: u64,

    /// Overall deadline for one decode request in seconds (1-600)
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub request_deadline: u64,

    /// Largest accepted image body in bytes
    #[arg(long, default_value_t = MAX_IMAGE_BYTES, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_bytes: u64,

    /// Largest accepted image width or height in pixels
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, value_parser = clap::value_parser!(u32).range(21..))]
    pub max_dimension: u32,

    /// Accepted image formats (png, jpeg, gif, webp, bmp)
    #[arg(long, value_delimiter = ',', default_value = "png,jpeg", value_parser = parse_format_arg)]
    pub formats: Vec<ImageFormat>,

    /// Where fetched images are staged
    #[arg(long, value_enum, default_value_t = StagingMode::Memory)]
    pub staging: StagingMode,

    /// Directory for disk staging (defaults to the OS temp dir)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Stop after the first binarization attempt instead of searching exhaustively
    #[arg(long)]
    pub no_try_harder: bool,

    /// Seconds in-flight requests get to finish after a shutdown signal
    #[arg(long, default_value_t = 10)]
    pub shutdown_grace: u64,
}

fn parse_format_arg(value: &str) -> Result<ImageFormat, String> {
    parse_format(value).ok_or_else(|| {
        format!("unsupported image format '{value}' (expected png, jpeg, gif, webp or bmp)")
    })
}

impl Args {
    /// Log level implied by -q/-v when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Pipeline configuration described by these arguments.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        let staging = match (self.staging, &self.staging_dir) {
            (StagingMode::Memory, _) => StagingStrategy::Memory,
            (StagingMode::Disk, Some(dir)) => StagingStrategy::disk(dir),
            (StagingMode::Disk, None) => StagingStrategy::os_temp_dir(),
        };

        let mut formats: Vec<ImageFormat> = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }

        PipelineConfig {
            fetch: FetchConfig {
                connect_timeout: Duration::from_secs(self.connect_timeout),
                timeout: Duration::from_secs(self.fetch_timeout),
                max_bytes: self.max_bytes,
                staging,
            },
            codec: CodecConfig {
                formats,
                max_dimension: self.max_dimension,
            },
            hints: DecodeHints {
                try_harder: !self.no_try_harder,
            },
            deadline: Duration::from_secs(self.request_deadline),
        }
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["qrdecode"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.fetch_timeout, 20);
        assert_eq!(args.staging, StagingMode::Memory);
        assert_eq!(args.formats, vec![ImageFormat::Png, ImageFormat::Jpeg]);
        assert!(!args.no_try_harder);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["qrdecode", "-v"]).unwrap();
        assert_eq!(args.default_log_level(), "debug");

        let args = Args::try_parse_from(["qrdecode", "-vv"]).unwrap();
        assert_eq!(args.default_log_level(), "trace");

        let args = Args::try_parse_from(["qrdecode", "-q"]).unwrap();
        assert_eq!(args.default_log_level(), "error");
    }

    #[test]
    fn test_cli_port_flag() {
        let args = Args::try_parse_from(["qrdecode", "--port", "9000"]).unwrap();
        assert_eq!(args.port, 9000);

        let args = Args::try_parse_from(["qrdecode", "-p", "9001"]).unwrap();
        assert_eq!(args.port, 9001);
    }

    #[test]
    fn test_cli_port_out_of_range_rejected() {
        let result = Args::try_parse_from(["qrdecode", "--port", "70000"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_fetch_timeout_range() {
        assert!(Args::try_parse_from(["qrdecode", "--fetch-timeout", "0"]).is_err());
        assert!(Args::try_parse_from(["qrdecode", "--fetch-timeout", "301"]).is_err());
        let args = Args::try_parse_from(["qrdecode", "--fetch-timeout", "300"]).unwrap();
        assert_eq!(args.fetch_timeout, 300);
    }

    #[test]
    fn test_cli_formats_list() {
        let args = Args::try_parse_from(["qrdecode", "--formats", "png,jpg,webp"]).unwrap();
        assert_eq!(
            args.formats,
            vec![ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP]
        );
    }

    #[test]
    fn test_cli_repeated_formats_registered_once() {
        let args = Args::try_parse_from(["qrdecode", "--formats", "png,jpeg,png,jpg"]).unwrap();
        assert_eq!(
            args.pipeline_config().codec.formats,
            vec![ImageFormat::Png, ImageFormat::Jpeg]
        );
    }

    #[test]
    fn test_cli_unknown_format_rejected() {
        let err = Args::try_parse_from(["qrdecode", "--formats", "png,tiff"]).unwrap_err();
        assert!(err.to_string().contains("tiff"), "got: {err}");
    }

    #[test]
    fn test_cli_disk_staging_config() {
        let args = Args::try_parse_from([
            "qrdecode",
            "--staging",
            "disk",
            "--staging-dir",
            "/var/tmp/qr",
        ])
        .unwrap();
        let config = args.pipeline_config();
        assert_eq!(config.fetch.staging, StagingStrategy::disk("/var/tmp/qr"));
    }

    #[test]
    fn test_cli_disk_staging_defaults_to_temp_dir() {
        let args = Args::try_parse_from(["qrdecode", "--staging", "disk"]).unwrap();
        assert_eq!(
            args.pipeline_config().fetch.staging,
            StagingStrategy::os_temp_dir()
        );
    }

    #[test]
    fn test_cli_no_try_harder_disables_hint() {
        let args = Args::try_parse_from(["qrdecode", "--no-try-harder"]).unwrap();
        assert!(!args.pipeline_config().hints.try_harder);

        let args = Args::try_parse_from(["qrdecode"]).unwrap();
        assert!(args.pipeline_config().hints.try_harder);
    }

    #[test]
    fn test_cli_pipeline_config_carries_limits() {
        let args = Args::try_parse_from([
            "qrdecode",
            "--max-bytes",
            "2048",
            "--max-dimension",
            "1000",
            "--request-deadline",
            "5",
        ])
        .unwrap();
        let config = args.pipeline_config();
        assert_eq!(config.fetch.max_bytes, 2048);
        assert_eq!(config.codec.max_dimension, 1000);
        assert_eq!(config.deadline, Duration::from_secs(5));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["qrdecode", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["qrdecode", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
