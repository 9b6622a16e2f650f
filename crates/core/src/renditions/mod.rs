//! Rendition planning: turn one source video into an HLS rendition ladder.
//!
//! The [`RenditionPlanner`] runs one [`Encoder`] invocation per [`Variant`],
//! strictly in ladder order, into `{work_dir}/{input_file_name}-hls`, then
//! writes a multi-variant `playlist.m3u8` referencing each variant playlist.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vodpipe_core::renditions::{FfmpegEncoder, RenditionConfig, RenditionPlanner};
//!
//! let encoder = Arc::new(FfmpegEncoder::with_defaults());
//! let planner = RenditionPlanner::new(encoder, RenditionConfig::new("/tmp/processed-videos"));
//!
//! let out_dir = planner.transcode_to_renditions(Path::new("/tmp/raw-videos/abc.mp4")).await?;
//! // out_dir = /tmp/processed-videos/abc.mp4-hls, containing playlist.m3u8,
//! // 720p.m3u8, 720p_000.ts, ..., 480p.m3u8, 480p_000.ts, ...
//! ```

mod config;
mod error;
mod ffmpeg;
mod planner;
mod traits;
mod types;

pub use config::EncoderConfig;
pub use error::{EncoderError, RenditionError};
pub use ffmpeg::FfmpegEncoder;
pub use planner::{RenditionConfig, RenditionPlanner};
pub use traits::Encoder;
pub use types::{
    render_manifest, RenditionProgress, Variant, GOP_SIZE, MANIFEST_NAME, SEGMENT_SECONDS,
};
