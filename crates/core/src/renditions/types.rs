//! Rendition ladder, encoder argument contract and manifest rendering.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the multi-variant manifest inside an output directory.
pub const MANIFEST_NAME: &str = "playlist.m3u8";

/// Segment length passed to the HLS muxer, in seconds.
pub const SEGMENT_SECONDS: u32 = 6;

/// Keyframe interval, in frames.
pub const GOP_SIZE: u32 = 48;

/// One output quality level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Label used for file names, e.g. `720p`.
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Target video bitrate in kilobits per second.
    pub bitrate_kbps: u32,
}

impl Variant {
    pub fn new(name: impl Into<String>, width: u32, height: u32, bitrate_kbps: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            bitrate_kbps,
        }
    }

    /// Default ladder, highest quality first.
    pub fn default_ladder() -> Vec<Variant> {
        vec![
            Variant::new("720p", 1280, 720, 2800),
            Variant::new("480p", 854, 480, 1400),
        ]
    }

    /// Rate-control buffer size: 1.2x the bitrate.
    pub fn bufsize_kbps(&self) -> u64 {
        u64::from(self.bitrate_kbps) * 6 / 5
    }

    /// Bandwidth advertised in the manifest, in bits per second.
    pub fn bandwidth_bps(&self) -> u64 {
        u64::from(self.bitrate_kbps) * 1000
    }

    /// File name of this variant's media playlist.
    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.name)
    }

    /// Segment file name template for this variant.
    pub fn segment_pattern(&self) -> String {
        format!("{}_%03d.ts", self.name)
    }

    /// Encoder arguments producing this variant's playlist and segments in `output_dir`.
    pub fn encode_args(
        &self,
        input: &Path,
        output_dir: &Path,
        preset: &str,
        log_level: &str,
    ) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-threads".to_string(),
            "1".to_string(),
            "-vf".to_string(),
            format!(
                "scale=w={}:h={}:force_original_aspect_ratio=decrease:force_divisible_by=2",
                self.width, self.height
            ),
            "-preset".to_string(),
            preset.to_string(),
            // Audio
            "-c:a".to_string(),
            "aac".to_string(),
            "-ar".to_string(),
            "48000".to_string(),
            // Video
            "-c:v".to_string(),
            "h264".to_string(),
            "-profile:v".to_string(),
            "main".to_string(),
            "-crf".to_string(),
            "20".to_string(),
            "-sc_threshold".to_string(),
            "0".to_string(),
            "-g".to_string(),
            GOP_SIZE.to_string(),
            "-keyint_min".to_string(),
            GOP_SIZE.to_string(),
            "-b:v".to_string(),
            format!("{}k", self.bitrate_kbps),
            "-maxrate".to_string(),
            format!("{}k", self.bitrate_kbps),
            "-bufsize".to_string(),
            format!("{}k", self.bufsize_kbps()),
            // HLS muxer
            "-hls_time".to_string(),
            SEGMENT_SECONDS.to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-f".to_string(),
            "hls".to_string(),
            "-hls_segment_filename".to_string(),
            output_dir
                .join(self.segment_pattern())
                .to_string_lossy()
                .to_string(),
            "-loglevel".to_string(),
            log_level.to_string(),
            output_dir
                .join(self.playlist_name())
                .to_string_lossy()
                .to_string(),
        ]
    }
}

/// Renders the multi-variant manifest listing `variants` in order.
pub fn render_manifest(variants: &[Variant]) -> String {
    let mut manifest = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    for variant in variants {
        manifest.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n{}\n",
            variant.bandwidth_bps(),
            variant.width,
            variant.height,
            variant.playlist_name()
        ));
    }
    manifest
}

/// Progress reported after each variant finishes encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionProgress {
    /// Variant that just finished.
    pub variant: String,
    /// Variants finished so far, including this one.
    pub completed: usize,
    pub total: usize,
}

impl RenditionProgress {
    /// Completion as a whole percentage.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total).min(100) as u8
    }
}
