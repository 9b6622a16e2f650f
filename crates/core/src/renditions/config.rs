//! Configuration for the renditions module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ffmpeg-based encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Run the encoder under `nice -n <value> --`. `None` runs it directly.
    #[serde(default = "default_niceness")]
    pub niceness: Option<i32>,

    /// Per-invocation timeout in seconds. `None` waits indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Encoder speed/quality preset.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Number of trailing stderr lines kept for error reports.
    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_niceness() -> Option<i32> {
    Some(10)
}

fn default_preset() -> String {
    "veryfast".to_string()
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_stderr_tail_lines() -> usize {
    20
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            niceness: default_niceness(),
            timeout_secs: None,
            preset: default_preset(),
            log_level: default_log_level(),
            stderr_tail_lines: default_stderr_tail_lines(),
        }
    }
}
