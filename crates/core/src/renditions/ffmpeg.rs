//! FFmpeg-based encoder implementation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::EncoderConfig;
use super::error::EncoderError;
use super::traits::Encoder;

const NICE_BINARY: &str = "nice";

/// Encoder that runs the ffmpeg binary, optionally at reduced priority.
pub struct FfmpegEncoder {
    config: EncoderConfig,
}

impl FfmpegEncoder {
    /// Creates a new FFmpeg encoder with the given configuration.
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Creates an encoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EncoderConfig::default())
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = match self.config.niceness {
            Some(n) => {
                let mut cmd = Command::new(NICE_BINARY);
                cmd.arg("-n")
                    .arg(n.to_string())
                    .arg("--")
                    .arg(&self.config.ffmpeg_path);
                cmd
            }
            None => Command::new(&self.config.ffmpeg_path),
        };
        cmd.args(args);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> EncoderError {
        if e.kind() != std::io::ErrorKind::NotFound {
            return EncoderError::Io(e);
        }
        let path = if self.config.niceness.is_some() {
            PathBuf::from(NICE_BINARY)
        } else {
            self.config.ffmpeg_path.clone()
        };
        EncoderError::NotFound { path }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn encode(&self, args: &[String]) -> Result<(), EncoderError> {
        debug!(
            ffmpeg = %self.config.ffmpeg_path.display(),
            niceness = ?self.config.niceness,
            "Running encoder"
        );

        let mut child = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EncoderError::failed("encoder stderr was not captured", None))?;
        let tail_lines = self.config.stderr_tail_lines;

        let run = async {
            // stderr may carry non-UTF-8 file names and tags.
            let mut reader = BufReader::new(stderr);
            let mut tail = VecDeque::with_capacity(tail_lines);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                if tail_lines == 0 {
                    continue;
                }
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tail.len() == tail_lines {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, tail))
        };

        let (status, tail) = match self.config.timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), run).await {
                Ok(result) => result?,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(EncoderError::Timeout { timeout_secs: secs });
                }
            },
            None => run.await?,
        };

        if !status.success() {
            let stderr = if tail.is_empty() {
                None
            } else {
                Some(Vec::from(tail).join("\n"))
            };
            return Err(EncoderError::failed(
                format!("encoder exited with code: {:?}", status.code()),
                stderr,
            ));
        }

        Ok(())
    }

    async fn validate(&self) -> Result<(), EncoderError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(EncoderError::failed(
                "ffmpeg -version failed",
                Some(String::from_utf8_lossy(&out.stderr).to_string()),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(EncoderError::NotFound {
                path: self.config.ffmpeg_path.clone(),
            }),
            Err(e) => Err(EncoderError::Io(e)),
        }
    }
}
