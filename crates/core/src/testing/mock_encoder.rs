//! Mock encoder for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::renditions::{Encoder, EncoderError};

/// Mock implementation of the Encoder trait.
///
/// Records every argument list it is given. On success it writes a small
/// placeholder playlist (the last argument) and one segment file, so callers
/// see the same directory layout a real encode would leave.
///
/// # Example
///
/// ```rust,ignore
/// use vodpipe_core::testing::MockEncoder;
///
/// let encoder = MockEncoder::new();
/// encoder.fail_on_call(2).await; // second variant fails
///
/// let planner = RenditionPlanner::new(Arc::new(encoder), config);
/// ```
#[derive(Debug)]
pub struct MockEncoder {
    calls: Arc<RwLock<Vec<Vec<String>>>>,
    /// 1-based invocation that should fail.
    fail_on_call: Arc<RwLock<Option<usize>>>,
    /// If set, the next invocation fails with this error.
    next_error: Arc<RwLock<Option<EncoderError>>>,
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEncoder {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            fail_on_call: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Argument lists of every invocation so far.
    pub async fn recorded_calls(&self) -> Vec<Vec<String>> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Make the `n`th invocation (1-based) fail.
    pub async fn fail_on_call(&self, n: usize) {
        *self.fail_on_call.write().await = Some(n);
    }

    /// Configure the next invocation to fail with the given error.
    pub async fn set_next_error(&self, error: EncoderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Simulated time each invocation takes.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    async fn write_outputs(args: &[String]) -> Result<(), EncoderError> {
        if let Some(playlist) = args.last() {
            let playlist = PathBuf::from(playlist);
            if let Some(parent) = playlist.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&playlist, "#EXTM3U\n#EXT-X-ENDLIST\n").await?;
        }

        let segment = args
            .iter()
            .position(|a| a == "-hls_segment_filename")
            .and_then(|i| args.get(i + 1));
        if let Some(pattern) = segment {
            tokio::fs::write(pattern.replace("%03d", "000"), b"segment").await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn encode(&self, args: &[String]) -> Result<(), EncoderError> {
        let call_number = {
            let mut calls = self.calls.write().await;
            calls.push(args.to_vec());
            calls.len()
        };

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        if *self.fail_on_call.read().await == Some(call_number) {
            return Err(EncoderError::failed(
                format!("mock failure on call {}", call_number),
                Some("mock stderr".to_string()),
            ));
        }

        Self::write_outputs(args).await
    }

    async fn validate(&self) -> Result<(), EncoderError> {
        Ok(())
    }
}
