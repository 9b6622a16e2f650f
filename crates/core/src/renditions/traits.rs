//! Trait definitions for the renditions module.

use async_trait::async_trait;

use super::error::EncoderError;

/// An external encoder driven with a full argument list per invocation.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Returns the name of this encoder implementation.
    fn name(&self) -> &str;

    /// Runs one encode to completion.
    async fn encode(&self, args: &[String]) -> Result<(), EncoderError>;

    /// Validates that the encoder is installed and runnable.
    async fn validate(&self) -> Result<(), EncoderError>;
}
