//! Drives the encoder through a rendition ladder and writes the manifest.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use super::error::RenditionError;
use super::traits::Encoder;
use super::types::{render_manifest, RenditionProgress, Variant, MANIFEST_NAME};
use crate::metrics::RENDITION_ENCODE_DURATION;

/// Settings for a [`RenditionPlanner`].
#[derive(Debug, Clone)]
pub struct RenditionConfig {
    /// Directory output directories are created in.
    pub work_dir: PathBuf,
    /// Ladder to produce, in manifest order.
    pub variants: Vec<Variant>,
    pub preset: String,
    pub log_level: String,
}

impl RenditionConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            variants: Variant::default_ladder(),
            preset: "veryfast".to_string(),
            log_level: "error".to_string(),
        }
    }

    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }
}

/// Produces segmented renditions of one input plus a multi-variant manifest.
pub struct RenditionPlanner {
    encoder: Arc<dyn Encoder>,
    config: RenditionConfig,
}

impl RenditionPlanner {
    pub fn new(encoder: Arc<dyn Encoder>, config: RenditionConfig) -> Self {
        Self { encoder, config }
    }

    pub fn config(&self) -> &RenditionConfig {
        &self.config
    }

    /// Output directory used for `input`: `{work_dir}/{file_name}-hls`.
    pub fn output_dir_for(&self, input: &Path) -> Result<PathBuf, RenditionError> {
        let file_name = input
            .file_name()
            .ok_or_else(|| RenditionError::InvalidInput {
                path: input.to_path_buf(),
            })?;
        Ok(self
            .config
            .work_dir
            .join(format!("{}-hls", file_name.to_string_lossy())))
    }

    /// Encodes every variant and writes the manifest. Returns the output directory.
    pub async fn transcode_to_renditions(&self, input: &Path) -> Result<PathBuf, RenditionError> {
        self.transcode_with_progress(input, |_| {}).await
    }

    /// Like [`transcode_to_renditions`](Self::transcode_to_renditions), calling
    /// `on_progress` after each variant completes.
    ///
    /// Variants are encoded one at a time in configured order. The first failure
    /// aborts the run without writing a manifest; files already produced are left
    /// in place.
    pub async fn transcode_with_progress<F>(
        &self,
        input: &Path,
        mut on_progress: F,
    ) -> Result<PathBuf, RenditionError>
    where
        F: FnMut(RenditionProgress) + Send,
    {
        let variants = &self.config.variants;
        if variants.is_empty() {
            return Err(RenditionError::EmptyLadder);
        }

        let output_dir = self.output_dir_for(input)?;
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(RenditionError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| RenditionError::OutputDirectory {
                path: output_dir.clone(),
                source,
            })?;

        let total = variants.len();
        for (index, variant) in variants.iter().enumerate() {
            let args =
                variant.encode_args(input, &output_dir, &self.config.preset, &self.config.log_level);

            let started = Instant::now();
            let result = self.encoder.encode(&args).await;
            let elapsed = started.elapsed().as_secs_f64();

            if let Err(source) = result {
                RENDITION_ENCODE_DURATION
                    .with_label_values(&[variant.name.as_str(), "error"])
                    .observe(elapsed);
                error!(
                    variant = %variant.name,
                    encoder = self.encoder.name(),
                    error = %source,
                    "Variant encode failed"
                );
                return Err(RenditionError::Encode {
                    variant: variant.name.clone(),
                    source,
                });
            }

            RENDITION_ENCODE_DURATION
                .with_label_values(&[variant.name.as_str(), "ok"])
                .observe(elapsed);
            info!(
                variant = %variant.name,
                elapsed_secs = elapsed,
                "Variant encoded"
            );

            on_progress(RenditionProgress {
                variant: variant.name.clone(),
                completed: index + 1,
                total,
            });
        }

        let manifest_path = output_dir.join(MANIFEST_NAME);
        tokio::fs::write(&manifest_path, render_manifest(variants))
            .await
            .map_err(RenditionError::Manifest)?;

        info!(output_dir = %output_dir.display(), variants = total, "Renditions complete");
        Ok(output_dir)
    }
}
