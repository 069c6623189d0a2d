//! Pipeline orchestration.
//!
//! Sequences one edit or variation request end to end: fetch the
//! source image, rasterize the mask, composite, normalize, submit to
//! the generation service, and clean up. Stages within a job run
//! strictly sequentially; concurrent jobs share nothing but the
//! working directory, which is partitioned by job UUID.

pub mod artifacts;
pub mod composite;
pub mod normalize;
pub mod raster;

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView, RgbaImage};
use tracing::{debug, info, warn};
use uuid::Uuid;

use retouch_common::types::{GeneratedImage, Mask, Point};
use retouch_common::{Error, Result};

use crate::pipeline::artifacts::ArtifactStore;
use crate::services::fetch::ImageFetcher;
use crate::services::generation::GenerationService;

/// Stages of the editing pipeline, in execution order.
///
/// Failure in any stage aborts the remaining ones; the failing stage's
/// error kind is preserved and artifacts are released either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Rasterizing,
    Compositing,
    Normalizing,
    Submitting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Rasterizing => "rasterizing",
            Stage::Compositing => "compositing",
            Stage::Normalizing => "normalizing",
            Stage::Submitting => "submitting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// One edit request's unit of work.
///
/// Owned by the pipeline for the lifetime of a single request; the id
/// partitions the artifact namespace between concurrent jobs.
#[derive(Debug)]
pub struct EditJob {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub image_url: String,
    pub mask: Mask,
    pub prompt: String,
}

impl EditJob {
    fn new(image_url: String, mask: Mask, prompt: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            image_url,
            mask,
            prompt,
        }
    }
}

/// A variation request: same lifecycle as [`EditJob`] minus the mask
#[derive(Debug)]
pub struct VariationJob {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub image_url: String,
}

impl VariationJob {
    fn new(image_url: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            image_url,
        }
    }
}

/// Orchestrates the edit and variation pipelines
pub struct Pipeline {
    fetcher: ImageFetcher,
    generator: Arc<dyn GenerationService>,
    artifacts: Arc<ArtifactStore>,
}

impl Pipeline {
    pub fn new(
        fetcher: ImageFetcher,
        generator: Arc<dyn GenerationService>,
        artifacts: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            fetcher,
            generator,
            artifacts,
        }
    }

    /// Run the full edit pipeline for one request.
    ///
    /// The mask is validated before any network or filesystem work;
    /// artifacts are always released before this returns, on success
    /// and on every failure path.
    pub async fn edit(
        &self,
        image_url: String,
        points: Vec<Point>,
        prompt: String,
    ) -> Result<Vec<GeneratedImage>> {
        let mask = Mask::new(points)?;
        let job = EditJob::new(image_url, mask, prompt);
        info!(job_id = %job.id, url = %job.image_url, points = job.mask.len(), "Starting edit job");

        let result = self.run_edit_stages(&job).await;
        self.artifacts.release(job.id).await;

        match &result {
            Ok(images) => {
                info!(job_id = %job.id, results = images.len(), stage = %Stage::Done, "Edit job complete");
            }
            Err(e) => warn!(job_id = %job.id, error = %e, "Edit job failed"),
        }
        result
    }

    /// Run the simpler variation pipeline: fetch, normalize, submit.
    ///
    /// Skips rasterization and compositing entirely; the normalized
    /// source image is submitted unchanged.
    pub async fn variations(&self, image_url: String) -> Result<Vec<GeneratedImage>> {
        let job = VariationJob::new(image_url);
        info!(job_id = %job.id, url = %job.image_url, "Starting variation job");

        let result = self.run_variation_stages(&job).await;
        self.artifacts.release(job.id).await;

        match &result {
            Ok(images) => {
                info!(job_id = %job.id, results = images.len(), stage = %Stage::Done, "Variation job complete");
            }
            Err(e) => warn!(job_id = %job.id, error = %e, "Variation job failed"),
        }
        result
    }

    async fn run_edit_stages(&self, job: &EditJob) -> Result<Vec<GeneratedImage>> {
        debug!(job_id = %job.id, stage = %Stage::Fetching, "stage start");
        let (decoded, _original_path) = self.fetch_source(job.id, &job.image_url).await?;
        let (width, height) = decoded.dimensions();

        // Pure computation from here to the submit: no suspension points.
        debug!(job_id = %job.id, stage = %Stage::Rasterizing, width, height, "stage start");
        let grid = raster::rasterize(&job.mask, width, height);

        debug!(job_id = %job.id, stage = %Stage::Compositing, masked = grid.masked_count(), "stage start");
        let masked = composite::apply_mask(&decoded, &grid)?;
        let masked_path = self.artifacts.allocate(job.id, "masked");
        self.artifacts.write(&masked_path, &encode_png(&masked)?).await?;

        debug!(job_id = %job.id, stage = %Stage::Normalizing, "stage start");
        let normalized = normalize::ensure_alpha(&DynamicImage::ImageRgba8(masked))?;
        let rgba_png = encode_png(&normalized)?;
        let rgba_path = self.artifacts.allocate(job.id, "rgba");
        self.artifacts.write(&rgba_path, &rgba_png).await?;
        // The predecessor is gone as soon as its successor exists, so
        // per-job disk usage stays bounded.
        self.artifacts.discard(job.id, &masked_path).await;

        debug!(job_id = %job.id, stage = %Stage::Submitting, "stage start");
        self.generator.edit(rgba_png, &job.prompt).await
    }

    async fn run_variation_stages(&self, job: &VariationJob) -> Result<Vec<GeneratedImage>> {
        debug!(job_id = %job.id, stage = %Stage::Fetching, "stage start");
        let (decoded, original_path) = self.fetch_source(job.id, &job.image_url).await?;

        debug!(job_id = %job.id, stage = %Stage::Normalizing, "stage start");
        let normalized = normalize::ensure_alpha(&decoded)?;
        let rgba_png = encode_png(&normalized)?;
        let rgba_path = self.artifacts.allocate(job.id, "rgba");
        self.artifacts.write(&rgba_path, &rgba_png).await?;
        self.artifacts.discard(job.id, &original_path).await;

        debug!(job_id = %job.id, stage = %Stage::Submitting, "stage start");
        self.generator.vary(rgba_png).await
    }

    /// Download the source image, keep the raw bytes as an artifact,
    /// and decode them for the in-memory stages.
    async fn fetch_source(
        &self,
        job_id: Uuid,
        url: &str,
    ) -> Result<(DynamicImage, std::path::PathBuf)> {
        let bytes = self.fetcher.fetch(url).await?;
        let original_path = self.artifacts.allocate(job_id, "original");
        self.artifacts.write(&original_path, &bytes).await?;
        let decoded = decode(&bytes)?;
        Ok((decoded, original_path))
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| Error::UnsupportedFormat(format!("failed to decode source image: {}", e)))
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| Error::Internal(format!("PNG encode failed: {}", e)))?;
    Ok(buf.into_inner())
}
