//! Image generation, editing, variation, and save endpoints.
//!
//! Field names follow the legacy JSON contract (`imageURL`, `imgURL`,
//! `fileName`) for client compatibility.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use retouch_common::types::{GeneratedImage, Point};
use retouch_common::Error;

use crate::api::{ApiError, ApiResult};
use crate::AppState;

/// Directory under the working dir for explicitly saved images
const SAVED_DIR: &str = "saved";

/// POST /edit request body
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    #[serde(rename = "imageURL")]
    pub image_url: String,
    pub points: Vec<Point>,
    pub prompt: String,
}

/// POST /variations request body
#[derive(Debug, Deserialize)]
pub struct VariationsRequest {
    #[serde(rename = "imageURL")]
    pub image_url: String,
    /// Accepted for legacy clients; the variation API takes no prompt
    #[serde(default)]
    pub prompt: Option<String>,
}

/// POST /generate request body
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
}

/// POST /save request body
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "imgURL")]
    pub img_url: String,
}

/// POST /save response body
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub message: String,
}

/// POST /edit
///
/// Runs the full mask-edit pipeline: the polygon region of the source
/// image is cleared to transparency and submitted with the prompt.
pub async fn edit_image(
    State(state): State<AppState>,
    Json(req): Json<EditRequest>,
) -> ApiResult<Json<Vec<GeneratedImage>>> {
    info!(url = %req.image_url, points = req.points.len(), "Edit request received");
    let images = state
        .pipeline
        .edit(req.image_url, req.points, req.prompt)
        .await?;
    Ok(Json(images))
}

/// POST /variations
///
/// Runs the no-mask pipeline: the normalized source image is submitted
/// unchanged.
pub async fn image_variations(
    State(state): State<AppState>,
    Json(req): Json<VariationsRequest>,
) -> ApiResult<Json<Vec<GeneratedImage>>> {
    info!(url = %req.image_url, "Variation request received");
    if let Some(prompt) = &req.prompt {
        debug!(prompt, "Ignoring prompt: the variation API does not accept one");
    }
    let images = state.pipeline.variations(req.image_url).await?;
    Ok(Json(images))
}

/// POST /generate
///
/// Plain text-to-image generation; no pipeline involved.
pub async fn create_images(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<Json<Vec<GeneratedImage>>> {
    info!("Generate request received");
    let images = state.generator.generate(&req.text).await?;
    Ok(Json(images))
}

/// POST /save
///
/// Downloads a generated image into the saved-images directory.
/// Refuses to overwrite an existing file.
pub async fn save_image(
    State(state): State<AppState>,
    Json(req): Json<SaveRequest>,
) -> ApiResult<Json<SaveResponse>> {
    let name = sanitize_file_name(&req.file_name)?;

    let dir = state.config.working_dir.join(SAVED_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::ArtifactIo {
            path: dir.clone(),
            source: e,
        })?;

    let bytes = state.fetcher.fetch(&req.img_url).await?;

    let path = dir.join(&name);
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(ApiError::Conflict(format!(
                "an image named {} already exists",
                name
            )));
        }
        Err(e) => {
            return Err(Error::ArtifactIo {
                path: path.clone(),
                source: e,
            }
            .into());
        }
    };

    file.write_all(&bytes).await.map_err(|e| Error::ArtifactIo {
        path: path.clone(),
        source: e,
    })?;

    info!(file = %path.display(), "Image saved");
    Ok(Json(SaveResponse {
        message: "Image saved successfully".to_string(),
    }))
}

/// Restrict saved-image names to bare file names
fn sanitize_file_name(name: &str) -> Result<String, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("fileName must not be empty".to_string()));
    }
    if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
        return Err(ApiError::BadRequest(format!(
            "fileName must be a bare file name, got {:?}",
            name
        )));
    }
    Ok(trimmed.to_string())
}
