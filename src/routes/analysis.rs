//! AI dispatch routes
//!
//! Both endpoints sit behind the session gate; by the time a handler runs
//! the caller is authenticated. Each request makes exactly one call to the
//! model, and any staged upload is deleted before the response leaves,
//! whatever the outcome.

use axum::extract::{Multipart, State};
use axum::response::Json;
use axum::{Extension, Json as JsonBody};
use serde_json::{Value, json};

use crate::ai::{AiError, GeminiClient};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::intake::{ArtifactStaging, StagedArtifact};
use crate::server::AppState;

/// Advisory prompt sent alongside every soil/crop image
const SOIL_ANALYSIS_PROMPT: &str = "\
Analyze this image and provide detailed insights based on its content:
  - If the image is of soil:
    1. Provide a rough soil quality assessment based on visible indicators.
    2. Suggest simple and low-cost techniques to check soil quality at home.
    3. Offer advice on improving soil health and boosting crop yield.

  - If the image shows an infected crop:
    1. Identify any visible pests or signs of infestation.
    2. Suggest effective control methods for managing the issue.
    3. Provide guidance on early detection, preventive measures, and ongoing \
monitoring to reduce future risks.";

/// POST /generate-response: forward a text prompt to the model
pub async fn generate_response(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    tracing::debug!("Generating response for {}", user.email);

    // The prompt must be a non-empty JSON string
    let prompt = body
        .get("prompt")
        .and_then(|p| p.as_str())
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Please provide a valid prompt".to_string()))?;

    match state.ai.generate_text(prompt).await {
        Ok(text) => Ok(Json(json!({ "response": text }))),
        Err(AiError::EmptyPrompt) => {
            Err(ApiError::InvalidInput("Please provide a valid prompt".to_string()))
        }
        Err(err) => {
            tracing::error!("Text generation failed: {}", err);
            Err(ApiError::Generation)
        }
    }
}

/// POST /analyze-soil: stage the uploaded image, dispatch it with the
/// advisory prompt, and relay the analysis text
pub async fn analyze_soil(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let (bytes, media_type, file_name) = read_image_field(&mut multipart).await?;
    tracing::info!(
        "Analyzing {} byte {} upload for {}",
        bytes.len(),
        media_type,
        user.email
    );

    let analysis = stage_and_dispatch(
        &state.staging,
        &state.ai,
        &bytes,
        &media_type,
        file_name.as_deref(),
    )
    .await?;

    Ok(Json(json!({ "success": true, "analysis": analysis })))
}

/// Stage the upload, dispatch it, and release the staged file before the
/// outcome is mapped. Every exit path deletes the file; the staging
/// directory is empty once this returns.
async fn stage_and_dispatch(
    staging: &ArtifactStaging,
    ai: &GeminiClient,
    bytes: &[u8],
    media_type: &str,
    file_name: Option<&str>,
) -> Result<String, ApiError> {
    let artifact = staging.stage(bytes, media_type, file_name).await?;
    dispatch_staged(artifact, ai).await
}

/// Read the staged image back and make the single model call. The upload
/// itself has already succeeded at this point, so anything that goes
/// wrong here surfaces as the analysis-failure shape.
async fn dispatch_staged(
    mut artifact: StagedArtifact,
    ai: &GeminiClient,
) -> Result<String, ApiError> {
    let image = match artifact.read().await {
        Ok(image) => image,
        Err(err) => {
            tracing::error!("Failed to read staged file back: {}", err);
            artifact.release().await;
            return Err(ApiError::Analysis);
        }
    };

    let result = ai
        .generate_with_image(SOIL_ANALYSIS_PROMPT, &image, artifact.media_type())
        .await;

    artifact.release().await;

    result.map_err(|err| {
        tracing::error!("Image analysis failed: {}", err);
        ApiError::Analysis
    })
}

/// Pull the single `image` field out of the multipart body. Absence of a
/// file is reported without touching the filesystem.
async fn read_image_field(
    multipart: &mut Multipart,
) -> Result<(Vec<u8>, String, Option<String>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Upload(std::io::Error::other(err)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let media_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::Upload(std::io::Error::other(err)))?;

        return Ok((bytes.to_vec(), media_type, file_name));
    }

    Err(ApiError::NoFile)
}
