use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::download;
use crate::error::VerifyError;
use crate::gemini::{self, GeminiClient, RemoteFile, Verdict};

pub const DEFAULT_DESCRIPTION: &str = "No description provided";

#[derive(Debug, Deserialize)]
pub struct VerifyVideoRequest {
    // Option-typed so missing keys surface as our own 400 payload instead of
    // the extractor's rejection
    pub video_url: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// POST /verify-video
///
/// Downloads the complaint video, runs it past Gemini and returns the model's
/// verdict. Both the local temp file and the uploaded Gemini artifact are
/// released before the response goes out, whatever the outcome.
pub async fn verify_video(
    Extension(gemini): Extension<Arc<GeminiClient>>,
    Extension(http): Extension<reqwest::Client>,
    Json(payload): Json<VerifyVideoRequest>,
) -> Response {
    let (video_url, category) = match (&payload.video_url, &payload.category) {
        (Some(url), Some(category)) => (url.clone(), category.clone()),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "video_url and category are required"})),
            )
                .into_response()
        }
    };
    let description = payload
        .description
        .clone()
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let start_time = std::time::Instant::now();
    let temp_path = std::env::temp_dir().join(format!("complaint-video-{}.mp4", Uuid::new_v4()));
    let mut remote_file: Option<RemoteFile> = None;

    let outcome = run_verification(
        &gemini,
        &http,
        &video_url,
        &category,
        &description,
        &temp_path,
        &mut remote_file,
    )
    .await;

    // Cleanup runs in both cases. Remote artifact first; a failure there is
    // logged and must not skip removing the local file.
    if let Some(file) = remote_file {
        match gemini.delete_file(&file.name).await {
            Ok(()) => tracing::info!("Deleted {} from Gemini", file.name),
            Err(e) => tracing::error!("Failed to delete {} from Gemini: {}", file.name, e),
        }
    }
    if temp_path.exists() {
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            tracing::error!(
                "Failed to remove temp file {}: {}",
                temp_path.display(),
                e
            );
        }
    }

    let duration = start_time.elapsed().as_secs_f64();
    match outcome {
        Ok(verdict) => {
            crate::metrics::record_verification("success", duration);
            tracing::info!(
                "Verification complete: is_valid={}, confidence={}",
                verdict.is_valid,
                verdict.confidence_score
            );
            (StatusCode::OK, Json(verdict)).into_response()
        }
        Err(e) => {
            crate::metrics::record_verification("failure", duration);
            crate::metrics::increment_verification_errors(e.stage());
            tracing::error!("Verification failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": e.to_string(),
                    "is_valid": false,
                    "ai_reasoning": "Failed to analyze video"
                })),
            )
                .into_response()
        }
    }
}

/// The fallible part of the flow. The uploaded handle is written into
/// `remote_file` as soon as it exists so the caller can release it even when a
/// later step bails out.
async fn run_verification(
    gemini: &GeminiClient,
    http: &reqwest::Client,
    video_url: &str,
    category: &str,
    description: &str,
    temp_path: &Path,
    remote_file: &mut Option<RemoteFile>,
) -> Result<Verdict, VerifyError> {
    // 1. Download the video to a local temp file
    download::download_to_file(http, video_url, temp_path).await?;
    tracing::info!(
        "Video downloaded to {}. Uploading to Gemini...",
        temp_path.display()
    );

    // 2. Upload to the Gemini File API
    let uploaded = gemini.upload_file(temp_path).await?;
    *remote_file = Some(uploaded.clone());

    // 3. Wait for Gemini to finish processing
    tracing::info!("Waiting for video processing...");
    let active = gemini.wait_until_active(uploaded).await?;
    *remote_file = Some(active.clone());
    tracing::info!("Processing complete. Analyzing...");

    // 4. Ask the model
    let prompt = gemini::build_prompt(category, description);
    let mime_type = mime_guess::from_path(temp_path)
        .first_or_octet_stream()
        .to_string();
    let reply = gemini.generate_content(&prompt, &active, &mime_type).await?;

    // 5. Parse the verdict out of the reply
    gemini::parse_verdict(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_deserialize_to_none() {
        let req: VerifyVideoRequest = serde_json::from_str(r#"{"category": "Noise"}"#).unwrap();
        assert!(req.video_url.is_none());
        assert_eq!(req.category.as_deref(), Some("Noise"));
        assert!(req.description.is_none());
    }

    #[test]
    fn full_request_deserializes() {
        let req: VerifyVideoRequest = serde_json::from_str(
            r#"{"video_url": "http://cdn/clip.mp4", "category": "Garbage Overflow", "description": "Bin overflowing for 3 days"}"#,
        )
        .unwrap();
        assert_eq!(req.video_url.as_deref(), Some("http://cdn/clip.mp4"));
        assert_eq!(req.description.as_deref(), Some("Bin overflowing for 3 days"));
    }
}
