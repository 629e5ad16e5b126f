use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use skriba::JobRegistry;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// URL of the media to transcribe.
    #[serde(default)]
    pub source_reference: String,
    /// Optional model selector, e.g. "base" or "small.en".
    pub model_selector: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: &'static str,
    pub source_reference: String,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub phase: Option<String>,
    pub transcript: Option<String>,
    pub error: Option<String>,
}

/// POST /transcribe. Validates the submission and starts a job in the
/// background; the response only acknowledges acceptance. Progress, the
/// transcript, and any job failure are all read via `GET /progress`.
pub async fn submit(
    registry: web::Data<JobRegistry>,
    body: web::Json<SubmitRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    registry
        .submit(&request.source_reference, request.model_selector.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(SubmitResponse {
        message: "Transcription started",
        source_reference: request.source_reference,
    }))
}

/// GET /progress. Snapshot of the most recent job's signal.
pub async fn progress(registry: web::Data<JobRegistry>) -> Result<HttpResponse, ApiError> {
    let signal = registry
        .current_signal()
        .await
        .ok_or(ApiError::NotInitialized)?;
    let snapshot = signal.snapshot().await;
    Ok(HttpResponse::Ok().json(ProgressResponse {
        phase: snapshot.phase.map(|p| p.to_string()),
        transcript: snapshot.transcript,
        error: snapshot.error,
    }))
}

/// GET /health.
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Route table, mounted by the binary and by the handler tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/transcribe", web::post().to(submit))
        .route("/progress", web::get().to(progress))
        .route("/health", web::get().to(health));
}
