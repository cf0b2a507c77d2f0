use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Result};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::class_index::ClassIndexMap;
use crate::classifier::{classify, Classifier};
use crate::error::ServiceError;
use crate::models::{PredictionResult, UploadedImage};
use crate::preprocess::{decode_and_preprocess, is_allowed_content_type};

const FILE_FIELD: &str = "file";

/// Process-wide state, built once at startup and shared read-only by every worker.
pub struct AppState {
    pub classes: ClassIndexMap,
    pub classifier: Arc<dyn Classifier>,
    pub image_size: u32,
    pub max_upload_bytes: usize,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/predict").route(web::post().to(predict)));
}

pub async fn home() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Waste classifier server is running!")
}

pub async fn predict(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let request_id = Uuid::new_v4();
    log::info!("[{request_id}] Received a request to /predict");

    match run_prediction(state, payload, request_id).await {
        Ok(result) => {
            log::info!(
                "[{request_id}] Prediction: {} (Confidence: {:.2})",
                result.predicted_class,
                result.confidence
            );
            Ok(HttpResponse::Ok().json(result))
        }
        Err(e) => {
            log::error!("[{request_id}] {e}");
            Err(e)
        }
    }
}

async fn run_prediction(
    state: web::Data<AppState>,
    payload: Multipart,
    request_id: Uuid,
) -> Result<PredictionResult, ServiceError> {
    let upload = read_upload(payload, state.max_upload_bytes).await?;
    if upload.filename.is_empty() {
        return Err(ServiceError::NoSelectedFile);
    }

    let content_type = upload.content_type.clone().unwrap_or_default();
    log::info!("[{request_id}] File received: {}", upload.filename);
    log::info!("[{request_id}] File content type: {content_type}");
    if !is_allowed_content_type(&content_type) {
        return Err(ServiceError::UnsupportedMediaType(content_type));
    }
    log::info!("[{request_id}] File size: {} bytes", upload.bytes.len());

    // decoding and inference are CPU bound, keep them off the async workers
    web::block(move || -> Result<PredictionResult, ServiceError> {
        let tensor = decode_and_preprocess(&upload.bytes, &content_type, state.image_size)?;
        Ok(classify(state.classifier.as_ref(), &state.classes, &tensor)?)
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("prediction task failed: {e}")))?
}

/// Collects the first `file` part that carries a filename. Every other part is
/// drained and dropped. A kept part larger than `limit` bytes aborts the read.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<UploadedImage, ServiceError> {
    let mut upload: Option<UploadedImage> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            log::warn!("Malformed multipart body: {e}");
            ServiceError::NoFilePart
        })?;

        let filename = {
            let disposition = field.content_disposition();
            if disposition.get_name() == Some(FILE_FIELD) {
                disposition.get_filename().map(str::to_owned)
            } else {
                None
            }
        };
        let keep = upload.is_none() && filename.is_some();
        let content_type = field.content_type().map(|m| m.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| {
                log::warn!("Failed to read multipart field: {e}");
                ServiceError::NoFilePart
            })?;
            if keep {
                if bytes.len() + data.len() > limit {
                    return Err(ServiceError::Internal(format!(
                        "upload exceeds {limit} bytes"
                    )));
                }
                bytes.extend_from_slice(&data);
            }
        }

        if let (true, Some(filename)) = (keep, filename) {
            upload = Some(UploadedImage {
                filename,
                content_type,
                bytes,
            });
        }
    }

    upload.ok_or(ServiceError::NoFilePart)
}
