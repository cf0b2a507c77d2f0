use serde::{Deserialize, Serialize};

/// Label of the arg-max class and the probability the model assigned to it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResult {
    pub predicted_class: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A file part pulled out of a multipart upload.
#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}
