use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use rcpt_image::{TargetSize, MAX_DIMENSION};
use rcpt_store::Receipt;
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::error::{ServerError, ServerResult};
use crate::thumbnail::ThumbnailManifest;
use crate::workflow::{ReceiptImage, ReceiptService, UploadedFile};

pub type AppState = Arc<ReceiptService>;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Raw `width`/`height` query values, validated by [`SizeParams::target`].
#[derive(Debug, Default, Deserialize)]
pub struct SizeParams {
    pub width: Option<String>,
    pub height: Option<String>,
}

impl SizeParams {
    pub fn target(&self) -> ServerResult<TargetSize> {
        Ok(TargetSize::new(
            parse_dimension("width", self.width.as_deref())?,
            parse_dimension("height", self.height.as_deref())?,
        ))
    }
}

/// Absent or empty means 0 (unconstrained). Surrounding whitespace is not
/// accepted.
fn parse_dimension(name: &str, raw: Option<&str>) -> ServerResult<u32> {
    let raw = match raw {
        None | Some("") => return Ok(0),
        Some(raw) => raw,
    };
    let value: i64 = raw
        .parse()
        .map_err(|_| ServerError::InvalidRequest(format!("invalid {name} parameter")))?;
    if value < 0 {
        return Err(ServerError::InvalidRequest(format!("{name} must be a positive integer")));
    }
    if value > i64::from(MAX_DIMENSION) {
        return Err(ServerError::InvalidRequest(format!(
            "{name} must not exceed {MAX_DIMENSION}"
        )));
    }
    // Bounded by MAX_DIMENSION above.
    Ok(value as u32)
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// `POST /receipts`: every part with a file name is stored as a receipt.
pub async fn upload_handler(
    State(service): State<AppState>,
    identity: Identity,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<String> {
    let mut multipart = multipart.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let data = field.bytes().await.map_err(multipart_error)?;
        files.push(UploadedFile { file_name, data });
    }

    let ids = service.upload(&identity, files).await?;
    Ok(ids
        .iter()
        .map(|id| format!("Receipt uploaded successfully with ID: {id}"))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge
    } else {
        ServerError::InvalidRequest(e.body_text())
    }
}

/// `GET /receipts`: the caller's receipts as JSON.
pub async fn list_handler(
    State(service): State<AppState>,
    identity: Identity,
) -> ServerResult<Json<Vec<Receipt>>> {
    service.list(&identity).map(Json)
}

/// `GET /receipts/:id`: the original, or a resized JPEG when a size is given.
pub async fn receipt_handler(
    State(service): State<AppState>,
    identity: Identity,
    Path(receipt_id): Path<String>,
    Query(params): Query<SizeParams>,
) -> ServerResult<Response> {
    let receipt = service.authorize(&identity, &receipt_id)?;
    let target = params.target()?;

    let response = match service.retrieve(&receipt, target).await? {
        ReceiptImage::Original { data, content_type } => {
            ([(header::CONTENT_TYPE, content_type)], data).into_response()
        }
        ReceiptImage::Resized { jpeg } => ([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response(),
    };
    Ok(response)
}

/// `GET /receipts/:id/thumbnails`: generate all sizes, return their paths.
pub async fn thumbnails_handler(
    State(service): State<AppState>,
    identity: Identity,
    Path(receipt_id): Path<String>,
) -> ServerResult<Json<ThumbnailManifest>> {
    let receipt = service.authorize(&identity, &receipt_id)?;
    service.thumbnails(&receipt).await.map(Json)
}
