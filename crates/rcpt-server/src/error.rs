use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rcpt_image::ImageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("X-User-ID header is required")]
    MissingIdentity,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Request body exceeds the upload limit")]
    PayloadTooLarge,

    #[error("Uploaded file is not a valid image: {0}")]
    InvalidImage(String),

    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    #[error("No receipts found for this user")]
    NoReceipts,

    #[error("Unauthorized: receipt {receipt_id} is not owned by {user_id}")]
    Forbidden { receipt_id: String, user_id: String },

    #[error("store error: {0}")]
    Store(#[from] rcpt_store::StoreError),

    #[error("image error: {0}")]
    Image(#[from] ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingIdentity
            | Self::InvalidRequest(_)
            | Self::InvalidImage(_)
            | Self::Image(ImageError::OutputTooLarge { .. }) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::ReceiptNotFound(_) | Self::NoReceipts => StatusCode::NOT_FOUND,
            Self::Store(_)
            | Self::Image(_)
            | Self::Io(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body sent to the client. Server-side failures get a fixed message so
    /// paths and OS errors stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Image(ImageError::Timeout { .. }) => "Image processing timed out".into(),
            Self::Image(ImageError::OutputTooLarge { width, height, .. }) => format!(
                "Requested size would produce a {width}x{height} image; each side must not exceed {}",
                rcpt_image::MAX_DIMENSION
            ),
            Self::Image(_) => "Could not process image".into(),
            Self::Store(_) => "Could not store receipt".into(),
            Self::Io(_) => "Could not access receipt file".into(),
            Self::Config(_) | Self::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, self.public_message()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
