use thiserror::Error;

/// Errors produced by the platform-free core.
///
/// Rendering and audio paths never surface these to the host page; the
/// front-end logs them and falls back to an inert state.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("PCM16 payload has odd byte length {0}")]
    OddByteLength(usize),
    #[error("malformed JSON message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("canvas has no drawable area ({width}x{height})")]
    EmptyCanvas { width: f32, height: f32 },
}

pub type Result<T> = std::result::Result<T, CoreError>;
