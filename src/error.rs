use thiserror::Error;

/// Errors surfaced by the search engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No legal moves available")]
    NoLegalMoves,

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised while decoding boards, games and moves from bytes.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid data length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Invalid board dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Invalid tile exponent {exponent} at cell {index}")]
    InvalidTile { index: usize, exponent: u8 },

    #[error("Invalid direction code {0}")]
    InvalidDirection(u8),

    #[error("Failed to decode base64 data: {0}")]
    Base64(#[from] base64::DecodeError),
}
