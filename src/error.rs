//! Error taxonomy for overlay requests.
//!
//! Nothing in here is fatal to the render loop. The engine logs these at the
//! render-thread boundary and carries on ticking everything else.

/// Convenience result type used across the crate.
pub type OverlayResult<T> = Result<T, OverlayError>;

/// Top-level error returned by overlay requests and collaborators.
#[derive(thiserror::Error, Debug)]
pub enum OverlayError {
    /// Asset bytes could not be fetched (network, missing file, ...).
    #[error("failed to fetch '{location}': {reason}")]
    AssetFetch { location: String, reason: String },

    /// The fetched bytes did not decode into a usable frame sequence.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A stream source identifier was empty or malformed.
    #[error("invalid source reference: '{0}'")]
    InvalidSource(String),

    /// The stream player refused to open or drive a source.
    #[error("playback error: {0}")]
    Playback(String),

    /// A video was requested but no stream player is attached.
    #[error("no stream player configured")]
    NoPlayer,

    /// Configuration could not be parsed or holds out-of-range values.
    #[error("configuration error: {0}")]
    Config(String),
}

impl OverlayError {
    /// Build an [`OverlayError::AssetFetch`] value.
    pub fn fetch(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::AssetFetch {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Build an [`OverlayError::Playback`] value.
    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    /// Build an [`OverlayError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Reasons a frame sequence is rejected before it ever reaches the scene.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// The sequence contained no frames.
    #[error("frame sequence is empty")]
    Empty,

    /// Frame and duration lists disagree in length.
    #[error("{frames} frames but {durations} durations")]
    LengthMismatch { frames: usize, durations: usize },

    /// The underlying image codec failed.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
