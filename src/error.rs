use thiserror::Error;

/// Errors that can occur while tracing a centerline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    #[error("unsupported image reference: {0}")]
    UnsupportedImageSource(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The clip rectangle does not overlap the image, so there is nothing to trace.
    #[error("clip rectangle does not overlap the image")]
    NoOverlap,

    #[error("external tracer unavailable: {0}")]
    TracerUnavailable(String),

    /// A single candidate produced empty or unparseable output.
    /// Recovered inside the sweep; only surfaces from the tracer and parser seams.
    #[error("malformed tracer output: {0}")]
    MalformedOutput(String),

    #[error("no usable path found; try adjusting contrast, polarity (invert) or the candidate count")]
    NoUsablePath,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid preset: {0}")]
    Preset(#[from] serde_json::Error),
}
