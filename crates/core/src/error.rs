/// Result alias that carries the custom [`VisualiserError`] type.
pub type Result<T> = std::result::Result<T, VisualiserError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum VisualiserError {
    /// The drawing surface could not hand out a 2D context. Nothing can be
    /// rendered without one, so construction fails.
    #[error("drawing surface does not provide a 2D context")]
    SurfaceUnavailable,
    /// A single drawing operation failed on the backend.
    #[error("drawing operation failed: {0}")]
    Surface(String),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Caller supplied data the operation cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around FFT processing errors.
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl VisualiserError {
    /// Creates a drawing failure carrying the provided message.
    pub fn surface<T: Into<String>>(msg: T) -> Self {
        Self::Surface(msg.into())
    }

    /// Creates a configuration error carrying the provided message.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
