use thiserror::Error;

/// How far an error reaches: the current chunk, or the whole session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; the chunk is dropped.
    ContractViolation,
    /// Dominant bin is DC so the time-domain skew has no value.
    UndefinedMeasurement,
    /// The transform could not run; the chunk is dropped.
    TransformFailure,
    /// Acquisition or persistence broke; later chunks cannot be trusted.
    SessionFatal,
}

#[derive(Debug, Error)]
pub enum SkewError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("chunk length must be at least one sample per channel")]
    InvalidChunkLength,
    #[error("interleaved buffer length mismatch: expected {expected}, got {actual}")]
    InterleavedLength { expected: usize, actual: usize },
    #[error("channel length mismatch: expected {expected} samples, got {actual}")]
    ChannelLengthMismatch { expected: usize, actual: usize },
    #[error("spectrum length mismatch: {left} bins vs {right} bins")]
    SpectrumLengthMismatch { left: usize, right: usize },
    #[error("sample rate mismatch: expected {expected}, got {actual}")]
    SampleRateMismatch { expected: f64, actual: f64 },
    #[error("dominant frequency {frequency_hz} Hz has no period; phase skew in seconds is undefined")]
    UndefinedMeasurement { frequency_hz: f64 },
    #[error("transform failed: {0}")]
    Transform(String),
    #[error("acquisition failed: {0}")]
    Acquisition(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SkewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SkewError::InvalidSampleRate
            | SkewError::InvalidChunkLength
            | SkewError::InterleavedLength { .. }
            | SkewError::ChannelLengthMismatch { .. }
            | SkewError::SpectrumLengthMismatch { .. }
            | SkewError::SampleRateMismatch { .. } => ErrorKind::ContractViolation,
            SkewError::UndefinedMeasurement { .. } => ErrorKind::UndefinedMeasurement,
            SkewError::Transform(_) => ErrorKind::TransformFailure,
            SkewError::Acquisition(_) | SkewError::Config(_) | SkewError::Io(_) => {
                ErrorKind::SessionFatal
            }
        }
    }

    pub fn is_session_fatal(&self) -> bool {
        self.kind() == ErrorKind::SessionFatal
    }
}

impl From<realfft::FftError> for SkewError {
    fn from(value: realfft::FftError) -> Self {
        SkewError::Transform(value.to_string())
    }
}
