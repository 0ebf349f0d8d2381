use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShowcaseError {
    #[error("Configuration invalid: {reason}")]
    ConfigurationInvalid { reason: String },

    #[error("File format not recognized: {0}")]
    Motion(#[from] MotionError),

    #[error("Stream error: {reason}")]
    StreamError { reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems found while reading a BVH motion file.
///
/// Line numbers are 1-based, as a text editor would show them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    #[error("no MOTION section found")]
    MissingMotionSection,

    #[error("missing {field} line after MOTION (line {line})")]
    MissingHeaderLine { field: &'static str, line: usize },

    #[error("frame count not found on line {line}: {text:?}")]
    InvalidFrameCount { line: usize, text: String },

    #[error("frame count on line {line} is out of range: {text:?}")]
    FrameCountOutOfRange { line: usize, text: String },

    #[error("frame time not found on line {line}: {text:?}")]
    InvalidFrameTime { line: usize, text: String },

    #[error("frame time {seconds}s is too short to schedule")]
    InvalidFrameInterval { seconds: f64 },

    #[error("motion section contains no frames")]
    NoFrames,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Message too large: {len} bytes")]
    MessageTooLarge { len: usize },

    #[error("Session rejected: {reason}")]
    Rejected { reason: String },
}
