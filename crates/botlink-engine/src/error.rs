use botlink_content::ContentError;
use botlink_frame::FrameError;
use botlink_transport::TransportError;

/// Errors that can occur while driving a device session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Transport failure or malformed delivery.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Receive accumulator overflow.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Outgoing content could not be queued.
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    /// `connect` needs a tokio runtime to spawn its timers.
    #[error("no tokio runtime available to run the engine timers")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, EngineError>;
