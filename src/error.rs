//! Error types for the console core.

use thiserror::Error;

/// Errors raised by the outbound backend channel.
///
/// All outbound sends are fire-and-forget; a channel error is logged by the
/// console and reported inline, never propagated as a panic.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The backend side of the channel has gone away
    #[error("backend channel closed")]
    Closed,

    /// The message could not be delivered
    #[error("failed to deliver message to backend: {0}")]
    Send(String),
}

/// Console-level errors.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// A submitted statement was not acknowledged in time
    #[error("command timed out after {0} ms")]
    Timeout(u64),

    /// Outbound channel failure
    #[error("backend channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration file could not be parsed
    #[error("failed to read config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
