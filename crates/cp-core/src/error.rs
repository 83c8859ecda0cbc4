use thiserror::Error;

/// Failure taxonomy of the sync core.
///
/// Nothing here is fatal to the process: every variant degrades to a user
/// notification and the session either keeps running or self-heals through
/// the reconnect path.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network send/receive or file download/write failure. Reported, never
    /// retried automatically; the next organic event is the only subsequent
    /// opportunity.
    #[error("transient i/o failure: {0}")]
    TransientIo(String),

    /// A file failed the user-configured upload policy. Not an error in the
    /// pipeline sense: the file is skipped individually and the batch
    /// continues.
    #[error("upload policy rejected `{name}`: {reason}")]
    PolicyRejection { name: String, reason: String },

    /// Unknown message type or malformed JSON. Logged and dropped, never
    /// terminates the session.
    #[error("protocol anomaly: {0}")]
    ProtocolAnomaly(String),

    /// The transport is not in the Connected state. Sends fail fast; there
    /// is no outbound queue.
    #[error("connection lost")]
    ConnectionLoss,

    /// OS clipboard write during remote-apply failed. The feedback
    /// suppressor must be disarmed immediately when this is raised.
    #[error("clipboard write-back failed: {0}")]
    WriteBackFailure(String),
}
