use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, GestureFxError>;

/// A Control Change could not be delivered. Never fatal: callers log it and
/// carry on with the next write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("MIDI send failed: {0}")]
    Send(String),
}

#[derive(Debug, Error)]
pub enum GestureFxError {
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("MIDI init failed: {0}")]
    MidiInit(String),

    #[error("MIDI connect failed: {0}")]
    MidiConnect(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl GestureFxError {
    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        GestureFxError::InvalidConfig(msg.into())
    }
}
