//! Session error taxonomy.
//!
//! Collaborators (sources, backends, config) speak `anyhow::Result`. The session
//! controller maps those failures into `SessionError` at its boundary so callers can
//! tell a fatal acquisition failure from a recoverable inference failure. Only
//! `Inference` is recoverable inside a run.

use std::fmt::Display;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Device or file unavailable, or a read failure. Fatal to the run.
    #[error("acquisition failed: {0}")]
    Acquisition(String),

    /// Uploaded bytes are not a valid image. Fatal to the single-shot run.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Malformed frame reached the detector. The cycle is skipped.
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("session is already running")]
    AlreadyRunning,

    #[error("session is not running")]
    NotRunning,
}

impl SessionError {
    pub fn acquisition(err: impl Display) -> Self {
        Self::Acquisition(format!("{err:#}"))
    }

    pub fn decode(err: impl Display) -> Self {
        Self::Decode(format!("{err:#}"))
    }

    pub fn inference(err: impl Display) -> Self {
        Self::Inference(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_keep_anyhow_context_chain() {
        let err = anyhow::anyhow!("device busy").context("open /dev/video0");
        let mapped = SessionError::acquisition(&err);
        assert_eq!(
            mapped,
            SessionError::Acquisition("open /dev/video0: device busy".to_string())
        );
    }

    #[test]
    fn display_names_the_failure_kind() {
        assert_eq!(
            SessionError::inference("bad shape").to_string(),
            "inference failed: bad shape"
        );
        assert_eq!(
            SessionError::decode("not an image").to_string(),
            "decode failed: not an image"
        );
    }
}
