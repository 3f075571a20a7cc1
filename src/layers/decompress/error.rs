use std::io;

use thiserror::Error;

use super::ContentEncoding;

#[derive(Debug, Error)]
pub enum DecompressError {
    #[error("{encoding}| {source}")]
    Codec {
        encoding: ContentEncoding,
        #[source]
        source: io::Error,
    },
    #[error("unknown| {0}")]
    Unknown(String),
}

impl DecompressError {
    pub(super) fn codec(encoding: ContentEncoding) -> impl FnOnce(io::Error) -> Self {
        move |source| DecompressError::Codec { encoding, source }
    }

    pub fn is_unknown_encoding(&self) -> bool {
        matches!(self, DecompressError::Unknown(_))
    }

    /// Encoding whose decoder failed.
    pub fn encoding(&self) -> Option<ContentEncoding> {
        match self {
            DecompressError::Codec { encoding, .. } => Some(*encoding),
            DecompressError::Unknown(_) => None,
        }
    }
}
