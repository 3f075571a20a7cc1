use std::{io, sync::Arc};

use thiserror::Error;

use crate::{layers::decompress::error::DecompressError, stream::Capabilities};

#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("invalid argument| missing capabilities {0:?}")]
    InvalidArgument(Capabilities),
    #[error("io| {0}")]
    Io(Arc<io::Error>),
    #[error("write after end")]
    WriteAfterEnd,
    #[error("destroyed")]
    Destroyed,
    #[error("decompress| {0}")]
    Decompress(Arc<DecompressError>),
    #[error("protocol| {0}")]
    Protocol(String),
}

impl StreamError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, StreamError::InvalidArgument(_))
    }
}

impl From<io::Error> for StreamError {
    fn from(e: io::Error) -> Self {
        StreamError::Io(Arc::new(e))
    }
}

impl From<DecompressError> for StreamError {
    fn from(e: DecompressError) -> Self {
        StreamError::Decompress(Arc::new(e))
    }
}

// Shared payloads compare by identity first, then by rendered message.
impl PartialEq for StreamError {
    fn eq(&self, other: &Self) -> bool {
        use StreamError::*;
        match (self, other) {
            (InvalidArgument(a), InvalidArgument(b)) => a == b,
            (Io(a), Io(b)) => {
                Arc::ptr_eq(a, b) || (a.kind() == b.kind() && a.to_string() == b.to_string())
            }
            (WriteAfterEnd, WriteAfterEnd) | (Destroyed, Destroyed) => true,
            (Decompress(a), Decompress(b)) => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            (Protocol(a), Protocol(b)) => a == b,
            _ => false,
        }
    }
}
