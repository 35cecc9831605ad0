//! Crate-wide error types, layered the way the lower levels are layered:
//! byte-source I/O errors wrap into core errors, which the CLI maps to exit
//! codes (see [`crate::cli`]).

use std::io;
use thiserror::Error;

/// Errors raised by a [`crate::source::ByteSource`] implementation.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("seek failed: {0}")]
    Seek(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),
}

/// Errors raised while decoding a varint from a patch stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VarIntError {
    #[error("varint underflow (truncated input)")]
    Underflow,
}

/// Top-level error for the diff/patch core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    VarInt(#[from] VarIntError),

    #[error("malformed patch stream: {0}")]
    MalformedPatch(String),

    #[error("allocation failure: {0}")]
    Alloc(String),
}

impl CoreError {
    /// Map to the CLI's exit-code taxonomy: seek failure, read failure,
    /// write failure, allocation failure, or a generic malformed-stream case.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::Source(SourceError::Seek(_)) => 6,
            CoreError::Source(SourceError::Read(_)) => 8,
            CoreError::Source(SourceError::Write(_)) => 9,
            CoreError::VarInt(VarIntError::Underflow) => 8,
            CoreError::MalformedPatch(_) => 8,
            CoreError::Alloc(_) => 10,
        }
    }
}
