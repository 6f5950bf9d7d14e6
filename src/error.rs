//! Error types for the emulator.

use thiserror::Error;

/// Errors that can occur when decoding wire packets.
///
/// These are always recoverable: the offending datagram is dropped and the
/// server loop continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes were supplied than the structure's minimum size
    #[error("Truncated input: expected at least {expected} bytes, got {actual}")]
    TruncatedInput { expected: usize, actual: usize },

    /// A declared length would read past the end of the input
    #[error("Malformed length: declared {declared} bytes, only {remaining} remaining")]
    MalformedLength { declared: usize, remaining: usize },
}

/// Errors raised by the parameter registry.
///
/// Surfaced to the requester as a protocol-level failure acknowledgment,
/// never crashes the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Supplied value length does not match the key's wire length
    #[error("Key {key:#06x}: value length {actual} does not match wire length {expected}")]
    InvalidLength {
        key: u16,
        expected: usize,
        actual: usize,
    },

    /// Key is outside the supported registry
    #[error("Unsupported parameter key {0:#06x}")]
    Unsupported(u16),
}

/// Worker-level errors.
///
/// A transport error is fatal for the affected worker only; the other worker
/// is unaffected.
#[derive(Error, Debug)]
pub enum EmuError {
    #[error("I/O operation failed")]
    Io(#[from] std::io::Error),
}
