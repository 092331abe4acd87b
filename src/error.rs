//! Error types for the MSC emulator

use thiserror::Error;

/// MSC emulator errors
///
/// Unsupported SCSI opcodes and write rejections are *protocol outcomes*
/// (negative transfer codes reported back to the host), not errors. These
/// variants cover the cases where the emulator itself cannot proceed.
#[derive(Debug, Error)]
pub enum MscError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stack initialization failed: {0}")]
    Init(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("SCSI error: {0}")]
    Scsi(String),
}

/// Result type for MSC emulator operations
pub type MscResult<T> = Result<T, MscError>;
