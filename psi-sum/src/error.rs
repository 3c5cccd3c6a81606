//! Error types for the PSI-Sum protocol.

use thiserror::Error;

/// Errors that can occur during PSI-Sum protocol execution.
///
/// Every error is fatal to the current run: there is no partial result and no
/// resume. A failed run must be restarted from setup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PsiSumError {
    /// An input violates a mathematical precondition.
    #[error("Domain error: {0}")]
    Domain(String),

    /// Modular inverse requested for non-coprime inputs.
    #[error("Value is not invertible modulo the given modulus")]
    NotInvertible,

    /// Key generation produced degenerate parameters.
    #[error("Key generation failed: {0}")]
    KeyGen(String),

    /// A randomized search did not succeed within its attempt cap.
    #[error("{operation} did not succeed after {attempts} attempts")]
    RetriesExhausted {
        operation: &'static str,
        attempts: usize,
    },

    /// A message received from the counterpart failed validation.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Input data was empty.
    #[error("Input data cannot be empty")]
    EmptyInput,

    /// The protocol configuration was rejected.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for PSI-Sum operations.
pub type Result<T> = std::result::Result<T, PsiSumError>;
