//! Structured error handling and exit codes.

use serde::Serialize;

use crate::actions::GenerateError;
use crate::collisions::FinderError;
use crate::hashing::HashError;
use crate::manifest::ManifestError;

/// Exit codes for the rustsums application.
///
/// - 0: Success (command completed, everything matched)
/// - 1: Failure (mismatch, fatal error, or existing manifest)
/// - 2: Usage error (bad arguments or unknown algorithm)
/// - 3: Partial success (report produced but some files could not be read)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The command completed normally.
    Success = 0,
    /// Verification failed or an unexpected error occurred.
    Failure = 1,
    /// The command line or an algorithm name was invalid.
    Usage = 2,
    /// Completed with some per-file errors.
    PartialSuccess = 3,
    /// Interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "RS000",
            Self::Failure => "RS001",
            Self::Usage => "RS002",
            Self::PartialSuccess => "RS003",
            Self::Interrupted => "RS130",
        }
    }

    /// Pick the exit code for an error that ended a command.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if matches!(cause.downcast_ref::<FinderError>(), Some(FinderError::Interrupted)) {
                return Self::Interrupted;
            }
            // Transparent wrappers hide the inner error from the chain.
            let hash_error = match (
                cause.downcast_ref::<ManifestError>(),
                cause.downcast_ref::<GenerateError>(),
            ) {
                (Some(ManifestError::UnknownAlgorithm(e)), _) => Some(e),
                (_, Some(GenerateError::Hash(e))) => Some(e),
                _ => cause.downcast_ref::<HashError>(),
            };
            match hash_error {
                Some(HashError::Interrupted) => return Self::Interrupted,
                Some(e) if e.is_algorithm_error() => return Self::Usage,
                _ => {}
            }
        }
        Self::Failure
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "RS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
