//! Typed failures of the instruction pipeline.

use thiserror::Error;

/// Errors raised while turning an instruction into an executable command.
///
/// Execution itself never surfaces these to the caller: the pipeline folds
/// them into a failed `CommandResult`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// No catalog pattern matched the instruction.
    #[error("Unrecognized instruction: '{text}'")]
    Unrecognized { text: String },

    /// The instruction matched but its parameters are not usable.
    #[error("{message}")]
    Validation {
        message: String,
        missing: Vec<String>,
        invalid: Vec<String>,
    },

    /// A parsed command name has no command kind.
    #[error("No command kind mapped for '{name}'")]
    UnmappedCommand { name: String },

    /// The backend adapter has no capability for this kind.
    #[error("Unsupported command kind: {kind}")]
    UnsupportedKind { kind: String },

    /// A validation, transform or condition hook failed.
    #[error("{hook} hook failed: {message}")]
    HookFailed { hook: &'static str, message: String },

    /// A transport request could not be understood.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}
