/*!
 * Error Types
 * Finalization error handling with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use thiserror::Error;

/// Boxed error carried by a failed callback
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Finalization errors
#[derive(Error, Debug, Diagnostic)]
pub enum FinalizeError {
    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(finalize::invalid_configuration),
        help("An entry without an owner must carry an exit priority, otherwise nothing can ever trigger it.")
    )]
    InvalidConfiguration(String),

    #[error("Callback {callback} failed: {source}")]
    #[diagnostic(
        code(finalize::callback_failure),
        help("The registered callback returned an error or panicked. Inspect the source error.")
    )]
    CallbackFailure {
        callback: String,
        #[source]
        source: BoxError,
    },

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(finalize::io_error),
        help("Filesystem operation failed. Check permissions and free space in the temp directory.")
    )]
    Io(String),

    #[error("Process registry unavailable")]
    #[diagnostic(
        code(finalize::process_unavailable),
        help("The current process handle could not be obtained; process-wide state may already be torn down.")
    )]
    ProcessUnavailable,
}

impl FinalizeError {
    /// Wrap a callback error under the callback's name
    pub fn callback(callback: impl Into<String>, source: impl Into<BoxError>) -> Self {
        FinalizeError::CallbackFailure {
            callback: callback.into(),
            source: source.into(),
        }
    }

    /// Build a callback failure from a caught panic payload
    pub fn from_panic(callback: impl Into<String>, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "callback panicked".to_string()
        };
        Self::callback(callback, format!("panic: {}", message))
    }

    #[inline]
    pub fn is_callback_failure(&self) -> bool {
        matches!(self, FinalizeError::CallbackFailure { .. })
    }
}

impl From<std::io::Error> for FinalizeError {
    fn from(err: std::io::Error) -> Self {
        FinalizeError::Io(err.to_string())
    }
}

/// Common result type for finalization operations
pub type FinalizeResult<T> = Result<T, FinalizeError>;
