//! Error types for method-wrappers.

use thiserror::Error;

/// Main error type for all wrapper operations.
///
/// Registry errors (`MethodNotFound`, `NoWrappersInstalled`,
/// `HandlerNotInstalled`, `CallbackUnsupported`) are returned synchronously by
/// the call that broke the contract. Call-time errors travel through the
/// composed chain unchanged.
///
/// The type is `Clone` so a single readiness failure can be delivered to every
/// call waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapError {
    /// Tried to wrap a method the target does not expose.
    #[error("Method '{method}' does not exist on given target, so it cannot be wrapped.")]
    MethodNotFound { method: String },

    /// Uninstall on a target that never had a wrapper installed.
    #[error("No wrapper methods installed, so no methods can be uninstalled.")]
    NoWrappersInstalled,

    /// Uninstall of a handler that is not registered for the method.
    #[error("Wrapper method for '{method}' not installed")]
    HandlerNotInstalled { method: String },

    /// Callback-style call on a method listed in the exemption table.
    #[error("Method '{method}' does not support callback-style calls")]
    CallbackUnsupported { method: String },

    /// Invalid wrapper configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Failure raised by an original method or a handler.
    #[error("Method '{method}' failed: {message}")]
    Method { method: String, message: String },

    /// The readiness collaborator reported an error instead of readiness.
    #[error("Target not ready: {0}")]
    NotReady(String),

    /// A positional argument could not be decoded.
    #[error("Invalid argument {index}: {message}")]
    InvalidArgument { index: usize, message: String },

    /// A callback-style call's task did not finish: the runtime dropped it, or
    /// the callback panicked. The call's own result is lost in both cases.
    #[error("Call cancelled")]
    Cancelled,

    /// A callback-style call was made outside a tokio runtime.
    #[error("No tokio runtime available for callback-style call")]
    NoRuntime,
}

impl WrapError {
    /// Shorthand for a method failure.
    pub fn method(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Method {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors raised by `install`/`uninstall` contract checks.
    pub fn is_registry_error(&self) -> bool {
        matches!(
            self,
            Self::MethodNotFound { .. }
                | Self::NoWrappersInstalled
                | Self::HandlerNotInstalled { .. }
                | Self::CallbackUnsupported { .. }
                | Self::NoRuntime
        )
    }
}

/// Result type alias using WrapError.
pub type Result<T> = std::result::Result<T, WrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = WrapError::MethodNotFound {
            method: "put".into(),
        };
        assert_eq!(
            err.to_string(),
            "Method 'put' does not exist on given target, so it cannot be wrapped."
        );
        assert!(WrapError::NoWrappersInstalled
            .to_string()
            .contains("No wrapper methods installed"));
        assert_eq!(
            WrapError::HandlerNotInstalled {
                method: "get".into()
            }
            .to_string(),
            "Wrapper method for 'get' not installed"
        );
    }

    #[test]
    fn test_registry_classification() {
        assert!(WrapError::NoWrappersInstalled.is_registry_error());
        assert!(!WrapError::NotReady("boom".into()).is_registry_error());
        assert!(!WrapError::method("get", "missing").is_registry_error());
    }
}
