//! Runtime error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An expression failed to evaluate against the current scope.
    #[error("evaluation error: {message}")]
    Eval { message: String },

    /// Evaluation failure wrapped with the binding key and literal source
    /// text, raised at detection time.
    #[error("binding `{key}` (`{source}`): {inner}")]
    Binding {
        key: String,
        source: String,
        #[source]
        inner: Box<RuntimeError>,
    },

    /// An operation that requires a live reference hit a destroyed or
    /// unbound one.
    #[error("invalid lifecycle state: {message}")]
    Lifecycle { message: String },

    /// Compile failures surfacing through runtime entry points.
    #[error(transparent)]
    Compile(#[from] trellis_compiler::CompileError),
}

impl RuntimeError {
    pub fn eval(message: impl Into<String>) -> Self {
        RuntimeError::Eval {
            message: message.into(),
        }
    }

    pub fn lifecycle(message: impl Into<String>) -> Self {
        RuntimeError::Lifecycle {
            message: message.into(),
        }
    }

    pub fn in_binding(self, key: &str, source: &str) -> Self {
        RuntimeError::Binding {
            key: key.to_string(),
            source: source.to_string(),
            inner: Box::new(self),
        }
    }
}
