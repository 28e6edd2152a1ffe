#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("RangeError: {message}")]
    RangeError { message: String },

    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("SyntaxError: {message}")]
    SyntaxError { message: String },
}

impl RuntimeError {
    pub fn message(&self) -> String {
        match self {
            RuntimeError::RangeError { message } => message.clone(),
            RuntimeError::TypeError { message } => message.clone(),
            RuntimeError::SyntaxError { message } => message.clone(),
        }
    }
}

// Macros that construct errors at the raise site. Using macros (rather
// than functions) keeps call sites terse and lets the message be a
// format string.
#[macro_export]
macro_rules! raise_range_error {
    ($($arg:tt)*) => {
        $crate::RuntimeError::RangeError {
            message: format!($($arg)*),
        }
    };
}

#[macro_export]
macro_rules! raise_type_error {
    ($($arg:tt)*) => {
        $crate::RuntimeError::TypeError {
            message: format!($($arg)*),
        }
    };
}

#[macro_export]
macro_rules! raise_syntax_error {
    ($($arg:tt)*) => {
        $crate::RuntimeError::SyntaxError {
            message: format!($($arg)*),
        }
    };
}
