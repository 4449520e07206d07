use std::fmt;

/// Engine-specific error types.
#[derive(Debug)]
pub enum EngineError {
    /// Required identity fields are missing or malformed; never retried.
    Validation(String),
    /// Database-related errors from the sqlx-backed store.
    Database(sqlx::Error),
    /// Any other failure from a store implementation.
    Storage(String),
    /// Resource not found error.
    NotFound(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<EngineError>,
        /// Additional context message.
        context: String,
    },
}

impl EngineError {
    /// Whether this error came out of the store contract.
    ///
    /// Callers must not interpret a storage error as "record does not exist";
    /// the record state is unknown and retry policy is theirs to decide.
    pub fn is_storage(&self) -> bool {
        match self {
            EngineError::Database(_) | EngineError::Storage(_) => true,
            EngineError::WithContext { source, .. } => source.is_storage(),
            _ => false,
        }
    }
}

impl fmt::Display for EngineError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "Validation error: {}", msg),
            EngineError::Database(e) => write!(f, "Database error: {}", e),
            EngineError::Storage(msg) => write!(f, "Storage error: {}", msg),
            EngineError::NotFound(msg) => write!(f, "Not found: {}", msg),
            EngineError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Database(e) => Some(e),
            EngineError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    /// Converts a `sqlx::Error` into an `EngineError`.
    fn from(err: sqlx::Error) -> Self {
        EngineError::Database(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `EngineError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, EngineError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, EngineError> {
    fn context(self, context: impl Into<String>) -> Result<T, EngineError> {
        self.map_err(|e| EngineError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| EngineError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, EngineError> {
        self.map_err(|e| EngineError::WithContext {
            source: Box::new(EngineError::Database(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| EngineError::WithContext {
            source: Box::new(EngineError::Database(e)),
            context: f(),
        })
    }
}
