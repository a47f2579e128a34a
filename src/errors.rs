use std::fmt;

/// Errors raised while generating an inventory.
///
/// Every variant is fatal for the current invocation: the caller reports it on
/// stderr and exits non-zero without printing anything to stdout.
#[derive(Debug)]
pub enum InventoryError {
    /// A required environment variable is missing, empty, or malformed.
    Configuration(String),
    /// The database could not be reached or rejected the credentials.
    Connection(sqlx::Error),
    /// The connect attempt did not finish within the configured timeout.
    ConnectTimeout(std::time::Duration),
    /// The host query failed (missing tables, bad columns, ...).
    Query(sqlx::Error),
    /// The inventory violates the dynamic inventory contract.
    Malformed(String),
    /// The inventory could not be rendered as JSON.
    Serialization(serde_json::Error),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<InventoryError>,
        /// Additional context message.
        context: String,
    },
}

impl InventoryError {
    /// True for failures of the PostgreSQL data source (as opposed to local configuration).
    pub fn is_data_source(&self) -> bool {
        match self {
            InventoryError::Connection(_)
            | InventoryError::ConnectTimeout(_)
            | InventoryError::Query(_) => true,
            InventoryError::WithContext { source, .. } => source.is_data_source(),
            _ => false,
        }
    }

    /// True for missing or invalid configuration.
    pub fn is_configuration(&self) -> bool {
        match self {
            InventoryError::Configuration(_) => true,
            InventoryError::WithContext { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

impl fmt::Display for InventoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            InventoryError::Connection(e) => write!(f, "Database connection failed: {}", e),
            InventoryError::ConnectTimeout(after) => {
                write!(f, "Database connection timed out after {:?}", after)
            }
            InventoryError::Query(e) => write!(f, "Database query failed: {}", e),
            InventoryError::Malformed(msg) => write!(f, "Malformed inventory: {}", msg),
            InventoryError::Serialization(e) => write!(f, "Serialization error: {}", e),
            InventoryError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for InventoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InventoryError::Connection(e) | InventoryError::Query(e) => Some(e),
            InventoryError::Serialization(e) => Some(e),
            InventoryError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        InventoryError::Serialization(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `InventoryError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, InventoryError>;

    /// Add context lazily (only evaluated on error).
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, InventoryError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, InventoryError> {
    fn context(self, context: impl Into<String>) -> Result<T, InventoryError> {
        self.map_err(|e| InventoryError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, InventoryError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| InventoryError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_display() {
        let err: Result<(), InventoryError> =
            Err(InventoryError::Configuration("DB_PORT is empty".to_string()));
        let err = err.context("loading settings").unwrap_err();

        assert_eq!(
            err.to_string(),
            "loading settings: Configuration error: DB_PORT is empty"
        );
        assert!(err.is_configuration());
        assert!(!err.is_data_source());
    }

    #[test]
    fn test_data_source_classification() {
        let err = InventoryError::Query(sqlx::Error::RowNotFound);
        assert!(err.is_data_source());

        let wrapped: Result<(), InventoryError> = Err(err);
        let wrapped = wrapped
            .with_context(|| "fetching hosts".to_string())
            .unwrap_err();
        assert!(wrapped.is_data_source());
        assert!(std::error::Error::source(&wrapped).is_some());
    }

    #[test]
    fn test_timeout_is_data_source() {
        let err = InventoryError::ConnectTimeout(std::time::Duration::from_secs(3));
        assert!(err.is_data_source());
        assert!(err.to_string().contains("3s"));
    }
}
