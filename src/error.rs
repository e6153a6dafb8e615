use crate::store::StoreKey;

// ============================================================================
// Data Layer Errors
// ============================================================================
//
// Primary-store operations surface these to the caller. The sync engine
// catches them and logs instead (see sync::engine).
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("No database route found for entity: {0}")]
    UnroutedEntity(String),

    #[error("No model attached for entity '{entity}' in store '{store}'")]
    UnattachedModel { store: StoreKey, entity: String },

    #[error("Store '{0}' is not connected")]
    NotConnected(StoreKey),

    #[error("Failed to connect to store '{store}': {message}")]
    Connection { store: StoreKey, message: String },

    #[error("Validation failed for {entity}: {message}")]
    Validation { entity: String, message: String },

    #[error("{entity} already exists ({field} must be unique)")]
    Conflict { entity: String, field: String },

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Document store error: {0}")]
    Document(String),

    #[error("Invalid document path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Model for entity '{0}' is not of the requested type")]
    ModelMismatch(String),

    #[error("Model for entity '{entity}' does not support {operation}")]
    Unsupported { entity: String, operation: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn validation(entity: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            entity: entity.to_string(),
            message: message.into(),
        }
    }

    pub fn missing_field(entity: &str, field: &str) -> Self {
        Self::validation(entity, format!("missing required field '{field}'"))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DbError::Validation { .. })
    }

    /// Maps constraint violations raised by PostgreSQL onto the domain
    /// taxonomy. `unique_field` names the column reported on a 23505.
    pub fn from_insert(entity: &str, unique_field: &str, err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.code().as_deref() {
                Some("23505") => {
                    return DbError::Conflict {
                        entity: entity.to_string(),
                        field: unique_field.to_string(),
                    };
                }
                Some("23502") => {
                    return DbError::validation(entity, db_err.message().to_string());
                }
                Some("23503") => {
                    return DbError::validation(entity, format!("referenced row missing: {}", db_err.message()));
                }
                _ => {}
            }
        }
        DbError::Query(err)
    }
}

impl From<reqwest::Error> for DbError {
    fn from(err: reqwest::Error) -> Self {
        DbError::Document(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Document(format!("malformed payload: {err}"))
    }
}
