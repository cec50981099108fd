use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("No primary key: {0}")]
    NoPrimaryKey(String),

    /// `field` is empty when the class itself was the target, as in a
    /// hydrated search.
    #[error("{}", not_indexable(.field, .class))]
    NotAnAlgoliaEntity { field: String, class: String },

    #[error("Invalid primary key: {0}")]
    InvalidPrimaryKey(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Entity store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

fn not_indexable(field: &str, class: &str) -> String {
    if field.is_empty() {
        format!("`{}` is not recognized as an entity to index", class)
    } else {
        format!(
            "Tried to index `{}` relation which is a `{}` instance, which is not recognized as an entity to index",
            field, class
        )
    }
}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Json(e.to_string())
    }
}

impl From<base64::DecodeError> for SyncError {
    fn from(e: base64::DecodeError) -> Self {
        SyncError::InvalidPrimaryKey(e.to_string())
    }
}

impl SyncError {
    /// Local mapping or data problems. These are never retried: running the
    /// same entity through the pipeline again fails the same way.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SyncError::UnknownEntity(_)
                | SyncError::NoPrimaryKey(_)
                | SyncError::NotAnAlgoliaEntity { .. }
                | SyncError::InvalidPrimaryKey(_)
        )
    }
}
