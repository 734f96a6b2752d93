use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("package '{id}' was not found in the catalog")]
    NotFound { id: String },

    #[error("no version of '{id}' satisfies {detail}")]
    Unsatisfiable { id: String, detail: String },

    #[error("failed to load catalog for '{id}': {message}")]
    Catalog { id: String, message: String },
}

impl ResolveError {
    pub fn id(&self) -> &str {
        match self {
            Self::NotFound { id } | Self::Unsatisfiable { id, .. } | Self::Catalog { id, .. } => id,
        }
    }
}
