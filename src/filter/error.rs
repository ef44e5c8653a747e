use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("'{value}' is not a valid id.")]
    InvalidId { field: &'static str, value: String },

    #[error("'{value}' is not a valid boolean.")]
    InvalidFlag { field: &'static str, value: String },
}

impl FilterError {
    /// Query parameter the error belongs to
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::InvalidId { field, .. } => field,
            FilterError::InvalidFlag { field, .. } => field,
        }
    }
}
