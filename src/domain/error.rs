use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("the plaque location wasn't specified")]
    MissingLocation,
    #[error("the location ({lat}, {lng}) is outside the valid coordinate range")]
    InvalidLocation { lat: f64, lng: f64 },
    #[error("the image for the plaque was not specified")]
    MissingImage,
    #[error("malformed timestamp `{input}`")]
    MalformedTimestamp { input: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// True for errors caused by caller input rather than system state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingLocation
                | Self::InvalidLocation { .. }
                | Self::MissingImage
                | Self::MalformedTimestamp { .. }
                | Self::Validation { .. }
        )
    }
}
