
use thiserror::Error;

use crate::token::TokenError;

/// Faults surfaced by the two HTTP functions. Every variant maps onto the
/// status code the caller receives.
#[derive(Debug, Error)]
pub enum SwishError {
    #[error("method {0} is not allowed")]
    MethodNotAllowed(String),
    #[error("invalid credentials")]
    Authentication,
    #[error("{0}")]
    Format(String),
    #[error("failed to decipher: {0}")]
    Decode(#[from] TokenError),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl SwishError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed(_) => 405,
            Self::Authentication => 401,
            Self::Format(_) | Self::Decode(_) => 400,
            Self::Upstream(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Text safe to hand back to the caller. Internal faults are not described.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<anyhow::Error> for SwishError {
    fn from(error: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", error))
    }
}
