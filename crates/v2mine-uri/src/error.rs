use thiserror::Error;
use v2mine_core::Scheme;

/// Reasons a scraped entry cannot be turned into a [`crate::ParsedConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("entry is empty")]
    Empty,

    #[error("unsupported scheme in entry '{entry}'")]
    UnsupportedScheme { entry: String },

    #[error("{scheme} link has no host")]
    MissingHost { scheme: Scheme },

    #[error("{scheme} link has no port")]
    MissingPort { scheme: Scheme },

    #[error("{scheme} link has an invalid port: {value}")]
    InvalidPort { scheme: Scheme, value: String },

    #[error("{scheme} link has no user id or password")]
    MissingIdentifier { scheme: Scheme },

    #[error("malformed {scheme} link: {reason}")]
    Encoding { scheme: Scheme, reason: String },
}

impl ParseError {
    pub(crate) fn encoding(scheme: Scheme, reason: impl std::fmt::Display) -> Self {
        Self::Encoding {
            scheme,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
