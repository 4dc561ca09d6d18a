//! Rejection taxonomy for the authorization pipeline

use jsonwebtoken::errors::ErrorKind;

/// Why a request ended up unauthenticated.
///
/// Every variant produces the same forwarded request; the variants only exist
/// so the logs can say what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// No credential source yielded a token
    #[error("no token found")]
    NoTokenFound,

    /// Token is not three base64url segments carrying a JSON header and object payload
    #[error("invalid token structure: {0}")]
    InvalidTokenStructure(String),

    /// Payload `iss` differs from the configured issuer
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// Payload `token_use` is not `access`
    #[error("not an access token")]
    WrongTokenClass,

    /// Signature, algorithm, audience or validity window check failed
    #[error("verification failed: {0:?}")]
    SignatureOrExpiryFailure(ErrorKind),

    /// Configured roles claim is absent or empty
    #[error("missing roles claim '{0}'")]
    MissingRolesClaim(String),

    /// Configured subject claim is absent or not usable as a username
    #[error("missing subject claim '{0}'")]
    MissingSubjectClaim(String),
}

impl Rejection {
    /// Stable label for structured log fields
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoTokenFound => "no_token",
            Self::InvalidTokenStructure(_) => "invalid_structure",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::WrongTokenClass => "wrong_token_class",
            Self::SignatureOrExpiryFailure(_) => "signature_or_expiry",
            Self::MissingRolesClaim(_) => "missing_roles",
            Self::MissingSubjectClaim(_) => "missing_subject",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Rejection {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::SignatureOrExpiryFailure(err.into_kind())
    }
}

/// Result type for token validation
pub type Result<T> = std::result::Result<T, Rejection>;
