use thiserror::Error;

/// Errors that can occur while verifying a caller's ID token
#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("Invalid issuer: expected {expected}, got {actual}")]
    InvalidIssuer { expected: String, actual: String },

    #[error("Invalid audience: expected {expected}, got {actual:?}")]
    InvalidAudience {
        expected: String,
        actual: Vec<String>,
    },

    #[error("Token expired")]
    Expired,

    #[error("Token issued in the future")]
    IssuedInFuture,

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Invalid claim format: {field} - {reason}")]
    InvalidClaimFormat { field: String, reason: String },

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("JWT decode failed: {0}")]
    DecodeFailed(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    #[error("Unknown key ID: {0}")]
    UnknownKeyId(String),
}

impl ClaimsError {
    /// Whether the failure is caused by our side (key distribution) rather
    /// than by the token presented.
    #[must_use]
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::JwksFetchFailed(_))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn issuer_mismatch_renders_both_sides() {
        let e = ClaimsError::InvalidIssuer {
            expected: "https://securetoken.google.com/p".into(),
            actual: "https://evil".into(),
        };
        assert_eq!(
            e.to_string(),
            "Invalid issuer: expected https://securetoken.google.com/p, got https://evil"
        );
    }

    #[test]
    fn only_jwks_failures_are_provider_failures() {
        assert!(ClaimsError::JwksFetchFailed("timeout".into()).is_provider_failure());
        assert!(!ClaimsError::Expired.is_provider_failure());
        assert!(!ClaimsError::UnknownKeyId("k".into()).is_provider_failure());
    }
}
