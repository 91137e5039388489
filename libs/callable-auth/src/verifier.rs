use std::sync::Arc;

use async_trait::async_trait;
use callable_security::AuthInfo;
use serde_json::Value;

use crate::claims_error::ClaimsError;
use crate::traits::{KeyProvider, TokenValidator};
use crate::validation::{ValidationConfig, validate_claims};

/// Verifies caller ID tokens: signature through a [`KeyProvider`], then the
/// project-bound claim checks.
#[derive(Clone)]
pub struct IdTokenVerifier {
    keys: Arc<dyn KeyProvider>,
    validation: ValidationConfig,
}

impl IdTokenVerifier {
    #[must_use]
    pub fn new(keys: Arc<dyn KeyProvider>, validation: ValidationConfig) -> Self {
        Self { keys, validation }
    }

    #[must_use]
    pub fn key_provider(&self) -> Arc<dyn KeyProvider> {
        Arc::clone(&self.keys)
    }
}

#[async_trait]
impl TokenValidator for IdTokenVerifier {
    async fn validate(&self, token: &str) -> Result<AuthInfo, ClaimsError> {
        let (_header, raw) = self.keys.validate_and_decode(token).await?;

        let Value::Object(claims) = raw else {
            return Err(ClaimsError::DecodeFailed("claims are not a JSON object".into()));
        };

        let uid = validate_claims(&claims, &self.validation)?.to_owned();
        Ok(AuthInfo::new(uid, claims))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::testing::{self, StaticKeyProvider};
    use crate::validation::DEFAULT_ISSUER_PREFIX;

    fn verifier() -> IdTokenVerifier {
        IdTokenVerifier::new(
            Arc::new(StaticKeyProvider::new()),
            ValidationConfig::for_project("demo-project", DEFAULT_ISSUER_PREFIX, 60),
        )
    }

    #[tokio::test]
    async fn valid_token_yields_uid_and_claims() {
        let mut claims = testing::id_token_claims("demo-project", "uid-42");
        claims["email"] = "a@x.com".into();
        let token = testing::sign_id_token(&claims);

        let info = verifier().validate(&token).await.unwrap();
        assert_eq!(info.uid(), "uid-42");
        assert_eq!(info.claim_str("email"), Some("a@x.com"));
    }

    #[tokio::test]
    async fn token_for_other_project_is_rejected() {
        let token = testing::sign_id_token(&testing::id_token_claims("other-project", "uid-42"));
        let err = verifier().validate(&token).await.unwrap_err();
        assert!(matches!(err, ClaimsError::InvalidIssuer { .. }));
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let err = verifier().validate("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, ClaimsError::DecodeFailed(_)));
    }

    #[tokio::test]
    async fn tampered_payload_fails_signature_check() {
        let token = testing::sign_id_token(&testing::id_token_claims("demo-project", "uid-42"));
        let forged = testing::sign_id_token(&testing::id_token_claims("demo-project", "admin"));

        // Keep the original signature, swap in the forged payload.
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        let err = verifier().validate(&tampered).await.unwrap_err();
        assert!(matches!(err, ClaimsError::DecodeFailed(_)));
    }
}
