//! Fixtures for tests: a fixed RSA key pair, ID-token signing helpers and
//! static providers that never touch the network.
#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use callable_security::SecretString;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::claims_error::ClaimsError;
use crate::jwks::{rs256_header, verify_signature};
use crate::service_account::{ServiceAccountCredentials, TokenError};
use crate::traits::{AccessTokenProvider, KeyProvider};

/// Key id under which the fixture key is published
pub const TEST_KID: &str = "test-key-1";

/// PKCS#8 private key of the fixture pair
pub const TEST_RSA_PEM: &str = include_str!("../tests/fixtures/test_rsa_key.pem");

/// RSA modulus of the fixture pair (base64url)
pub const TEST_JWK_N: &str = "6ZBxpz17oKpQVd5dtF7ijOdX4In-3oDMDEWDA-TSjpFQwVV8n6a1Lc-VR-WgfLwJ1ECUebyGEaOJVeZixqXy9xssIo2mUE84CHd1Oke7GrIz5DytNMzFGGqdZW_5ht7agbasJx-T62l9mdhNraApZiZ_Ju3wtmUnsudFh2uoEgQIo81BQzR6j1YViEPQP6C9IrPRsiVFIq0hOQopoke6YQaR9iQlsi7zZZtySCVu5yS1MNuCZaIji75lBOZ3PQ0gWcoPdz3wVamYXfItQZ99lP1Uq8ObVyglbxW9fyVR_YukvzmUc9TnpcQlyNVnaqovbigA4htNZR_RfWs2Dk8p9w";

/// RSA public exponent of the fixture pair (base64url)
pub const TEST_JWK_E: &str = "AQAB";

pub const SERVICE_ACCOUNT_EMAIL: &str = "svc@demo-project.iam.gserviceaccount.com";

/// JWKS document publishing the fixture key under [`TEST_KID`]
#[must_use]
pub fn jwks_json() -> String {
    json!({
        "keys": [{
            "kty": "RSA",
            "kid": TEST_KID,
            "use": "sig",
            "alg": "RS256",
            "n": TEST_JWK_N,
            "e": TEST_JWK_E,
        }]
    })
    .to_string()
}

#[must_use]
pub fn decoding_key() -> DecodingKey {
    DecodingKey::from_rsa_components(TEST_JWK_N, TEST_JWK_E).expect("fixture JWK is valid")
}

/// Claims of a currently valid ID token for `uid` in `project_id`
#[must_use]
pub fn id_token_claims(project_id: &str, uid: &str) -> Value {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    json!({
        "iss": format!("https://securetoken.google.com/{project_id}"),
        "aud": project_id,
        "sub": uid,
        "user_id": uid,
        "iat": now - 10,
        "exp": now + 3600,
    })
}

/// Sign `claims` with the fixture key under [`TEST_KID`]
#[must_use]
pub fn sign_id_token(claims: &Value) -> String {
    sign_id_token_with_kid(TEST_KID, claims)
}

#[must_use]
pub fn sign_id_token_with_kid(kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_owned());
    let key = EncodingKey::from_rsa_pem(TEST_RSA_PEM.as_bytes()).expect("fixture PEM is valid");
    jsonwebtoken::encode(&header, claims, &key).expect("signing with fixture key")
}

/// Service-account credentials backed by the fixture key
#[must_use]
pub fn service_account_credentials() -> ServiceAccountCredentials {
    let doc = json!({
        "type": "service_account",
        "project_id": "demo-project",
        "private_key_id": TEST_KID,
        "private_key": TEST_RSA_PEM,
        "client_email": SERVICE_ACCOUNT_EMAIL,
    });
    ServiceAccountCredentials::from_json(&doc.to_string()).expect("fixture credentials are valid")
}

/// Key provider holding a fixed key set
pub struct StaticKeyProvider {
    keys: HashMap<String, DecodingKey>,
}

impl StaticKeyProvider {
    /// Provider publishing only the fixture key
    #[must_use]
    pub fn new() -> Self {
        let mut keys = HashMap::new();
        keys.insert(TEST_KID.to_owned(), decoding_key());
        Self { keys }
    }
}

impl Default for StaticKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn validate_and_decode(&self, token: &str) -> Result<(Header, Value), ClaimsError> {
        let (header, kid) = rs256_header(token)?;
        let key = self
            .keys
            .get(&kid)
            .ok_or(ClaimsError::UnknownKeyId(kid))?;
        let claims = verify_signature(token, key)?;
        Ok((header, claims))
    }
}

/// Access-token provider returning a fixed token and counting invalidations
pub struct StaticAccessToken {
    token: String,
    invalidations: AtomicUsize,
}

impl StaticAccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            invalidations: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessTokenProvider for StaticAccessToken {
    fn access_token(&self) -> Result<SecretString, TokenError> {
        Ok(SecretString::new(self.token.clone()))
    }

    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}
