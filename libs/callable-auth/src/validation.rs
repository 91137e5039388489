use crate::claims_error::ClaimsError;
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Issuer prefix of Firebase ID tokens; the project id is appended.
pub const DEFAULT_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Longest `sub` accepted, matching the identity service's uid limit.
const MAX_UID_LEN: usize = 128;

/// Expected values for ID token claims of one project
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Exact issuer, `<issuer_prefix><project_id>`
    pub issuer: String,

    /// Exact audience, the project id
    pub audience: String,

    /// Leeway in seconds for time-based validations (exp, iat)
    pub leeway_seconds: i64,
}

impl ValidationConfig {
    #[must_use]
    pub fn for_project(project_id: &str, issuer_prefix: &str, leeway_seconds: i64) -> Self {
        Self {
            issuer: format!("{issuer_prefix}{project_id}"),
            audience: project_id.to_owned(),
            leeway_seconds,
        }
    }
}

/// Check issuer, audience, expiry, issue time and subject.
///
/// Returns the subject (the caller's uid).
///
/// # Errors
/// Returns `ClaimsError` for the first failed check.
pub fn validate_claims<'a>(
    claims: &'a Map<String, Value>,
    config: &ValidationConfig,
) -> Result<&'a str, ClaimsError> {
    let now = OffsetDateTime::now_utc();
    validate_claims_at(claims, config, now)
}

pub(crate) fn validate_claims_at<'a>(
    claims: &'a Map<String, Value>,
    config: &ValidationConfig,
    now: OffsetDateTime,
) -> Result<&'a str, ClaimsError> {
    let leeway = time::Duration::seconds(config.leeway_seconds);

    // 1. Issuer
    let issuer = extract_string(claims.get("iss"), "iss")?;
    if issuer != config.issuer {
        return Err(ClaimsError::InvalidIssuer {
            expected: config.issuer.clone(),
            actual: issuer.to_owned(),
        });
    }

    // 2. Audience (string or array, one must match)
    let audiences = claims.get("aud").map(extract_audiences).unwrap_or_default();
    if !audiences.iter().any(|aud| *aud == config.audience) {
        return Err(ClaimsError::InvalidAudience {
            expected: config.audience.clone(),
            actual: audiences,
        });
    }

    // 3. Expiration
    let exp = claims
        .get("exp")
        .ok_or_else(|| ClaimsError::MissingClaim("exp".into()))
        .and_then(|v| parse_timestamp(v, "exp"))?;
    if now > exp + leeway {
        return Err(ClaimsError::Expired);
    }

    // 4. Issued-at must not be in the future
    if let Some(iat) = claims.get("iat") {
        let iat = parse_timestamp(iat, "iat")?;
        if now < iat - leeway {
            return Err(ClaimsError::IssuedInFuture);
        }
    }

    // 5. Subject
    let sub = extract_string(claims.get("sub"), "sub")?;
    if sub.is_empty() || sub.len() > MAX_UID_LEN {
        return Err(ClaimsError::InvalidClaimFormat {
            field: "sub".to_owned(),
            reason: format!("must be 1..={MAX_UID_LEN} characters"),
        });
    }

    Ok(sub)
}

/// Parse a unix timestamp (seconds) claim.
///
/// # Errors
/// Returns `ClaimsError::InvalidClaimFormat` if the value is not a valid unix timestamp.
pub fn parse_timestamp(value: &Value, field_name: &str) -> Result<OffsetDateTime, ClaimsError> {
    let ts = value
        .as_i64()
        .ok_or_else(|| ClaimsError::InvalidClaimFormat {
            field: field_name.to_owned(),
            reason: "must be a number (unix timestamp)".to_owned(),
        })?;

    OffsetDateTime::from_unix_timestamp(ts).map_err(|_| ClaimsError::InvalidClaimFormat {
        field: field_name.to_owned(),
        reason: "invalid unix timestamp".to_owned(),
    })
}

fn extract_string<'a>(value: Option<&'a Value>, field_name: &str) -> Result<&'a str, ClaimsError> {
    value
        .and_then(Value::as_str)
        .ok_or_else(|| ClaimsError::MissingClaim(field_name.to_owned()))
}

/// Audience claim as a list (handles both string and array)
#[must_use]
pub fn extract_audiences(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(arr) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToOwned::to_owned))
            .collect(),
        _ => vec![],
    }
}
