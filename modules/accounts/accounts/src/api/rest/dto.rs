use axum::Json;
use axum::extract::{FromRequest, Request};
use callable_errors::CallableError;
use callable_security::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use accounts_sdk::NewAccount;

/// Request envelope of a callable: `{"data": ...}`
#[derive(Debug, Deserialize)]
pub struct CallRequest<T> {
    pub data: T,
}

/// Success envelope of a callable: `{"result": ...}`
#[derive(Debug, Serialize)]
pub struct CallResponse<T> {
    pub result: T,
}

impl<T> CallResponse<T> {
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

/// Payload of `registerUser`.
///
/// Fields are optional here so that a missing field is reported by the
/// service after authorization, not by the JSON parser before it.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterUserData {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
}

impl RegisterUserData {
    #[must_use]
    pub fn into_new_account(self) -> NewAccount {
        NewAccount {
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_else(|| SecretString::new(String::new())),
        }
    }
}

/// Payload of `unregisterUser`
#[derive(Debug, Default, Deserialize)]
pub struct UnregisterUserData {
    #[serde(default)]
    pub uid: Option<String>,
}

/// Extractor for the `data` member of a callable request.
///
/// Any body the JSON extractor rejects (wrong content type, syntax error,
/// missing `data`, wrong field types) becomes `invalid-argument`.
pub struct CallBody<T>(pub T);

impl<S, T> FromRequest<S> for CallBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = CallableError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<CallRequest<T>>::from_request(req, state).await {
            Ok(Json(call)) => Ok(Self(call.data)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected callable body");
                Err(CallableError::invalid_argument(format!(
                    "Bad Request: {}",
                    rejection.body_text()
                )))
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_become_empty() {
        let call: CallRequest<RegisterUserData> =
            serde_json::from_str(r#"{"data": {"email": "a@x.com"}}"#).unwrap();
        let account = call.data.into_new_account();
        assert_eq!(account.email, "a@x.com");
        assert!(account.password.is_empty());
    }

    #[test]
    fn unit_result_serializes_as_null() {
        let json = serde_json::to_value(CallResponse::new(())).unwrap();
        assert_eq!(json, serde_json::json!({"result": null}));
    }
}
