use serde_json::{Map, Value};

/// Verified identity of the caller, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AuthInfo {
    uid: String,
    /// Decoded token claims (`iss`, `aud`, `email`, ...).
    claims: Map<String, Value>,
}

impl AuthInfo {
    #[must_use]
    pub fn new(uid: impl Into<String>, claims: Map<String, Value>) -> Self {
        Self {
            uid: uid.into(),
            claims,
        }
    }

    /// Unique identifier of the authenticated account.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Convenience accessor for string claims such as `email`.
    #[must_use]
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }
}

/// `CallContext` carries request-scoped metadata for one inbound call.
///
/// It is created by the transport layer once per request and is read-only
/// afterwards. The authenticated identity is optional: anonymous callers get
/// a context with no [`AuthInfo`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CallContext {
    auth: Option<AuthInfo>,
    request_id: Option<String>,
    environment: Vec<(String, String)>,
}

impl CallContext {
    /// Create a new `CallContext` builder
    #[must_use]
    pub fn builder() -> CallContextBuilder {
        CallContextBuilder::default()
    }

    /// Create an anonymous `CallContext` with no identity
    #[must_use]
    pub fn anonymous() -> Self {
        CallContextBuilder::default().build()
    }

    /// Shortcut for an authenticated context with no extra claims.
    #[must_use]
    pub fn for_uid(uid: impl Into<String>) -> Self {
        CallContextBuilder::default()
            .auth(AuthInfo::new(uid, Map::new()))
            .build()
    }

    #[must_use]
    pub fn auth(&self) -> Option<&AuthInfo> {
        self.auth.as_ref()
    }

    /// Identifier of the authenticated caller, if any.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.auth.as_ref().map(AuthInfo::uid)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Get the environmental attributes associated with the call
    /// (e.g., client IP, user agent)
    #[must_use]
    pub fn environment(&self) -> &[(String, String)] {
        &self.environment
    }
}

#[derive(Default)]
pub struct CallContextBuilder {
    auth: Option<AuthInfo>,
    request_id: Option<String>,
    environment: Vec<(String, String)>,
}

impl CallContextBuilder {
    #[must_use]
    pub fn auth(mut self, auth: AuthInfo) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn request_id(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_owned());
        self
    }

    #[must_use]
    pub fn add_environment_attribute(mut self, key: &str, value: &str) -> Self {
        self.environment.push((key.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn build(self) -> CallContext {
        CallContext {
            auth: self.auth,
            request_id: self.request_id,
            environment: self.environment,
        }
    }
}
