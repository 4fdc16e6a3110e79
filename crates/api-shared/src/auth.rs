//! Bearer-credential guard.
//!
//! The guard is deliberately opaque to the rest of the system: given the raw `Authorization`
//! header it answers [`AuthDecision::Authorized`] or [`AuthDecision::Denied`], nothing more.

/// Who a request was authorised as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authorized(Identity),
    Denied,
}

/// Decides whether a request's credential is acceptable.
pub trait CredentialCheck: Send + Sync {
    fn check(&self, authorization: Option<&str>) -> AuthDecision;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthConfigError {
    #[error("PATIENT_API_TOKEN not set in environment")]
    MissingToken,
}

/// Accepts exactly one static bearer token.
#[derive(Clone)]
pub struct BearerToken {
    expected: String,
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken").finish_non_exhaustive()
    }
}

impl BearerToken {
    /// Subject recorded for requests authorised by the shared token.
    pub const SUBJECT: &'static str = "api-token";

    /// Builds the guard from a configured token value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthConfigError::MissingToken`] if `token` is unset or blank.
    pub fn from_env_value(token: Option<String>) -> Result<Self, AuthConfigError> {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(AuthConfigError::MissingToken)?;
        Ok(Self { expected: token })
    }
}

impl CredentialCheck for BearerToken {
    fn check(&self, authorization: Option<&str>) -> AuthDecision {
        match authorization.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) if token == self.expected => AuthDecision::Authorized(Identity {
                subject: Self::SUBJECT.into(),
            }),
            _ => AuthDecision::Denied,
        }
    }
}
