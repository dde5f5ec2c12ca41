//! Structured error taxonomy for pod operations.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Kind
// ============================================================================

/// Classification of a failed pod operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An authenticated call was attempted before a token exists.
    NotInitialized,
    /// No CSRF token could be extracted from the sign-in page.
    InitFailed,
    /// Login was attempted with an empty username or password.
    InvalidCredentials,
    /// The sign-in handshake did not yield an authenticated session.
    LoginFailed,
    /// A call requiring an authenticated session was made while logged out.
    NotLoggedIn,
    /// Publishing a status message failed.
    PostFailed,
    /// Deleting a post or comment failed.
    DeleteFailed,
    /// The aspect list could not be fetched.
    AspectsFetchFailed,
    /// The service list could not be fetched.
    ServicesFetchFailed,
}

impl ErrorKind {
    /// Stable kebab-case tag for this kind.
    ///
    /// UI layers key contextual help off this value; it is also carried
    /// in the error's aux data under `help_tag`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not-initialized",
            Self::InitFailed => "init-failed",
            Self::InvalidCredentials => "invalid-credentials",
            Self::LoginFailed => "login-failed",
            Self::NotLoggedIn => "not-logged-in",
            Self::PostFailed => "post-failed",
            Self::DeleteFailed => "delete-failed",
            Self::AspectsFetchFailed => "aspects-fetch-failed",
            Self::ServicesFetchFailed => "services-fetch-failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// ============================================================================
// Pod Error
// ============================================================================

/// A failed pod operation.
///
/// Carries a [`ErrorKind`] classification, a human-readable message, and
/// auxiliary key/value detail such as the last HTTP status line or the
/// transport failure that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PodError {
    kind: ErrorKind,
    message: String,
    aux: BTreeMap<String, String>,
}

impl PodError {
    /// Creates an error of `kind` with a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            aux: BTreeMap::new(),
        }
    }

    /// Attaches one auxiliary key/value pair.
    pub fn with_aux(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.aux.insert(key.into(), value.into());
        self
    }

    /// The error's classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// All auxiliary detail attached to this error.
    pub fn aux(&self) -> &BTreeMap<String, String> {
        &self.aux
    }

    /// Looks up one auxiliary value.
    pub fn aux_value(&self, key: &str) -> Option<&str> {
        self.aux.get(key).map(String::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_stable() {
        assert_eq!(ErrorKind::InitFailed.tag(), "init-failed");
        assert_eq!(ErrorKind::NotLoggedIn.tag(), "not-logged-in");
        assert_eq!(ErrorKind::ServicesFetchFailed.tag(), "services-fetch-failed");
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = PodError::new(ErrorKind::LoginFailed, "check username and password");
        assert_eq!(err.to_string(), "login-failed: check username and password");
    }

    #[test]
    fn test_aux_builder() {
        let err = PodError::new(ErrorKind::PostFailed, "boom")
            .with_aux("http_status", "500")
            .with_aux("http_reason", "Internal Server Error");
        assert_eq!(err.aux_value("http_status"), Some("500"));
        assert_eq!(err.aux_value("missing"), None);
        assert_eq!(err.aux().len(), 2);
    }
}
