//! Error types for the banking middleware.

/// Domain-level errors (business rule and protocol violations).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Cannot {action} a transaction in state {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    #[error("Identifier conflict: {0}")]
    IdentifierConflict(String),

    #[error("Transaction intent has expired")]
    IntentExpired,
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by the external bank / UPI switch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("OTP does not match")]
    OtpMismatch,

    #[error("OTP has expired")]
    OtpExpired,

    #[error("Rejected by bank: {0}")]
    Rejected(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream timed out")]
    Timeout,
}

impl GatewayError {
    /// Whether the caller may resubmit the same identifier with `retry_flag=Y`.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GatewayError::Rejected(_))
    }
}

/// Application-level errors (for HTTP responses).
///
/// Each variant is one kind of the error taxonomy and maps to exactly one
/// HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Covers malformed envelopes and tag mismatches alike.
    #[error("Unable to decrypt payload")]
    DecryptionFailed,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Identifier conflict: {0}")]
    IdentifierConflict(String),

    #[error("OTP does not match")]
    OtpMismatch,

    #[error("OTP has expired")]
    OtpExpired,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream timed out")]
    GatewayTimeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Taxonomy kind, as written into the `error` field of the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationFailed(_) => "VALIDATION_FAILED",
            AppError::DecryptionFailed => "DECRYPTION_FAILED",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::IdentifierConflict(_) => "IDENTIFIER_CONFLICT",
            AppError::OtpMismatch => "OTP_MISMATCH",
            AppError::OtpExpired => "OTP_EXPIRED",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::GatewayTimeout => "GATEWAY_TIMEOUT",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::Fatal(_) => "FATAL",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::ValidationFailed(_)
            | AppError::DecryptionFailed
            | AppError::OtpMismatch
            | AppError::OtpExpired => 400,
            AppError::Unauthenticated(_) => 401,
            AppError::Forbidden(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::IdentifierConflict(_) => 409,
            AppError::RateLimited => 429,
            AppError::Fatal(_) | AppError::Internal(_) => 500,
            AppError::UpstreamUnavailable(_) => 502,
            AppError::GatewayTimeout => 504,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ValidationError(msg) => AppError::ValidationFailed(msg),
            DomainError::IdentifierConflict(msg) => AppError::IdentifierConflict(msg),
            DomainError::IntentExpired => AppError::OtpExpired,
            e @ DomainError::InvalidTransition { .. } => AppError::IdentifierConflict(e.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::IdentifierConflict(e),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::OtpMismatch => AppError::OtpMismatch,
            GatewayError::OtpExpired => AppError::OtpExpired,
            GatewayError::Rejected(msg) => AppError::Forbidden(msg),
            GatewayError::Unavailable(msg) => AppError::UpstreamUnavailable(msg),
            GatewayError::Timeout => AppError::GatewayTimeout,
        }
    }
}
