use serde::{Deserialize, Serialize};
use std::fmt;

/// Standardized error codes for the alerting platform.
/// Business-agnostic technical categories, grouped by numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General system errors (1000-1999)
    InternalServerError = 1000,
    ConfigurationError = 1001,
    ServiceUnavailable = 1002,
    Timeout = 1003,
    ResourceExhausted = 1004,

    // Storage errors (2000-2999)
    StorageConnectionError = 2000,
    StorageConstraintViolation = 2001,
    StorageQueryError = 2002,
    StorageMissingTenantScope = 2003,

    // Network & external-collaborator errors (3000-3999)
    NetworkError = 3000,
    NetworkTimeout = 3001,
    ExternalServiceError = 3002,
    SerializationError = 3003,

    // Security & authentication errors (4000-4999)
    AuthenticationRequired = 4000,
    AuthenticationFailed = 4001,
    InvalidCredentials = 4002,
    TokenExpired = 4003,
    TokenInvalid = 4004,
    AuthorizationFailed = 4005,
    PermissionDenied = 4006,
    SignatureInvalid = 4007,

    // Input validation errors (5000-5999)
    ValidationFailed = 5000,
    InvalidInput = 5001,
    MissingRequiredField = 5002,
    InvalidFormat = 5003,
    ValueOutOfRange = 5004,

    // Resource / conflict errors (6000-6999)
    ResourceNotFound = 6000,
    ResourceAlreadyExists = 6001,
    OptimisticConcurrencyConflict = 6002,
    ApprovalConflict = 6003,

    // Rate limiting (7000-7999)
    RateLimitExceeded = 7000,

    // Data-model invariant violations (8000-8999), always logged, never swallowed
    InvariantViolation = 8000,
}

impl ErrorCode {
    /// Get HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InternalServerError
            | ErrorCode::ConfigurationError
            | ErrorCode::StorageConnectionError
            | ErrorCode::StorageQueryError
            | ErrorCode::NetworkError
            | ErrorCode::ExternalServiceError
            | ErrorCode::SerializationError
            | ErrorCode::InvariantViolation => 500,

            ErrorCode::ServiceUnavailable => 503,
            ErrorCode::Timeout | ErrorCode::NetworkTimeout => 504,

            ErrorCode::AuthenticationRequired
            | ErrorCode::AuthenticationFailed
            | ErrorCode::InvalidCredentials
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid
            | ErrorCode::SignatureInvalid => 401,

            ErrorCode::AuthorizationFailed | ErrorCode::PermissionDenied => 403,

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFormat
            | ErrorCode::ValueOutOfRange
            | ErrorCode::StorageMissingTenantScope => 422,

            ErrorCode::ResourceNotFound => 404,

            ErrorCode::ResourceAlreadyExists
            | ErrorCode::OptimisticConcurrencyConflict
            | ErrorCode::ApprovalConflict => 409,

            ErrorCode::RateLimitExceeded => 429,
            ErrorCode::ResourceExhausted => 507,
        }
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InternalServerError
            | ErrorCode::ConfigurationError
            | ErrorCode::ServiceUnavailable
            | ErrorCode::Timeout
            | ErrorCode::ResourceExhausted => "system",

            ErrorCode::StorageConnectionError
            | ErrorCode::StorageConstraintViolation
            | ErrorCode::StorageQueryError
            | ErrorCode::StorageMissingTenantScope => "storage",

            ErrorCode::NetworkError
            | ErrorCode::NetworkTimeout
            | ErrorCode::ExternalServiceError
            | ErrorCode::SerializationError => "network",

            ErrorCode::AuthenticationRequired
            | ErrorCode::AuthenticationFailed
            | ErrorCode::InvalidCredentials
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid
            | ErrorCode::AuthorizationFailed
            | ErrorCode::PermissionDenied
            | ErrorCode::SignatureInvalid => "security",

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFormat
            | ErrorCode::ValueOutOfRange => "validation",

            ErrorCode::ResourceNotFound
            | ErrorCode::ResourceAlreadyExists
            | ErrorCode::OptimisticConcurrencyConflict
            | ErrorCode::ApprovalConflict => "resource",

            ErrorCode::RateLimitExceeded => "rate_limit",

            ErrorCode::InvariantViolation => "invariant",
        }
    }

    /// Maps onto the platform's Transient/Fatal split: transient failures are
    /// safe to retry, fatal ones must never be swallowed by a retry loop.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkTimeout
                | ErrorCode::ServiceUnavailable
                | ErrorCode::StorageConnectionError
                | ErrorCode::Timeout
        )
    }

    /// Check if error should be logged at error level
    pub fn should_log_as_error(&self) -> bool {
        !matches!(
            self,
            ErrorCode::ValidationFailed
                | ErrorCode::InvalidInput
                | ErrorCode::MissingRequiredField
                | ErrorCode::InvalidFormat
                | ErrorCode::ValueOutOfRange
                | ErrorCode::ResourceNotFound
                | ErrorCode::AuthenticationFailed
                | ErrorCode::InvalidCredentials
                | ErrorCode::PermissionDenied
                | ErrorCode::RateLimitExceeded
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
