//! # Error Handling Framework
//!
//! Structured error management for the alerting platform:
//!
//! - **Structured Error Types**: Categorized error codes for consistent handling
//! - **Rich Context**: Request context and error metadata for debugging
//! - **Severity Classification**: Error categorization for appropriate responses
//! - **Sanitized API Responses**: Production responses never leak internals
//!
//! ## Error Categories
//!
//! - **Validation**: Input validation and business rule violations
//! - **Security**: Identity verification and authorization failures
//! - **Storage**: Persistence layer errors and tenant-scope violations
//! - **Network**: External collaborator (executor, decision advisor) failures
//! - **Resource**: Not-found and conflict/concurrency errors
//! - **System**: Unexpected internal errors requiring investigation
//!
//! ## Usage
//!
//! ```rust
//! use sentry_core::error::{Error, Result};
//!
//! fn validate_severity(value: &str) -> Result<()> {
//!     if value.is_empty() {
//!         return Err(Error::validation("severity must not be empty"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod codes;
pub mod context;
pub mod framework;

pub use codes::ErrorCode;
pub use context::{ErrorContext, RequestContext};
pub use framework::{Error, ErrorCategory, ErrorSeverity, Result};
