//! Client-facing error taxonomy.
//!
//! [`ApiError`] is the only error shape a client ever sees for a classified
//! failure. Its status and category are fixed by the factory used to build
//! it, so a `403` can never be labelled `BadRequest` by accident.
//! [`MultiError`] aggregates several of them, e.g. one per invalid field.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One opaque key-value annotation attached to an [`ApiError`].
pub type Detail = Map<String, Value>;

/// Status code for [`ApiError::bad_request`].
pub const STATUS_BAD_REQUEST: u16 = 400;
/// Status code for [`ApiError::unauthorized`].
pub const STATUS_UNAUTHORIZED: u16 = 401;
/// Status code for [`ApiError::forbidden`].
pub const STATUS_FORBIDDEN: u16 = 403;
/// Status code for [`ApiError::internal_server_error`].
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// A structured, serializable API error.
///
/// Serializes to `{"status": .., "name": .., "message": .., "details": [..]}`.
///
/// # Example
///
/// ```
/// use bizkit_lib::ApiError;
///
/// let err = ApiError::bad_request("InvalidRequest", "request can't be empty");
/// assert_eq!(err.status(), 400);
/// assert_eq!(err.name(), "InvalidRequest");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    status: u16,
    name: String,
    message: String,
    #[serde(default)]
    details: Vec<Detail>,
}

impl ApiError {
    /// Create an error with an explicit status code.
    pub fn new(code: u16, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(code, name.into(), "Error", message.into())
    }

    /// 401 Unauthorized.
    pub fn unauthorized(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(STATUS_UNAUTHORIZED, name.into(), "Unauthorized", message.into())
    }

    /// 403 Forbidden.
    pub fn forbidden(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(STATUS_FORBIDDEN, name.into(), "Forbidden", message.into())
    }

    /// 400 Bad Request.
    pub fn bad_request(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(STATUS_BAD_REQUEST, name.into(), "BadRequest", message.into())
    }

    /// 500 Internal Server Error.
    pub fn internal_server_error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(
            STATUS_INTERNAL_SERVER_ERROR,
            name.into(),
            "InternalServerError",
            message.into(),
        )
    }

    // `name` must never be empty; fall back to the category default.
    fn build(status: u16, name: String, default_name: &str, message: String) -> Self {
        let name = if name.trim().is_empty() {
            default_name.to_string()
        } else {
            name
        };

        Self {
            status,
            name,
            message,
            details: Vec::new(),
        }
    }

    /// Append one annotation, keeping insertion order.
    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.details.push(detail);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &[Detail] {
        &self.details
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{}: {}", self.name, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// An ordered aggregate of [`ApiError`]s.
///
/// Duplicates are kept in encounter order. An empty aggregate must not be
/// sent to a client; check [`MultiError::has_error`] first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiError {
    errors: Vec<ApiError>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether at least one error has been appended.
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Append any number of errors. Never fails.
    pub fn append<I>(&mut self, errors: I)
    where
        I: IntoIterator<Item = ApiError>,
    {
        self.errors.extend(errors);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ApiError> {
        self.errors.iter()
    }

    pub fn errors(&self) -> &[ApiError] {
        &self.errors
    }
}

impl<'a> IntoIterator for &'a MultiError {
    type Item = &'a ApiError;
    type IntoIter = std::slice::Iter<'a, ApiError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl FromIterator<ApiError> for MultiError {
    fn from_iter<T: IntoIterator<Item = ApiError>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{} errors", self.errors.len()),
        }
    }
}

impl std::error::Error for MultiError {}
