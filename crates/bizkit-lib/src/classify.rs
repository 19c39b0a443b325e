//! Classification of raw handler errors into client responses.
//!
//! Handlers fail with a [`RawError`]; [`classify`] maps it to an HTTP status
//! and a response body. The match arms in [`classify`] are the priority order:
//! the first matching kind wins and nothing later can override it.
//!
//! | Kind | Status | Body |
//! |---|---|---|
//! | `EmptyBody` | 400 | `{"error": InvalidRequest "request can't be empty"}` |
//! | `Syntax` | 400 | `{"error": InvalidRequest <parser text>}` |
//! | `FieldValidation` | 400 | `{"error": InvalidRequest <translated text>}` |
//! | `FieldValidations` | 400 | `{"errors": [InvalidRequest ..]}` |
//! | `InvalidIdentifier` | 400 | `{"error": "<raw error text>"}` |
//! | `Api` | 400 | `{"error": <ApiError as recorded>}` |
//! | `Unknown` | 500 | `{"error": InternalServerError <error text>}` |

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::{ApiError, MultiError, STATUS_BAD_REQUEST, STATUS_INTERNAL_SERVER_ERROR};
use crate::validation::{translate_or_describe, FieldError, Translator, ValidationErrors};

/// Category used for every 400 produced from request-shape failures.
pub const INVALID_REQUEST: &str = "InvalidRequest";

/// Category used for unrecognized errors.
pub const INTERNAL_SERVER_ERROR: &str = "InternalServerError";

/// Message for an empty request body.
pub const EMPTY_BODY_MESSAGE: &str = "request can't be empty";

/// An identifier whose textual length cannot be any UUID format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid UUID length: {len}")]
pub struct InvalidIdentifierLength {
    pub len: usize,
}

/// Every error shape a handler can record.
#[derive(Debug, Error)]
pub enum RawError {
    /// The request body was empty.
    #[error("EOF")]
    EmptyBody,

    /// The request body could not be parsed.
    #[error("{0}")]
    Syntax(String),

    /// A single field failed validation.
    #[error("{0}")]
    FieldValidation(FieldError),

    /// Several fields failed validation.
    #[error("{0}")]
    FieldValidations(ValidationErrors),

    /// An identifier had an impossible length.
    #[error(transparent)]
    InvalidIdentifier(InvalidIdentifierLength),

    /// An error that is already part of the client-facing taxonomy.
    #[error(transparent)]
    Api(ApiError),

    /// Anything else. Only its string form ever reaches a client.
    #[error(transparent)]
    Unknown(anyhow::Error),
}

impl RawError {
    /// Short label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyBody => "empty_body",
            Self::Syntax(_) => "syntax",
            Self::FieldValidation(_) => "field_validation",
            Self::FieldValidations(_) => "field_validations",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::Api(_) => "api",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Wrap any error as [`RawError::Unknown`].
    pub fn unknown<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unknown(anyhow::Error::new(error))
    }
}

impl From<ApiError> for RawError {
    fn from(error: ApiError) -> Self {
        Self::Api(error)
    }
}

impl From<FieldError> for RawError {
    fn from(error: FieldError) -> Self {
        Self::FieldValidation(error)
    }
}

impl From<ValidationErrors> for RawError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = errors.into_vec();
        if fields.len() == 1 {
            if let Some(single) = fields.pop() {
                return Self::FieldValidation(single);
            }
        }
        Self::FieldValidations(ValidationErrors::from(fields))
    }
}

impl From<InvalidIdentifierLength> for RawError {
    fn from(error: InvalidIdentifierLength) -> Self {
        Self::InvalidIdentifier(error)
    }
}

impl From<anyhow::Error> for RawError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error)
    }
}

impl From<serde_json::Error> for RawError {
    fn from(error: serde_json::Error) -> Self {
        if error.is_io() {
            Self::Unknown(anyhow::Error::new(error))
        } else {
            Self::Syntax(error.to_string())
        }
    }
}

/// Decode a JSON request body.
///
/// An empty or whitespace-only body is [`RawError::EmptyBody`]; any other
/// decoding failure is [`RawError::Syntax`].
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RawError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(RawError::EmptyBody);
    }
    serde_json::from_slice(bytes).map_err(RawError::from)
}

// simple, hyphenated, braced, urn
const IDENTIFIER_LENGTHS: [usize; 4] = [32, 36, 38, 45];

/// Parse a UUID identifier.
///
/// Lengths no UUID format can have are [`RawError::InvalidIdentifier`];
/// other malformed input is [`RawError::Unknown`].
pub fn parse_identifier(input: &str) -> Result<Uuid, RawError> {
    if !IDENTIFIER_LENGTHS.contains(&input.len()) {
        return Err(InvalidIdentifierLength { len: input.len() }.into());
    }
    Uuid::try_parse(input).map_err(RawError::unknown)
}

/// Response body produced by [`classify`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    /// `{"error": ApiError}`.
    Wrapped { error: ApiError },
    /// `{"error": <raw value>}` for errors forwarded without wrapping.
    Passthrough { error: Value },
    /// `{"errors": [...]}`.
    Aggregate(MultiError),
}

/// Status and body for one classified error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub status: u16,
    pub body: ErrorBody,
}

impl Classification {
    fn wrapped(error: ApiError) -> Self {
        Self {
            status: error.status(),
            body: ErrorBody::Wrapped { error },
        }
    }

    /// Category name when the body carries a single [`ApiError`].
    pub fn name(&self) -> Option<&str> {
        match &self.body {
            ErrorBody::Wrapped { error } => Some(error.name()),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.body) {
            Ok(json) => write!(f, "{} {}", self.status, json),
            Err(_) => write!(f, "{}", self.status),
        }
    }
}

/// Map a raw error to a status and response body.
///
/// Pure: no I/O, no logging beyond translation fallbacks.
pub fn classify(error: &RawError, translator: &dyn Translator) -> Classification {
    match error {
        RawError::EmptyBody => {
            Classification::wrapped(ApiError::bad_request(INVALID_REQUEST, EMPTY_BODY_MESSAGE))
        }
        RawError::Syntax(text) => {
            Classification::wrapped(ApiError::bad_request(INVALID_REQUEST, text.clone()))
        }
        RawError::FieldValidation(field) => Classification::wrapped(ApiError::bad_request(
            INVALID_REQUEST,
            translate_or_describe(translator, field),
        )),
        RawError::FieldValidations(fields) => {
            let multi: MultiError = fields
                .iter()
                .map(|field| {
                    ApiError::bad_request(INVALID_REQUEST, translate_or_describe(translator, field))
                })
                .collect();

            if multi.has_error() {
                Classification {
                    status: STATUS_BAD_REQUEST,
                    body: ErrorBody::Aggregate(multi),
                }
            } else {
                // An empty aggregate is never sent to a client.
                Classification::wrapped(ApiError::bad_request(INVALID_REQUEST, fields.to_string()))
            }
        }
        RawError::InvalidIdentifier(raw) => Classification {
            status: STATUS_BAD_REQUEST,
            body: ErrorBody::Passthrough {
                error: Value::String(raw.to_string()),
            },
        },
        RawError::Api(api) => Classification {
            status: STATUS_BAD_REQUEST,
            body: ErrorBody::Wrapped { error: api.clone() },
        },
        RawError::Unknown(other) => Classification {
            status: STATUS_INTERNAL_SERVER_ERROR,
            body: ErrorBody::Wrapped {
                error: ApiError::internal_server_error(INTERNAL_SERVER_ERROR, other.to_string()),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::EnglishTranslator;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Payload {
        name: String,
    }

    fn en() -> EnglishTranslator {
        EnglishTranslator::new()
    }

    #[test]
    fn test_empty_body() {
        let c = classify(&RawError::EmptyBody, &en());
        assert_eq!(c.status, 400);
        assert_eq!(
            serde_json::to_value(&c.body).unwrap(),
            json!({"error": {"status": 400, "name": "InvalidRequest", "message": "request can't be empty", "details": []}})
        );
    }

    #[test]
    fn test_syntax_keeps_parser_text() {
        let err = decode_json::<Payload>(b"{\"name\":").unwrap_err();
        let text = err.to_string();
        let c = classify(&err, &en());

        assert_eq!(c.status, 400);
        assert_eq!(c.name(), Some("InvalidRequest"));
        match c.body {
            ErrorBody::Wrapped { error } => assert_eq!(error.message(), text),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_decode_json_empty_and_whitespace() {
        assert!(matches!(decode_json::<Payload>(b""), Err(RawError::EmptyBody)));
        assert!(matches!(
            decode_json::<Payload>(b"  \n\t"),
            Err(RawError::EmptyBody)
        ));
    }

    #[test]
    fn test_decode_json_wrong_shape_is_syntax() {
        assert!(matches!(
            decode_json::<Payload>(b"{\"name\": 5}"),
            Err(RawError::Syntax(_))
        ));
    }

    #[test]
    fn test_field_validation_is_translated() {
        let field = FieldError::new("CreateAccount.name", "name", "required", "");
        let c = classify(&RawError::from(field), &en());

        assert_eq!(c.status, 400);
        match c.body {
            ErrorBody::Wrapped { error } => {
                assert_eq!(error.name(), "InvalidRequest");
                assert_eq!(error.message(), "name is a required field");
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_field_validation_translation_failure_falls_back() {
        let field = FieldError::new("CreateAccount.code", "code", "iso4217", "");
        let c = classify(&RawError::from(field.clone()), &en());

        assert_eq!(c.status, 400);
        match c.body {
            ErrorBody::Wrapped { error } => assert_eq!(error.message(), field.describe()),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_single_validation_error_collapses() {
        let errors =
            ValidationErrors::from(vec![FieldError::new("X.name", "name", "required", "")]);
        assert!(matches!(
            RawError::from(errors),
            RawError::FieldValidation(_)
        ));
    }

    #[test]
    fn test_multiple_validation_errors_aggregate_in_order() {
        let errors = ValidationErrors::from(vec![
            FieldError::new("X.name", "name", "required", ""),
            FieldError::new("X.email", "email", "email", ""),
        ]);
        let c = classify(&RawError::from(errors), &en());

        assert_eq!(c.status, 400);
        let value = serde_json::to_value(&c.body).unwrap();
        assert_eq!(value["errors"][0]["message"], "name is a required field");
        assert_eq!(value["errors"][1]["message"], "email must be a valid email address");
    }

    #[test]
    fn test_invalid_identifier_is_not_wrapped() {
        let err = parse_identifier("abc").unwrap_err();
        assert!(matches!(err, RawError::InvalidIdentifier(InvalidIdentifierLength { len: 3 })));

        let c = classify(&err, &en());
        assert_eq!(c.status, 400);
        assert_eq!(c.name(), None);
        assert_eq!(
            serde_json::to_value(&c.body).unwrap(),
            json!({"error": "invalid UUID length: 3"})
        );
    }

    #[test]
    fn test_malformed_identifier_of_valid_length_is_unknown() {
        let err = parse_identifier("zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz").unwrap_err();
        assert!(matches!(err, RawError::Unknown(_)));
        assert_eq!(classify(&err, &en()).status, 500);
    }

    #[test]
    fn test_parse_identifier_accepts_hyphenated() {
        let id = parse_identifier("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn test_api_error_passes_through_with_400() {
        let api = ApiError::forbidden("NoAccess", "tenant mismatch");
        let c = classify(&RawError::from(api.clone()), &en());

        assert_eq!(c.status, 400);
        assert_eq!(c.body, ErrorBody::Wrapped { error: api });
    }

    #[test]
    fn test_unknown_is_opaque_500() {
        let err = RawError::from(anyhow::anyhow!("connection reset by peer"));
        let c = classify(&err, &en());

        assert_eq!(c.status, 500);
        assert_eq!(
            serde_json::to_value(&c.body).unwrap(),
            json!({"error": {"status": 500, "name": "InternalServerError", "message": "connection reset by peer", "details": []}})
        );
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(RawError::EmptyBody.kind(), "empty_body");
        assert_eq!(RawError::Syntax("x".into()).kind(), "syntax");
        assert_eq!(
            RawError::from(ApiError::bad_request("A", "a")).kind(),
            "api"
        );
    }
}
