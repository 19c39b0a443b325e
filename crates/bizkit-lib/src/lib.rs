//! bizkit core library.
//!
//! Framework-free building blocks shared by bizkit HTTP services: the
//! client-facing error taxonomy, field validation and translation, the raw
//! error classifier, and tenant derivation. HTTP glue lives in
//! `bizkit-service-shared`; nothing in this crate performs I/O.
//!

#![deny(warnings)]

pub mod classify;
pub mod errors;
pub mod tenant;
pub mod validation;

pub use classify::{
    classify, decode_json, parse_identifier, Classification, ErrorBody, InvalidIdentifierLength,
    RawError,
};
pub use errors::{ApiError, Detail, MultiError};
pub use tenant::{resolve_tenant, Tenant, TenantStrategy};
pub use validation::{
    field_name, EnglishTranslator, FieldError, FieldTags, TranslateError, Translator, Validate,
    ValidationErrors, Validator,
};
