//! Field validation and localized translation of constraint violations.
//!
//! A [`Validator`] collects [`FieldError`]s while checking a request; a
//! [`Translator`] turns one violation into human-readable text. Field names in
//! violations are the wire-level names chosen by [`field_name`], so messages
//! talk about `email`, not `Email`.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Tag-naming strategy for reported field names.
///
/// Prefers the `json` tag, falls back to the `form` tag, and finally the Rust
/// identifier. Only the part before the first `,` counts (`"email,omitempty"`
/// names `email`). The skip marker `-` yields an empty, display-suppressed name.
pub fn field_name(json_tag: Option<&str>, form_tag: Option<&str>, rust_name: &str) -> String {
    let tag = match json_tag.or(form_tag) {
        Some(tag) => tag,
        None => return rust_name.to_string(),
    };

    let name = tag.split(',').next().unwrap_or_default();
    if name == "-" {
        String::new()
    } else {
        name.to_string()
    }
}

/// Serialization tags of one request field, fed to [`field_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTags {
    pub rust_name: &'static str,
    pub json: Option<&'static str>,
    pub form: Option<&'static str>,
}

impl FieldTags {
    /// A field with no serialization tags.
    pub const fn plain(rust_name: &'static str) -> Self {
        Self {
            rust_name,
            json: None,
            form: None,
        }
    }

    /// A field carrying a `json` tag.
    pub const fn json(rust_name: &'static str, tag: &'static str) -> Self {
        Self {
            rust_name,
            json: Some(tag),
            form: None,
        }
    }

    /// A field carrying a `form` tag.
    pub const fn form(rust_name: &'static str, tag: &'static str) -> Self {
        Self {
            rust_name,
            json: None,
            form: Some(tag),
        }
    }

    /// The name reported in violations.
    pub fn display_name(&self) -> String {
        field_name(self.json, self.form, self.rust_name)
    }
}

/// One field-level constraint violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Dotted path of the field, e.g. `CreateAccount.email`.
    pub namespace: String,
    /// Wire-level field name (may be empty when display is suppressed).
    pub field: String,
    /// Constraint tag that failed, e.g. `required` or `min`.
    pub tag: String,
    /// Constraint parameter, e.g. `3` for `min=3`. Empty when unused.
    pub param: String,
    /// The offending value, when it is safe to echo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldError {
    pub fn new(
        namespace: impl Into<String>,
        field: impl Into<String>,
        tag: impl Into<String>,
        param: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            field: field.into(),
            tag: tag.into(),
            param: param.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Untranslated constraint description.
    pub fn describe(&self) -> String {
        format!(
            "Key: '{}' Error:Field validation for '{}' failed on the '{}' tag",
            self.namespace, self.field, self.tag
        )
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl std::error::Error for FieldError {}

/// Ordered collection of violations found while validating one value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn first(&self) -> Option<&FieldError> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(FieldError::describe).collect();
        f.write_str(&lines.join("\n"))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validation trait for request types.
///
/// Implementations check every field and report all violations at once.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Collects violations for one value.
///
/// Rules for a field stop at its first failure, so `required` and `min` never
/// both fire for the same empty string.
///
/// ```
/// use bizkit_lib::validation::{FieldTags, Validator};
///
/// const NAME: FieldTags = FieldTags::json("name", "name");
///
/// let mut v = Validator::new("CreateAccount");
/// v.required(NAME, "").min_len(NAME, "", 3);
/// let errors = v.finish().unwrap_err();
/// assert_eq!(errors.len(), 1);
/// assert_eq!(errors.first().unwrap().tag, "required");
/// ```
#[derive(Debug)]
pub struct Validator {
    type_name: String,
    errors: ValidationErrors,
}

impl Validator {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            errors: ValidationErrors::new(),
        }
    }

    fn failed(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn check(
        &mut self,
        tags: FieldTags,
        ok: bool,
        tag: &str,
        param: String,
        value: Value,
    ) -> &mut Self {
        let field = tags.display_name();
        if ok || self.failed(&field) {
            return self;
        }

        let segment = if field.is_empty() {
            tags.rust_name
        } else {
            field.as_str()
        };
        let namespace = format!("{}.{}", self.type_name, segment);
        self.errors
            .push(FieldError::new(namespace, field, tag, param).with_value(value));
        self
    }

    pub fn required(&mut self, tags: FieldTags, value: &str) -> &mut Self {
        self.check(
            tags,
            !value.trim().is_empty(),
            "required",
            String::new(),
            Value::from(value),
        )
    }

    /// Minimum length in characters.
    pub fn min_len(&mut self, tags: FieldTags, value: &str, min: usize) -> &mut Self {
        self.check(
            tags,
            value.chars().count() >= min,
            "min",
            min.to_string(),
            Value::from(value),
        )
    }

    /// Maximum length in characters.
    pub fn max_len(&mut self, tags: FieldTags, value: &str, max: usize) -> &mut Self {
        self.check(
            tags,
            value.chars().count() <= max,
            "max",
            max.to_string(),
            Value::from(value),
        )
    }

    pub fn email(&mut self, tags: FieldTags, value: &str) -> &mut Self {
        self.check(
            tags,
            looks_like_email(value),
            "email",
            String::new(),
            Value::from(value),
        )
    }

    pub fn one_of(&mut self, tags: FieldTags, value: &str, allowed: &[&str]) -> &mut Self {
        self.check(
            tags,
            allowed.contains(&value),
            "oneof",
            allowed.join(" "),
            Value::from(value),
        )
    }

    pub fn gt(&mut self, tags: FieldTags, value: f64, bound: f64) -> &mut Self {
        self.check(tags, value > bound, "gt", bound.to_string(), Value::from(value))
    }

    pub fn gte(&mut self, tags: FieldTags, value: f64, bound: f64) -> &mut Self {
        self.check(tags, value >= bound, "gte", bound.to_string(), Value::from(value))
    }

    pub fn lte(&mut self, tags: FieldTags, value: f64, bound: f64) -> &mut Self {
        self.check(tags, value <= bound, "lte", bound.to_string(), Value::from(value))
    }

    pub fn uuid(&mut self, tags: FieldTags, value: &str) -> &mut Self {
        self.check(
            tags,
            uuid::Uuid::try_parse(value).is_ok(),
            "uuid",
            String::new(),
            Value::from(value),
        )
    }

    /// Finish validation; `Err` holds every violation in check order.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Failure to translate a violation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// No template is registered for the constraint tag.
    #[error("no translation registered for tag '{tag}' in locale '{locale}'")]
    UnknownTag { tag: String, locale: String },

    /// The template rendered to an empty string.
    #[error("translation for tag '{tag}' rendered empty")]
    EmptyTranslation { tag: String },
}

/// Locale-bound translator for field violations.
pub trait Translator: Send + Sync {
    /// Locale identifier, e.g. `en`.
    fn locale(&self) -> &str;

    /// Render a non-empty, human-readable message for `error`.
    fn translate(&self, error: &FieldError) -> Result<String, TranslateError>;
}

static ENGLISH_TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("required", "{field} is a required field"),
        ("min", "{field} must be at least {param} characters in length"),
        ("max", "{field} must be a maximum of {param} characters in length"),
        ("len", "{field} must be {param} characters in length"),
        ("email", "{field} must be a valid email address"),
        ("oneof", "{field} must be one of [{param}]"),
        ("gt", "{field} must be greater than {param}"),
        ("gte", "{field} must be {param} or greater"),
        ("lt", "{field} must be less than {param}"),
        ("lte", "{field} must be {param} or less"),
        ("uuid", "{field} must be a valid UUID"),
    ])
});

/// English translator with the default message set.
///
/// Templates use `{field}` and `{param}` placeholders.
#[derive(Debug, Clone)]
pub struct EnglishTranslator {
    templates: HashMap<String, String>,
}

impl Default for EnglishTranslator {
    fn default() -> Self {
        Self {
            templates: ENGLISH_TEMPLATES
                .iter()
                .map(|(tag, template)| (tag.to_string(), template.to_string()))
                .collect(),
        }
    }
}

impl EnglishTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or override the template for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, template: impl Into<String>) -> &mut Self {
        self.templates.insert(tag.into(), template.into());
        self
    }
}

impl Translator for EnglishTranslator {
    fn locale(&self) -> &str {
        "en"
    }

    fn translate(&self, error: &FieldError) -> Result<String, TranslateError> {
        let template =
            self.templates
                .get(&error.tag)
                .ok_or_else(|| TranslateError::UnknownTag {
                    tag: error.tag.clone(),
                    locale: self.locale().to_string(),
                })?;

        let message = template
            .replace("{field}", &error.field)
            .replace("{param}", &error.param);

        if message.trim().is_empty() {
            return Err(TranslateError::EmptyTranslation {
                tag: error.tag.clone(),
            });
        }

        Ok(message.trim().to_string())
    }
}

/// Translate `error`, falling back to its untranslated description.
pub fn translate_or_describe(translator: &dyn Translator, error: &FieldError) -> String {
    match translator.translate(error) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, tag = %error.tag, "falling back to untranslated field error");
            error.describe()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL: FieldTags = FieldTags::json("email_address", "email,omitempty");
    const NAME: FieldTags = FieldTags::json("name", "name");
    const PLAN: FieldTags = FieldTags::form("plan", "plan");
    const SEATS: FieldTags = FieldTags::json("seats", "seats");

    #[test]
    fn test_field_name_prefers_json() {
        assert_eq!(field_name(Some("email,omitempty"), Some("mail"), "Email"), "email");
    }

    #[test]
    fn test_field_name_falls_back_to_form() {
        assert_eq!(field_name(None, Some("plan_id,omitempty"), "PlanID"), "plan_id");
    }

    #[test]
    fn test_field_name_skip_marker_is_empty() {
        assert_eq!(field_name(Some("-"), None, "Secret"), "");
        assert_eq!(field_name(None, Some("-"), "Secret"), "");
    }

    #[test]
    fn test_field_name_without_tags_uses_identifier() {
        assert_eq!(field_name(None, None, "Name"), "Name");
    }

    #[test]
    fn test_validator_collects_in_order() {
        let mut v = Validator::new("CreateAccount");
        v.required(NAME, "")
            .email(EMAIL, "not-an-email")
            .one_of(PLAN, "gold", &["free", "pro"]);

        let errors = v.finish().unwrap_err();
        let tags: Vec<&str> = errors.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["required", "email", "oneof"]);
        assert_eq!(errors.first().unwrap().namespace, "CreateAccount.name");
        assert_eq!(errors.iter().nth(1).unwrap().field, "email");
    }

    #[test]
    fn test_validator_stops_at_first_failure_per_field() {
        let mut v = Validator::new("CreateAccount");
        v.required(NAME, "").min_len(NAME, "", 3).max_len(NAME, "", 0);

        let errors = v.finish().unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_validator_passes_valid_input() {
        let mut v = Validator::new("CreateAccount");
        v.required(NAME, "Acme")
            .min_len(NAME, "Acme", 3)
            .email(EMAIL, "ops@acme.io")
            .gte(SEATS, 5.0, 1.0)
            .lte(SEATS, 5.0, 100.0);

        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_english_translations() {
        let translator = EnglishTranslator::new();

        let required = FieldError::new("CreateAccount.name", "name", "required", "");
        assert_eq!(translator.translate(&required).unwrap(), "name is a required field");

        let min = FieldError::new("CreateAccount.name", "name", "min", "3");
        assert_eq!(
            translator.translate(&min).unwrap(),
            "name must be at least 3 characters in length"
        );

        let oneof = FieldError::new("CreateAccount.plan", "plan", "oneof", "free pro");
        assert_eq!(
            translator.translate(&oneof).unwrap(),
            "plan must be one of [free pro]"
        );
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let translator = EnglishTranslator::new();
        let err = FieldError::new("X.code", "code", "iso4217", "");

        assert_eq!(
            translator.translate(&err),
            Err(TranslateError::UnknownTag {
                tag: "iso4217".to_string(),
                locale: "en".to_string()
            })
        );
    }

    #[test]
    fn test_register_overrides_template() {
        let mut translator = EnglishTranslator::new();
        translator.register("required", "please provide {field}");

        let err = FieldError::new("X.name", "name", "required", "");
        assert_eq!(translator.translate(&err).unwrap(), "please provide name");
    }

    #[test]
    fn test_empty_render_is_an_error() {
        let mut translator = EnglishTranslator::new();
        translator.register("blank", "{field}");

        let err = FieldError::new("X.secret", "", "blank", "");
        assert!(matches!(
            translator.translate(&err),
            Err(TranslateError::EmptyTranslation { .. })
        ));
    }

    #[test]
    fn test_translate_or_describe_falls_back() {
        let translator = EnglishTranslator::new();
        let err = FieldError::new("X.code", "code", "iso4217", "");

        assert_eq!(
            translate_or_describe(&translator, &err),
            "Key: 'X.code' Error:Field validation for 'code' failed on the 'iso4217' tag"
        );
    }

    #[test]
    fn test_email_heuristic() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a b@c.co"));
        assert!(!looks_like_email("a@@b.co"));
    }
}
