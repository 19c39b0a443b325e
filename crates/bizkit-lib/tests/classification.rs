use bizkit_lib::{
    classify, decode_json, ApiError, EnglishTranslator, ErrorBody, FieldError, MultiError,
    RawError, ValidationErrors,
};
use serde_json::{json, Value};

const MESSAGES: [&str; 4] = ["", "boom", "unexpected token at line 1", "ünïcödé ✓"];

fn body(error: &RawError) -> (u16, Value) {
    let c = classify(error, &EnglishTranslator::new());
    (c.status, serde_json::to_value(&c.body).unwrap())
}

#[test]
fn empty_body_always_yields_the_fixed_invalid_request() {
    let (status, value) = body(&RawError::EmptyBody);
    assert_eq!(status, 400);
    assert_eq!(value["error"]["status"], 400);
    assert_eq!(value["error"]["name"], "InvalidRequest");
    assert_eq!(value["error"]["message"], "request can't be empty");
}

#[test]
fn syntax_errors_are_400_invalid_request_for_any_message() {
    for message in MESSAGES {
        let (status, value) = body(&RawError::Syntax(message.to_string()));
        assert_eq!(status, 400);
        assert_eq!(value["error"]["name"], "InvalidRequest");
        assert_eq!(value["error"]["message"], message);
    }
}

#[test]
fn unknown_errors_are_500_with_their_string_form() {
    for message in MESSAGES {
        let (status, value) = body(&RawError::from(anyhow::anyhow!("{message}")));
        assert_eq!(status, 500);
        assert_eq!(value["error"]["name"], "InternalServerError");
        assert_eq!(value["error"]["message"], message);
        assert_eq!(value["error"]["details"], json!([]));
    }
}

#[test]
fn taxonomy_errors_are_forwarded_unchanged_with_400() {
    let cases = [
        ApiError::unauthorized("TokenExpired", "token expired"),
        ApiError::forbidden("TenantMismatch", "wrong tenant"),
        ApiError::internal_server_error("Upstream", "payment provider down"),
        ApiError::new(409, "Conflict", "already exists"),
    ];

    for api in cases {
        let (status, value) = body(&RawError::from(api.clone()));
        assert_eq!(status, 400);
        assert_eq!(value["error"], serde_json::to_value(&api).unwrap());
    }
}

#[test]
fn identifier_length_body_differs_in_shape_from_other_400s() {
    let (_, wrapped) = body(&RawError::Syntax("bad".into()));
    let (status, raw) = body(&bizkit_lib::parse_identifier("1234").unwrap_err());

    assert_eq!(status, 400);
    assert!(wrapped["error"].is_object());
    assert!(raw["error"].is_string());
}

#[test]
fn real_request_bodies_classify_as_expected() {
    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Charge {
        amount: u64,
    }

    let (status, value) = body(&decode_json::<Charge>(b"").unwrap_err());
    assert_eq!((status, value["error"]["message"].clone()), (400, json!("request can't be empty")));

    let (status, value) = body(&decode_json::<Charge>(b"{amount: 1}").unwrap_err());
    assert_eq!(status, 400);
    assert_eq!(value["error"]["name"], "InvalidRequest");
}

#[test]
fn aggregate_validation_response_matches_multi_error_shape() {
    let errors = ValidationErrors::from(vec![
        FieldError::new("Charge.amount", "amount", "gt", "0"),
        FieldError::new("Charge.currency", "currency", "required", ""),
    ]);
    let c = classify(&RawError::from(errors), &EnglishTranslator::new());

    let ErrorBody::Aggregate(multi) = c.body else {
        panic!("expected an aggregate body");
    };
    assert!(multi.has_error());

    let mut expected = MultiError::new();
    expected.append([
        ApiError::bad_request("InvalidRequest", "amount must be greater than 0"),
        ApiError::bad_request("InvalidRequest", "currency is a required field"),
    ]);
    assert_eq!(multi, expected);
}
