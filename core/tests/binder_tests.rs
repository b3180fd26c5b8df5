//! Binding pipeline scenarios.

#![allow(clippy::expect_used)]

use route_bind_core::{
    BindError, BindErrors, BindStage, BindingError, PostParseHook, RequestDescriptor,
    Validatable, ValidationError,
};
use route_bind_macros::Bindable;
use route_bind_testing::{TestRequest, assert_mentions, coercion_fields, expect_errors};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Bindable, Debug, Default)]
struct TestPath {
    #[bind(path = "id", validate = "required")]
    id: i64,
}

#[test]
fn test_path_value_is_coerced() {
    let descriptor = RequestDescriptor::<TestPath>::build("/test/:id").expect("valid");
    let outcome = TestRequest::get("/test/1234").bind(&descriptor);
    assert!(outcome.is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.value.id, 1234);
    assert_eq!(outcome.stage, BindStage::Finalized);
}

#[test]
fn test_path_coercion_error_is_attributed() {
    let descriptor = RequestDescriptor::<TestPath>::build("/test/:id").expect("valid");
    let outcome = TestRequest::get("/test/abc").bind(&descriptor);
    let errors = expect_errors(&outcome);
    assert_eq!(coercion_fields(errors), vec!["id"]);
    assert_eq!(outcome.value.id, 0);
}

#[derive(Bindable, Debug, Default)]
struct UserPost {
    #[bind(path = "userId")]
    user_id: u32,
    #[bind(path = "postId")]
    post_id: u32,
}

#[test]
fn test_path_mismatch_is_total() {
    let descriptor =
        RequestDescriptor::<UserPost>::build("/users/{userId}/posts/{postId}").expect("valid");

    let outcome = TestRequest::get("/users/123/posts/456").bind(&descriptor);
    assert!(outcome.is_ok());
    assert_eq!((outcome.value.user_id, outcome.value.post_id), (123, 456));

    let outcome = TestRequest::get("/users/123").bind(&descriptor);
    let errors = expect_errors(&outcome);
    assert_eq!(errors.len(), 1);
    assert!(errors.iter().all(BindError::is_path_mismatch));
    assert_eq!(outcome.stage, BindStage::BodyDone);
}

#[test]
fn test_plain_template_with_colon_matches_exactly() {
    let descriptor = RequestDescriptor::<Secured>::build("/at/12:30").expect("valid");

    let outcome = TestRequest::get("/at/12:30").header("apikey", "k").bind(&descriptor);
    assert!(outcome.is_ok(), "{:?}", outcome.result);

    let outcome = TestRequest::get("/at/12:99").header("apikey", "k").bind(&descriptor);
    let errors = expect_errors(&outcome);
    assert_eq!(errors.len(), 1);
    assert!(errors.iter().all(BindError::is_path_mismatch));
    assert_eq!(outcome.stage, BindStage::BodyDone);
}

#[derive(Bindable, Debug, Default)]
struct RawBody {
    #[bind(body = "body")]
    body: Vec<u8>,
}

#[test]
fn test_raw_byte_body_is_copied_verbatim() {
    let descriptor = RequestDescriptor::<RawBody>::build("/raw").expect("valid");
    let outcome = TestRequest::post("/raw").body(vec![1_u8, 2, 3]).bind(&descriptor);
    assert!(outcome.is_ok());
    assert_eq!(outcome.value.body, vec![1, 2, 3]);
}

#[test]
fn test_body_read_failure_is_io_error() {
    let descriptor = RequestDescriptor::<RawBody>::build("/raw").expect("valid");
    let outcome = TestRequest::post("/raw")
        .failing_body("request cancelled")
        .bind(&descriptor);
    let errors = expect_errors(&outcome);
    assert!(matches!(
        errors.iter().next(),
        Some(BindError::Binding(BindingError::BodyRead { reason })) if reason == "request cancelled"
    ));
    assert_eq!(outcome.stage, BindStage::Finalized);
}

#[derive(Bindable, Debug, Default)]
struct Secured {
    #[bind(header = "apikey,required")]
    api_key: String,
    #[bind(header = "x-trace")]
    trace: Option<String>,
}

#[test]
fn test_required_header() {
    let descriptor = RequestDescriptor::<Secured>::build("/secure").expect("valid");

    let outcome = TestRequest::get("/secure").bind(&descriptor);
    let errors = expect_errors(&outcome);
    assert_eq!(
        errors.iter().next(),
        Some(&BindError::Binding(BindingError::MissingHeader {
            name: "apikey".to_string()
        }))
    );

    let outcome = TestRequest::get("/secure")
        .header("apikey", "  Spaced Value ")
        .bind(&descriptor);
    assert!(outcome.is_ok());
    assert_eq!(outcome.value.api_key, "  Spaced Value ");
    assert_eq!(outcome.value.trace, None);
}

#[test]
fn test_non_ascii_header_is_rejected() {
    let descriptor = RequestDescriptor::<Secured>::build("/secure").expect("valid");
    let outcome = TestRequest::get("/secure")
        .header_bytes("apikey", "clé".as_bytes())
        .bind(&descriptor);
    let errors = expect_errors(&outcome);
    assert!(matches!(
        errors.iter().next(),
        Some(BindError::Binding(BindingError::InvalidHeader { .. }))
    ));
}

#[derive(Bindable, Debug, Default)]
struct Search {
    #[bind(query = "q,required")]
    term: String,
    #[bind(query = "page")]
    page: u16,
    #[bind(query = "timeout")]
    timeout: Option<Duration>,
    #[bind(query = "exact")]
    exact: bool,
}

#[test]
fn test_query_binding() {
    let descriptor = RequestDescriptor::<Search>::build("/search").expect("valid");
    let outcome = TestRequest::get("/search?q=rust+lang&page=0x10&timeout=1m30s&q=ignored")
        .bind(&descriptor);
    assert!(outcome.is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.value.term, "rust lang");
    assert_eq!(outcome.value.page, 16);
    assert_eq!(outcome.value.timeout, Some(Duration::from_secs(90)));
    assert!(!outcome.value.exact);
}

#[test]
fn test_absent_query_values() {
    let descriptor = RequestDescriptor::<Search>::build("/search").expect("valid");
    let outcome = TestRequest::get("/search?q=&page=").bind(&descriptor);
    let errors = expect_errors(&outcome);
    assert_eq!(errors.len(), 1);
    assert_mentions(errors, "missing required query parameter q");
    assert_eq!(outcome.value.page, 0);
}

#[derive(Bindable, Debug, Default)]
struct Everything {
    #[bind(path = "id")]
    id: u8,
    #[bind(query = "limit")]
    limit: u8,
    #[bind(header = "x-count")]
    count: i16,
    #[bind(query = "name", validate = "min=3")]
    name: String,
}

#[test]
fn test_errors_accumulate_across_stages() {
    let descriptor = RequestDescriptor::<Everything>::build("/things/:id").expect("valid");
    let outcome = TestRequest::get("/things/300?limit=-1&name=ab")
        .header("x-count", "many")
        .bind(&descriptor);
    let errors = expect_errors(&outcome);
    assert_eq!(coercion_fields(errors), vec!["id", "limit", "count"]);
    assert_eq!(errors.len(), 4);
    assert!(matches!(
        errors.iter().last(),
        Some(BindError::Validation(ValidationError::Rule { field, rule })) if field == "name" && rule == "min"
    ));
    assert_eq!(errors.to_string().lines().count(), 4);
}

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Address {
    city: String,
}

#[derive(Bindable, Debug, Default)]
struct Profile {
    #[bind(body)]
    addresses: Vec<Address>,
}

#[derive(Bindable, Debug, Default)]
struct Settings {
    #[bind(body)]
    values: HashMap<String, i32>,
}

#[test]
fn test_decoded_bodies_by_content_type() {
    let profile = RequestDescriptor::<Profile>::build("/profile").expect("valid");
    let outcome = TestRequest::post("/profile")
        .content_type("application/yaml")
        .body("- city: Oslo\n- city: Lima\n")
        .bind(&profile);
    assert!(outcome.is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.value.addresses.len(), 2);

    let settings = RequestDescriptor::<Settings>::build("/settings").expect("valid");
    let outcome = TestRequest::post("/settings").body(r#"{"a":1,"b":2}"#).bind(&settings);
    assert_eq!(outcome.value.values.get("b"), Some(&2));

    let outcome = TestRequest::post("/settings")
        .content_type("application/json")
        .body("{not json")
        .bind(&settings);
    assert!(matches!(
        expect_errors(&outcome).iter().next(),
        Some(BindError::Binding(BindingError::Decode { format: "JSON", .. }))
    ));
}

#[test]
fn test_unknown_content_type_keeps_raw_payload() {
    let settings = RequestDescriptor::<Settings>::build("/settings").expect("valid");
    let outcome = TestRequest::post("/settings")
        .content_type("application/msgpack")
        .body(vec![0x81_u8, 0xa1, 0x61, 0x01])
        .bind(&settings);
    assert!(outcome.is_ok());
    assert!(outcome.value.values.is_empty());
    let raw = outcome.raw_body.expect("raw payload kept");
    assert_eq!(raw.content_type(), Some("application/msgpack"));
    assert_eq!(raw.bytes().len(), 4);
}

#[derive(Bindable, Debug, Default)]
#[bind(validate_self, post_parse)]
struct Lenient {
    #[bind(query = "n")]
    n: i32,
    #[bind(path = "id")]
    id: i32,
    hook_ran: bool,
}

impl Validatable for Lenient {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.n < 0 {
            return Err(ValidationError::custom("n must not be negative"));
        }
        Ok(())
    }
}

impl PostParseHook for Lenient {
    fn post_parse(&mut self, outcome: Result<(), BindErrors>) -> Result<(), BindErrors> {
        self.hook_ran = true;
        match outcome {
            Err(errors) if errors.iter().all(|e| matches!(e, BindError::Coercion(_))) => Ok(()),
            other => other,
        }
    }
}

#[test]
fn test_post_parse_may_clear_errors() {
    let descriptor = RequestDescriptor::<Lenient>::build("/lenient/:id").expect("valid");

    let outcome = TestRequest::get("/lenient/1?n=oops").bind(&descriptor);
    assert!(outcome.is_ok());
    assert!(outcome.value.hook_ran);

    let outcome = TestRequest::get("/lenient/1?n=-4").bind(&descriptor);
    assert_mentions(expect_errors(&outcome), "n must not be negative");
}

#[test]
fn test_hooks_do_not_run_after_path_mismatch() {
    let descriptor = RequestDescriptor::<Lenient>::build("/lenient/:id").expect("valid");
    let outcome = TestRequest::get("/other/1").bind(&descriptor);
    assert!(outcome.result.is_err());
    assert!(!outcome.value.hook_ran);
}

#[test]
fn test_malformed_path_encoding() {
    let descriptor = RequestDescriptor::<Lenient>::build("/lenient/:id").expect("valid");
    let outcome = TestRequest::get("/lenient/%FF").bind(&descriptor);
    assert!(matches!(
        expect_errors(&outcome).iter().next(),
        Some(BindError::Binding(BindingError::InvalidPathEncoding { .. }))
    ));
}
