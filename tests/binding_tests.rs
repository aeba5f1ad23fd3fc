use routectx::context::FORM_URLENCODED;
use routectx::server::RawRequest;
use routectx::{BindError, RequestContext, Status};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct ProfileForm {
    #[serde(rename = "userID")]
    user_id: String,
    #[serde(rename = "profileID")]
    profile_id: i64,
}

fn form_ctx(body: &str) -> RequestContext {
    let raw = RawRequest::new("POST", "/user/profile")
        .with_header("Content-Type", FORM_URLENCODED)
        .with_body(body);
    RequestContext::new(raw).unwrap()
}

#[test]
fn test_bind_form_from_urlencoded_body() {
    let ctx = form_ctx("userID=1&profileID=2");
    let form: ProfileForm = ctx.bind_form().unwrap();
    assert_eq!(
        form,
        ProfileForm {
            user_id: "1".to_string(),
            profile_id: 2,
        }
    );
}

#[test]
fn test_bind_form_from_query() {
    let ctx = RequestContext::new(RawRequest::new("GET", "/p?profileID=7")).unwrap();
    let form: ProfileForm = ctx.bind_form().unwrap();
    assert_eq!(form.user_id, "");
    assert_eq!(form.profile_id, 7);
}

#[test]
fn test_bind_form_best_effort() {
    let ctx = form_ctx("userID=abc&profileID=twelve");
    let form: ProfileForm = ctx.bind_form().unwrap();
    assert_eq!(form.user_id, "abc");
    assert_eq!(form.profile_id, 0);
}

#[test]
fn test_bind_form_without_params() {
    let ctx = RequestContext::new(RawRequest::new("GET", "/")).unwrap();
    let form: ProfileForm = ctx.bind_form().unwrap();
    assert_eq!(form.user_id, "");
    assert_eq!(form.profile_id, 0);
}

#[test]
fn test_bind_json_status() {
    let body = serde_json::to_vec(&Status::ok()).unwrap();
    let raw = RawRequest::new("POST", "/status")
        .with_header("Content-Type", "application/json")
        .with_body(body);
    let mut ctx = RequestContext::new(raw).unwrap();
    let status: Status = ctx.bind_json().unwrap();
    assert_eq!(status.code, 200);
    assert_eq!(status.description, "OK");
}

#[test]
fn test_bind_json_malformed() {
    let raw = RawRequest::new("POST", "/status")
        .with_header("Content-Type", "application/json")
        .with_body("{not json");
    let mut ctx = RequestContext::new(raw).unwrap();
    let err = ctx.bind_json::<Status>().unwrap_err();
    assert!(matches!(err, BindError::Json(_)));
}

#[test]
fn test_bind_json_shape_mismatch() {
    let raw = RawRequest::new("POST", "/status")
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"status":"two hundred"}"#);
    let mut ctx = RequestContext::new(raw).unwrap();
    assert!(matches!(
        ctx.bind_json::<Status>(),
        Err(BindError::Json(_))
    ));
}

#[test]
fn test_bind_json_empty_body_fails() {
    let mut ctx = RequestContext::new(RawRequest::new("POST", "/status")).unwrap();
    assert!(ctx.bind_json::<Status>().is_err());
}
