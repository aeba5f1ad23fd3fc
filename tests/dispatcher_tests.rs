use routectx::context::FORM_URLENCODED;
use routectx::router::{HttpMethod, RouteRegistrar, Router};
use routectx::server::RawRequest;
use routectx::static_files::StaticFiles;
use routectx::{Dispatcher, Status};
use serde::Deserialize;

mod common;
use common::fixtures::sample_router;

const NOT_FOUND_BODY: &str =
    r#"{"status":404,"error":"Not Found","error_description":"Not Found"}"#;

#[test]
fn test_registered_route_returns_handler_output() {
    let d = Dispatcher::new(sample_router());
    let resp = d.serve(RawRequest::new("GET", "/sample"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_str(), r#"{"apple":"apple"}"#);
    assert_eq!(resp.header("content-type"), Some("application/json"));
}

#[test]
fn test_unregistered_path_is_404() {
    let d = Dispatcher::new(sample_router());
    let resp = d.serve(RawRequest::new("GET", "/nothing"));
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body_str(), NOT_FOUND_BODY);
}

#[test]
fn test_wrong_method_on_known_path_is_404() {
    let d = Dispatcher::new(sample_router());
    assert_eq!(d.serve(RawRequest::new("DELETE", "/sample")).status, 404);
}

#[test]
fn test_method_outside_allow_list_is_405() {
    let d = Dispatcher::new(sample_router()).with_allow_methods([
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ]);
    let resp = d.serve(RawRequest::new("LINK", "/token"));
    assert_eq!(resp.status, 405);
    assert_eq!(
        resp.body_str(),
        r#"{"status":405,"error":"Method Not Allowed","error_description":"Method Not Allowed"}"#
    );

    assert_eq!(d.serve(RawRequest::new("PUT", "/sample")).status, 405);
}

#[test]
fn test_empty_urlencoded_post_is_503() {
    let d = Dispatcher::new(sample_router());
    let raw = RawRequest::new("POST", "/sample").with_header("content-type", FORM_URLENCODED);
    let resp = d.serve(raw);
    assert_eq!(resp.status, 503);
    assert_eq!(
        resp.body_str(),
        r#"{"status":503,"error":"Service Unavailable","error_description":"Service Unavailable"}"#
    );
}

#[test]
fn test_malformed_multipart_is_503_without_invoking_handler() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let mut builder = Router::builder();
    builder
        .post("/upload", move |_| flag.store(true, Ordering::SeqCst))
        .unwrap();
    let d = Dispatcher::new(builder.build());

    let raw = RawRequest::new("POST", "/upload")
        .with_header("Content-Type", "multipart/form-data; boundary=zz")
        .with_body("not multipart");
    assert_eq!(d.serve(raw).status, 503);
    assert!(!invoked.load(Ordering::SeqCst));
}

#[test]
fn test_form_post_reaches_handler_with_bound_values() {
    #[derive(Deserialize)]
    struct ProfileForm {
        #[serde(rename = "userID")]
        user_id: String,
        #[serde(rename = "profileID")]
        profile_id: i64,
    }

    let mut builder = Router::builder();
    builder
        .group_route("/user/profile", |g| {
            g.post("/{profileID}", |ctx| {
                let form: ProfileForm = ctx.bind_form().unwrap();
                let text = format!(
                    "{}:{}:{}",
                    form.user_id,
                    form.profile_id,
                    ctx.path_param("profileID").unwrap_or_default()
                );
                ctx.output_text(&Status::ok(), &text);
            })?;
            Ok(())
        })
        .unwrap();
    let d = Dispatcher::new(builder.build());

    let raw = RawRequest::new("POST", "/user/profile/9")
        .with_header("Content-Type", FORM_URLENCODED)
        .with_body("userID=1&profileID=2");
    let resp = d.serve(raw);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_str(), "1:2:9");
}

#[test]
fn test_path_is_normalized_before_matching() {
    let d = Dispatcher::new(sample_router());
    assert_eq!(d.serve(RawRequest::new("GET", "//sample/")).status, 200);
    assert_eq!(d.serve(RawRequest::new("GET", "/x/../sample")).status, 200);
    assert_eq!(d.serve(RawRequest::new("get", "/sample?q=1")).status, 200);
}

#[test]
fn test_panicking_handler_is_500() {
    let mut builder = Router::builder();
    builder.get("/boom", |_| panic!("handler failure")).unwrap();
    let d = Dispatcher::new(builder.build());

    let resp = d.serve(RawRequest::new("GET", "/boom"));
    assert_eq!(resp.status, 500);
    assert_eq!(
        resp.body_str(),
        r#"{"status":500,"error":"Internal Server Error","error_description":"Internal Server Error"}"#
    );
}

#[test]
fn test_oversized_body_is_413() {
    let d = Dispatcher::new(sample_router()).with_max_body_bytes(4);
    let raw = RawRequest::new("POST", "/sample").with_body("12345");
    assert_eq!(d.serve(raw).status, 413);
}

#[test]
fn test_static_prefix_without_directory_is_404() {
    let d = Dispatcher::new(sample_router());
    let resp = d.serve(RawRequest::new("GET", "/resources/README"));
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body_str(), NOT_FOUND_BODY);
}

#[test]
fn test_static_files_served_under_prefix() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("LICENSE"), "MIT").unwrap();
    std::fs::write(dir.path().join("app.js"), "let a = 1;").unwrap();

    let d = Dispatcher::new(sample_router())
        .with_static_files(Some(StaticFiles::new(dir.path())));

    let resp = d.serve(RawRequest::new("GET", "/resources/app.js"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("application/javascript"));
    assert_eq!(resp.body_str(), "let a = 1;");

    let resp = d.serve(RawRequest::new("HEAD", "/resources/LICENSE"));
    assert_eq!(resp.status, 200);
    assert!(resp.body.is_empty());

    assert_eq!(
        d.serve(RawRequest::new("GET", "/resources/missing")).status,
        404
    );
    assert_eq!(
        d.serve(RawRequest::new("POST", "/resources/LICENSE").with_body("x"))
            .status,
        404
    );
    assert_eq!(
        d.serve(RawRequest::new("GET", "/resources/%2e%2e/Cargo.toml"))
            .status,
        404
    );
}

#[test]
fn test_every_response_carries_request_id() {
    let d = Dispatcher::new(sample_router());
    for raw in [
        RawRequest::new("GET", "/sample"),
        RawRequest::new("GET", "/missing"),
        RawRequest::new("LINK", "/sample"),
    ] {
        let resp = d.serve(raw);
        let id = resp.header("x-request-id").unwrap();
        assert!(id.parse::<routectx::RequestId>().is_ok());
    }
}
