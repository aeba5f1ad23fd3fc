use routectx::router::{HttpMethod, RouteError, RouteRegistrar, Router};

fn noop(_: &mut routectx::RequestContext) {}

#[test]
fn test_literal_template_matches_only_its_path() {
    let mut builder = Router::builder();
    builder.get("/user/profile", noop).unwrap();
    let router = builder.build();

    for path in ["/user/profile", "/user/profile/"] {
        let matched = router.match_route(HttpMethod::Get, path).unwrap();
        assert!(matched.path_params.is_none());
    }
    for path in ["/user", "/user/profile/1", "/user/profiles", "/"] {
        assert!(router.match_route(HttpMethod::Get, path).is_none(), "{path}");
    }
}

#[test]
fn test_placeholders_capture_one_value_each() {
    let mut builder = Router::builder();
    builder
        .get("/users/{userID}/profiles/{profileID}", noop)
        .unwrap();
    let router = builder.build();

    let matched = router
        .match_route(HttpMethod::Get, "/users/u1/profiles/42")
        .unwrap();
    let params = matched.path_params.as_ref().unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!(matched.get_path_param("userID"), Some("u1"));
    assert_eq!(matched.get_path_param("profileID"), Some("42"));

    assert!(router
        .match_route(HttpMethod::Get, "/users/u1/profiles")
        .is_none());
    assert!(router
        .match_route(HttpMethod::Get, "/users/u1/profiles/42/extra")
        .is_none());
}

#[test]
fn test_get_and_post_under_group_share_one_route() {
    let mut builder = Router::builder();
    builder
        .group_route("/user/profile", |g| {
            g.get("", noop)?;
            g.post("", noop)?;
            Ok(())
        })
        .unwrap();
    let router = builder.build();

    assert_eq!(router.len(), 1);
    let route = &router.routes()[0];
    assert_eq!(route.pattern_source(), "^/user/profile/?$");
    let methods: Vec<HttpMethod> = route.methods().collect();
    assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Post]);
}

#[test]
fn test_group_and_flat_registration_merge() {
    let mut builder = Router::builder();
    builder
        .group_route("/user/profile", |g| {
            g.get("/{profileID}", noop)?;
            Ok(())
        })
        .unwrap();
    builder.post("/user/profile/{profileID}", noop).unwrap();
    let router = builder.build();

    assert_eq!(router.len(), 1);
    assert!(router.routes()[0].has_handler(HttpMethod::Post));
}

#[test]
fn test_duplicate_binding_is_rejected() {
    let mut builder = Router::builder();
    builder.get("/sample", noop).unwrap();
    let err = builder.get("/sample", noop).unwrap_err();
    match err {
        RouteError::DuplicateMethod { method, pattern } => {
            assert_eq!(method, HttpMethod::Get);
            assert_eq!(pattern, "^/sample/?$");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_inside_group_propagates() {
    let mut builder = Router::builder();
    let result = builder.group_route("/a", |g| {
        g.delete("/b", noop)?;
        g.delete("/b/", noop)?;
        Ok(())
    });
    assert!(matches!(result, Err(RouteError::DuplicateMethod { .. })));
}

#[test]
fn test_invalid_template_is_an_error() {
    let mut builder = Router::builder();
    let err = builder.get("/broken[", noop).unwrap_err();
    assert!(matches!(err, RouteError::InvalidPattern { .. }));
    assert!(err.to_string().contains("/broken["));
    assert!(builder.routes().is_empty());
}

#[test]
fn test_regex_group_template() {
    let mut builder = Router::builder();
    builder
        .group_route("/user/profile(.htm[l]?)?", |g| {
            g.get("", noop)?;
            Ok(())
        })
        .unwrap();
    let router = builder.build();

    for path in ["/user/profile", "/user/profile.htm", "/user/profile.html"] {
        assert!(router.match_route(HttpMethod::Get, path).is_some(), "{path}");
    }
    assert!(router
        .match_route(HttpMethod::Get, "/user/profile.json")
        .is_none());
}

#[test]
fn test_wrong_method_is_indistinguishable_from_miss() {
    let mut builder = Router::builder();
    builder.put("/items/{id}", noop).unwrap();
    let router = builder.build();

    assert!(router.match_route(HttpMethod::Put, "/items/1").is_some());
    assert!(router.match_route(HttpMethod::Patch, "/items/1").is_none());
    assert!(router.match_route(HttpMethod::Patch, "/nothing").is_none());
}

#[test]
fn test_router_is_shareable_across_threads() {
    let mut builder = Router::builder();
    builder.get("/items/{id}", noop).unwrap();
    let router = std::sync::Arc::new(builder.build());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let router = std::sync::Arc::clone(&router);
            std::thread::spawn(move || {
                let path = format!("/items/{i}");
                let matched = router.match_route(HttpMethod::Get, &path).unwrap();
                matched.get_path_param("id").map(str::to_string)
            })
        })
        .collect();

    for (i, h) in handles.into_iter().enumerate() {
        assert_eq!(h.join().unwrap(), Some(i.to_string()));
    }
}
