//! Request pipeline from a [`RawRequest`] to an [`HttpResponse`].

use crate::config::ServerConfig;
use crate::context::{ensure_form_body, RequestContext};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::{HttpMethod, MethodMap, Router};
use crate::server::request::{normalize_path, RawRequest};
use crate::server::response::HttpResponse;
use crate::static_files::StaticFiles;
use crate::status::Status;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Transport-neutral dispatcher.
///
/// Immutable once built; one instance is shared by every request coroutine.
#[derive(Debug)]
pub struct Dispatcher {
    router: Router,
    allow_methods: MethodMap<()>,
    static_prefix: String,
    static_files: Option<StaticFiles>,
    max_body_bytes: usize,
}

impl Dispatcher {
    /// Dispatcher with the default allow-list, static prefix and body limit.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self::from_config(router, &ServerConfig::default())
    }

    #[must_use]
    pub fn from_config(router: Router, config: &ServerConfig) -> Self {
        let dispatcher = Self {
            router,
            allow_methods: MethodMap::new(),
            static_prefix: String::new(),
            static_files: config.static_dir.clone().map(StaticFiles::new),
            max_body_bytes: config.max_body_bytes,
        }
        .with_allow_methods(config.allow_methods.iter().copied())
        .with_static_prefix(&config.static_prefix);

        info!(
            routes_count = dispatcher.router.len(),
            allow_methods = ?dispatcher.allow_methods,
            static_prefix = %dispatcher.static_prefix,
            static_dir = ?dispatcher.static_files.as_ref().map(StaticFiles::base_dir),
            max_body_bytes = dispatcher.max_body_bytes,
            "Dispatcher configured"
        );
        dispatcher
    }

    /// Replace the method allow-list.
    #[must_use]
    pub fn with_allow_methods<I: IntoIterator<Item = HttpMethod>>(mut self, methods: I) -> Self {
        self.allow_methods = MethodMap::new();
        for method in methods {
            self.allow_methods.insert(method, ());
        }
        self
    }

    /// Reserve `prefix` for static resources; an empty prefix disables it.
    #[must_use]
    pub fn with_static_prefix(mut self, prefix: &str) -> Self {
        self.static_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_static_files(mut self, files: Option<StaticFiles>) -> Self {
        self.static_files = files;
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Largest request body accepted, in bytes.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn is_allowed(&self, method: HttpMethod) -> bool {
        self.allow_methods.contains(method)
    }

    /// Run the full pipeline for one request.
    ///
    /// 1. method outside the allow-list: 405
    /// 2. body over the limit: 413
    /// 3. path under the static prefix: the file or 404
    /// 4. form encoding declared on a body method with no body: 503
    /// 5. no route for method and path: 404
    /// 6. multipart body that cannot be decoded: 503
    /// 7. handler runs; a panic becomes 500, nothing written becomes 200
    ///
    /// Every response carries `x-request-id`. The `may_minihttp` adapter
    /// logs it but does not write it to the socket.
    #[must_use]
    pub fn serve(&self, raw: RawRequest) -> HttpResponse {
        let start = Instant::now();
        let request_id = RequestId::from_header_or_new(raw.header(REQUEST_ID_HEADER));

        let mut response = self.serve_inner(raw, request_id);
        response.set_header(REQUEST_ID_HEADER, request_id.to_string());

        info!(
            request_id = %request_id,
            status = response.status,
            body_size_bytes = response.body.len(),
            duration_us = start.elapsed().as_micros(),
            "Request dispatched"
        );
        response
    }

    fn serve_inner(&self, raw: RawRequest, request_id: RequestId) -> HttpResponse {
        let method = match raw.method.parse::<HttpMethod>() {
            Ok(m) if self.is_allowed(m) => m,
            _ => {
                warn!(request_id = %request_id, method = %raw.method, "Method not allowed");
                return HttpResponse::error(&Status::method_not_allowed());
            }
        };

        if raw.body.len() > self.max_body_bytes {
            warn!(
                request_id = %request_id,
                body_size_bytes = raw.body.len(),
                max_body_bytes = self.max_body_bytes,
                "Request body too large"
            );
            return HttpResponse::error(&Status::payload_too_large());
        }

        let path = normalize_path(raw.path());

        if let Some(rest) = self.static_path(&path) {
            return self.serve_static(method, rest, request_id);
        }

        if let Err(e) = ensure_form_body(method, raw.content_type(), &raw.body) {
            warn!(request_id = %request_id, error = %e, "Request body rejected");
            return HttpResponse::error(&Status::service_unavailable());
        }

        let Some(mut matched) = self.router.match_route(method, &path) else {
            return HttpResponse::error(&Status::not_found());
        };

        let path_params = matched.path_params.take();
        let mut ctx = match RequestContext::build(raw, path_params, request_id) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Request body rejected");
                return HttpResponse::error(&Status::service_unavailable());
            }
        };

        let handler_start = Instant::now();
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| matched.invoke(&mut ctx))) {
            let panic_message = panic_message(panic.as_ref());
            error!(
                request_id = %request_id,
                route_pattern = %matched.route.pattern_source(),
                panic_message = %panic_message,
                "Handler panicked"
            );
            return HttpResponse::error(&Status::internal_server_error());
        }

        debug!(
            request_id = %request_id,
            route_pattern = %matched.route.pattern_source(),
            written = ctx.is_written(),
            execution_time_us = handler_start.elapsed().as_micros(),
            "Handler execution complete"
        );
        ctx.into_response()
    }

    /// Remainder of `path` below the static prefix, if it lies there.
    fn static_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.static_prefix.is_empty() {
            return None;
        }
        let rest = path.strip_prefix(self.static_prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    fn serve_static(&self, method: HttpMethod, rest: &str, request_id: RequestId) -> HttpResponse {
        let loaded = match (&self.static_files, method) {
            (Some(files), HttpMethod::Get | HttpMethod::Head) if !rest.is_empty() => {
                files.load(rest).ok()
            }
            _ => None,
        };

        match loaded {
            Some((bytes, content_type)) => {
                debug!(
                    request_id = %request_id,
                    file = %rest,
                    size_bytes = bytes.len(),
                    "Static resource served"
                );
                let mut response = HttpResponse::new(200);
                response.set_header("Content-Type", content_type);
                if method == HttpMethod::Get {
                    response.body = bytes;
                }
                response
            }
            None => {
                debug!(request_id = %request_id, file = %rest, "Static resource not found");
                HttpResponse::error(&Status::not_found())
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
