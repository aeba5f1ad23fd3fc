//! Route table construction and lookup.
//!
//! Registration goes through [`RouterBuilder`] and [`RouteGroup`], both of
//! which implement [`RouteRegistrar`]. A group carries its own fully
//! concatenated prefix, so nesting needs no shared prefix stack and leaving
//! a group scope restores the enclosing prefix by construction. Once built,
//! a [`Router`] is immutable and can be shared across request coroutines
//! without locking.

use super::{Handler, HttpMethod, PathPattern, Route, RouteError, RouteMatch};
use crate::context::RequestContext;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Registration surface shared by the builder and route groups.
///
/// `prefix` is prepended to every template; the builder's prefix is empty.
pub trait RouteRegistrar {
    /// Fully concatenated prefix of this registration scope.
    fn prefix(&self) -> &str;

    #[doc(hidden)]
    fn builder(&mut self) -> &mut RouterBuilder;

    /// Bind `handler` for `method` at `prefix + template`.
    ///
    /// Templates that compile to the same pattern as an existing route are
    /// merged into that route; otherwise a new route is appended and gets
    /// lower match priority than everything registered before it.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] or [`RouteError::DuplicateMethod`].
    fn bind_route<F>(
        &mut self,
        method: HttpMethod,
        template: &str,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
        Self: Sized,
    {
        let qualified = format!("{}{}", self.prefix(), template);
        self.builder().bind_qualified(method, &qualified, Arc::new(handler))?;
        Ok(self)
    }

    /// Register the routes issued by `body` beneath `prefix`.
    ///
    /// Nested groups concatenate prefixes in nesting order.
    ///
    /// # Errors
    ///
    /// Propagates the first registration error raised inside `body`.
    fn group_route<F>(&mut self, prefix: &str, body: F) -> Result<&mut Self, RouteError>
    where
        F: FnOnce(&mut RouteGroup<'_>) -> Result<(), RouteError>,
        Self: Sized,
    {
        let prefix = format!("{}{}", self.prefix(), prefix);
        let mut group = RouteGroup {
            builder: self.builder(),
            prefix,
        };
        body(&mut group)?;
        Ok(self)
    }

    fn get<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
        Self: Sized,
    {
        self.bind_route(HttpMethod::Get, template, handler)
    }

    fn post<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
        Self: Sized,
    {
        self.bind_route(HttpMethod::Post, template, handler)
    }

    fn put<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
        Self: Sized,
    {
        self.bind_route(HttpMethod::Put, template, handler)
    }

    fn patch<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
        Self: Sized,
    {
        self.bind_route(HttpMethod::Patch, template, handler)
    }

    fn delete<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
        Self: Sized,
    {
        self.bind_route(HttpMethod::Delete, template, handler)
    }
}

/// Mutable route table used during the single-threaded registration phase.
#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes registered so far, in priority order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn bind_qualified(
        &mut self,
        method: HttpMethod,
        template: &str,
        handler: Handler,
    ) -> Result<(), RouteError> {
        let pattern = PathPattern::compile(template)?;

        if let Some(route) = self
            .routes
            .iter_mut()
            .find(|r| r.pattern_source() == pattern.as_str())
        {
            route.bind_handler(method, handler)?;
            debug!(
                method = %method,
                template = %template,
                pattern = %route.pattern_source(),
                "Handler merged into existing route"
            );
            return Ok(());
        }

        let mut route = Route::new(pattern);
        route.bind_handler(method, handler)?;
        debug!(
            method = %method,
            template = %template,
            pattern = %route.pattern_source(),
            param_names = ?route.param_names(),
            priority = self.routes.len(),
            "Route registered"
        );
        self.routes.push(route);
        Ok(())
    }

    /// Freeze the table.
    #[must_use]
    pub fn build(self) -> Router {
        let routes_summary: Vec<String> = self
            .routes
            .iter()
            .take(10)
            .map(|r| {
                let methods: Vec<&str> = r.methods().map(HttpMethod::as_str).collect();
                format!("{} {}", methods.join("|"), r.pattern_source())
            })
            .collect();

        info!(
            routes_count = self.routes.len(),
            routes_summary = ?routes_summary,
            routing_algorithm = "ordered_regex_scan",
            "Routing table loaded"
        );

        Router {
            routes: self.routes,
        }
    }
}

impl RouteRegistrar for RouterBuilder {
    fn prefix(&self) -> &str {
        ""
    }

    fn builder(&mut self) -> &mut RouterBuilder {
        self
    }
}

/// Registration scope created by [`RouteRegistrar::group_route`].
#[derive(Debug)]
pub struct RouteGroup<'a> {
    builder: &'a mut RouterBuilder,
    prefix: String,
}

impl RouteRegistrar for RouteGroup<'_> {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn builder(&mut self) -> &mut RouterBuilder {
        &mut *self.builder
    }
}

/// Immutable, ordered route table.
///
/// Lookup is a linear scan in registration order; the first route whose
/// pattern matches the path *and* has a handler for the method wins.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Log every registered route.
    pub fn dump_routes(&self) {
        info!(count = self.routes.len(), "Registered routes");
        for (priority, route) in self.routes.iter().enumerate() {
            let methods: Vec<&str> = route.methods().map(HttpMethod::as_str).collect();
            info!(
                priority = priority,
                methods = ?methods,
                pattern = %route.pattern_source(),
                "Route"
            );
        }
    }

    /// Find the first route matching `method` and the normalized `path`.
    ///
    /// `None` covers both an unknown path and a known path whose route has no
    /// handler for `method`.
    #[must_use]
    pub fn match_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_>> {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let result = self.routes.iter().find_map(|r| r.match_path(method, path));
        let match_duration = match_start.elapsed();

        match &result {
            Some(matched) if match_duration > Duration::from_millis(1) => {
                warn!(
                    method = %method,
                    path = %path,
                    route_pattern = %matched.route.pattern_source(),
                    duration_us = match_duration.as_micros(),
                    "Slow route matching detected"
                );
            }
            Some(matched) => {
                info!(
                    method = %method,
                    path = %path,
                    route_pattern = %matched.route.pattern_source(),
                    path_params = ?matched.path_params,
                    duration_us = match_duration.as_micros(),
                    "Route matched"
                );
            }
            None => {
                warn!(
                    method = %method,
                    path = %path,
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
            }
        }

        result
    }
}
