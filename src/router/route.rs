use super::{Handler, HttpMethod, MethodMap, ParamVec, PathPattern, RouteError};
use crate::context::RequestContext;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One compiled path pattern plus its per-method handlers.
#[derive(Clone)]
pub struct Route {
    pattern: PathPattern,
    handlers: MethodMap<Handler>,
}

impl Route {
    #[must_use]
    pub fn new(pattern: PathPattern) -> Self {
        Self {
            pattern,
            handlers: MethodMap::new(),
        }
    }

    /// Bind `handler` to `method` on this route.
    ///
    /// # Errors
    ///
    /// [`RouteError::DuplicateMethod`] when `method` already has a handler.
    pub fn bind_handler(&mut self, method: HttpMethod, handler: Handler) -> Result<(), RouteError> {
        if self.handlers.contains(method) {
            return Err(RouteError::DuplicateMethod {
                method,
                pattern: self.pattern.as_str().to_string(),
            });
        }
        self.handlers.insert(method, handler);
        Ok(())
    }

    /// Match `path` for `method`.
    ///
    /// A path that matches the pattern on a method without a handler is
    /// reported exactly like a path that does not match at all.
    #[must_use]
    pub fn match_path(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_>> {
        let handler = self.handlers.get(method)?;
        let path_params = self.pattern.captures(path)?;
        Some(RouteMatch {
            route: self,
            handler,
            path_params,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Compiled regex source, the identity used to merge registrations.
    #[must_use]
    pub fn pattern_source(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        self.pattern.param_names()
    }

    pub fn methods(&self) -> impl Iterator<Item = HttpMethod> + '_ {
        self.handlers.methods()
    }

    #[must_use]
    pub fn has_handler(&self, method: HttpMethod) -> bool {
        self.handlers.contains(method)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("methods", &self.handlers)
            .finish()
    }
}

/// Result of matching a request against the route table.
#[derive(Clone)]
pub struct RouteMatch<'a> {
    /// The route whose pattern matched
    pub route: &'a Route,
    /// Named captures, `None` when the pattern has no placeholders
    pub path_params: Option<ParamVec>,
    handler: &'a Handler,
}

impl RouteMatch<'_> {
    /// Get a path parameter by name.
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .as_ref()?
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Run the matched handler against `ctx`.
    pub fn invoke(&self, ctx: &mut RequestContext) {
        debug!(
            pattern = %self.route.pattern_source(),
            request_id = %ctx.request_id(),
            "Invoking route handler"
        );
        (self.handler)(ctx);
    }
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", &self.route.pattern_source())
            .field("path_params", &self.path_params)
            .finish()
    }
}
