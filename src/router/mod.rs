//! # Router Module
//!
//! Path matching and route resolution.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling route templates such as `/user/{profileID}` into anchored regex patterns
//! - Grouping registrations under shared prefixes
//! - Merging handlers for different methods on the same template into one route
//! - Matching incoming requests and extracting named path parameters
//!
//! ## Architecture
//!
//! 1. **Registration**: templates are compiled once at startup through
//!    [`RouterBuilder`] / [`RouteGroup`]. Errors (bad templates, a method bound
//!    twice on one route) are returned as [`RouteError`] so startup can abort.
//!
//! 2. **Matching**: [`Router::match_route`] scans routes in registration order and
//!    returns the first one whose pattern matches the path and that has a handler
//!    for the method.
//!
//! ## Example
//!
//! ```rust
//! use routectx::router::{HttpMethod, RouteRegistrar, Router};
//!
//! # fn main() -> Result<(), routectx::router::RouteError> {
//! let mut builder = Router::builder();
//! builder.group_route("/user/profile", |g| {
//!     g.get("", |_ctx| {})?;
//!     g.get("/{profileID}", |_ctx| {})?;
//!     g.post("/{profileID}", |_ctx| {})?;
//!     Ok(())
//! })?;
//! let router = builder.build();
//!
//! assert_eq!(router.len(), 2);
//! let matched = router.match_route(HttpMethod::Post, "/user/profile/42").unwrap();
//! assert_eq!(matched.get_path_param("profileID"), Some("42"));
//! # Ok(())
//! # }
//! ```

mod core;
mod error;
mod method;
mod pattern;
mod route;

use crate::context::RequestContext;
use smallvec::SmallVec;
use std::sync::Arc;

pub use core::{RouteGroup, RouteRegistrar, Router, RouterBuilder};
pub use error::RouteError;
pub use method::{HttpMethod, MethodMap, UnknownMethod};
pub use pattern::PathPattern;
pub use route::{Route, RouteMatch};

/// Maximum number of path parameters stored inline before spilling to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Named path captures in declaration order.
///
/// Names are shared with the compiled pattern; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Application request handler.
pub type Handler = Arc<dyn Fn(&mut RequestContext) + Send + Sync>;
