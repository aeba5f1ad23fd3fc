//! # routectx
//!
//! **routectx** is a regex-based HTTP request router with a per-request
//! context for parameter parsing, struct binding and response writing, served
//! on the `may` coroutine runtime.
//!
//! ## Overview
//!
//! Handlers are registered against route templates such as
//! `/user/profile/{profileID}`. Each template compiles to an anchored regular
//! expression with one named capture per placeholder; literal text passes
//! through as regex, so `/user/profile(.htm[l]?)?` is a valid template too.
//! Handlers for different methods on the same template share a single route.
//!
//! For every matched request a [`RequestContext`] is built that holds:
//! - the lower-cased method and normalized path
//! - headers keyed by lower-cased name
//! - path parameters
//! - one map of query and form parameters (URL-encoded or multipart)
//! - the raw body for JSON binding
//!
//! ## Architecture
//!
//! - **[`router`]** - Template compilation, grouping and route matching
//! - **[`context`]** - Request context construction, binding and output helpers
//! - **[`dispatcher`]** - Allow-list, static resources, routing and error responses
//! - **[`server`]** - `may_minihttp` transport
//! - **[`config`]** - YAML configuration with environment overrides
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`static_files`]** - Static file serving utilities
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as server::AppService
//!     participant Dispatcher
//!     participant Router
//!     participant Handler
//!
//!     Client->>Service: HTTP request
//!     Service->>Dispatcher: serve(RawRequest)
//!     Dispatcher->>Dispatcher: allow-list / body limit / static prefix
//!     Dispatcher->>Router: match_route(method, path)
//!     Router-->>Dispatcher: RouteMatch + path params
//!     Dispatcher->>Dispatcher: RequestContext::from_raw
//!     Dispatcher->>Handler: invoke(&mut ctx)
//!     Handler->>Handler: bind_form / bind_json / output_*
//!     Dispatcher-->>Service: HttpResponse
//!     Service-->>Client: status, headers, body
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use routectx::router::{RouteRegistrar, Router};
//! use routectx::server::RawRequest;
//! use routectx::{Dispatcher, Status};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct ProfileForm {
//!     #[serde(rename = "userID")]
//!     user_id: String,
//!     #[serde(rename = "profileID")]
//!     profile_id: i64,
//! }
//!
//! # fn main() -> Result<(), routectx::router::RouteError> {
//! let mut builder = Router::builder();
//! builder.group_route("/user/profile", |g| {
//!     g.post("/{profileID}", |ctx| {
//!         let form: ProfileForm = ctx.bind_form().unwrap();
//!         let text = format!("{} {}", form.user_id, form.profile_id);
//!         ctx.output_text(&Status::ok(), &text);
//!     })?;
//!     Ok(())
//! })?;
//! let dispatcher = Dispatcher::new(builder.build());
//!
//! let response = dispatcher.serve(
//!     RawRequest::new("POST", "/user/profile/2")
//!         .with_header("Content-Type", "application/x-www-form-urlencoded")
//!         .with_body("userID=1&profileID=2"),
//! );
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, b"1 2");
//! # Ok(())
//! # }
//! ```
//!
//! To serve over HTTP wrap the dispatcher in a [`server::AppService`] and
//! start it with [`server::HttpServer`]:
//!
//! ```rust,no_run
//! use routectx::server::{AppService, HttpServer};
//! use routectx::{Dispatcher, Router};
//! use std::sync::Arc;
//!
//! let dispatcher = Arc::new(Dispatcher::new(Router::builder().build()));
//! let handle = HttpServer(AppService::new(dispatcher)).start("127.0.0.1:8080").unwrap();
//! handle.wait_ready().unwrap();
//! handle.join().unwrap();
//! ```
//!
//! ## Configuration
//!
//! | Variable | Purpose |
//! |----------|---------|
//! | `ROUTECTX_ADDR` | listen address |
//! | `ROUTECTX_ALLOW_METHODS` | comma separated allow-list |
//! | `ROUTECTX_STATIC_DIR` | static resource directory |
//! | `ROUTECTX_STACK_SIZE` | coroutine stack size, decimal or `0x` hex |
//! | `ROUTECTX_MAX_BODY_BYTES` | request body limit |
//! | `ROUTECTX_LOG_LEVEL` / `ROUTECTX_LOG_FORMAT` | logging |

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod router;
pub mod server;
pub mod static_files;
pub mod status;

pub use context::{BindError, ContentError, RequestContext};
pub use dispatcher::Dispatcher;
pub use ids::RequestId;
pub use router::{HttpMethod, RouteError, RouteRegistrar, Router, RouterBuilder};
pub use status::Status;
