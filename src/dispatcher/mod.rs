//! # Dispatcher Module
//!
//! Turns a [`RawRequest`](crate::server::RawRequest) into an
//! [`HttpResponse`](crate::server::HttpResponse).
//!
//! ## Overview
//!
//! The dispatcher sits between the transport and the [`Router`](crate::router::Router). It:
//! - Rejects methods outside the configured allow-list (405)
//! - Rejects bodies above the size limit (413)
//! - Serves or refuses the static resource prefix (404)
//! - Refuses a declared form encoding with no body on POST/PUT/PATCH (503)
//! - Matches the route (404 on a miss)
//! - Builds the [`RequestContext`](crate::context::RequestContext), answering 503
//!   when a multipart body cannot be decoded
//! - Invokes the handler, recovering panics as 500
//!
//! Error responses use the JSON error body:
//!
//! ```json
//! {"status":404,"error":"Not Found","error_description":"Not Found"}
//! ```
//!
//! A route whose path matches but that has no handler for the method is a
//! plain 404, the same as an unknown path.
//!
//! ## Example
//!
//! ```rust
//! use routectx::dispatcher::Dispatcher;
//! use routectx::router::{RouteRegistrar, Router};
//! use routectx::server::RawRequest;
//! use routectx::Status;
//!
//! let mut builder = Router::builder();
//! builder.get("/sample", |ctx| ctx.output_text(&Status::ok(), "Sample test!")).unwrap();
//! let dispatcher = Dispatcher::new(builder.build());
//!
//! let response = dispatcher.serve(RawRequest::new("GET", "/sample"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, b"Sample test!");
//!
//! let response = dispatcher.serve(RawRequest::new("LINK", "/sample"));
//! assert_eq!(response.status, 405);
//! ```

mod core;

pub use core::Dispatcher;
