//! HTTP transport: request extraction, response writing and the
//! `may_minihttp` server wrapper.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{
    content_length, header_map, normalize_path, parse_query_params, parse_request, RawRequest,
    RequestError,
};
pub use response::{
    write_response, HeaderError, HeaderVec, HttpResponse, ResponseWriter, MAX_HANDLER_HEADERS,
    MAX_RESPONSE_HEADERS,
};
pub use service::AppService;
