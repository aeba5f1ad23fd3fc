use super::request::{parse_request, RequestError};
use super::response::{write_response, HttpResponse};
use crate::dispatcher::Dispatcher;
use crate::status::Status;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::error;

/// `may_minihttp` service adapter around a shared [`Dispatcher`].
#[derive(Clone)]
pub struct AppService {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let response = match parse_request(req, self.dispatcher.max_body_bytes()) {
            Ok(raw) => self.dispatcher.serve(raw),
            Err(RequestError::BodyTooLarge { .. }) => {
                HttpResponse::error(&Status::payload_too_large())
            }
            Err(e) => {
                error!(error = %e, "Failed to read request");
                HttpResponse::error(&Status::bad_request())
            }
        };
        write_response(res, response);
        Ok(())
    }
}
