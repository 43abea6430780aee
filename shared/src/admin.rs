use crate::http::{ServiceBody, empty_response, full_body};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Health/readiness endpoints served on the admin listener.
///
/// `/health` answers 200 as soon as the listener is up; `/ready` flips
/// to 200 once the owning process marks the shared flag.
#[derive(Clone)]
pub struct AdminService {
    ready: Arc<AtomicBool>,
}

impl AdminService {
    pub fn new(ready: Arc<AtomicBool>) -> Self {
        Self { ready }
    }
}

impl Service<Request<Incoming>> for AdminService {
    type Response = Response<ServiceBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let is_ready = self.ready.load(Ordering::Relaxed);

        Box::pin(async move {
            let ok = || Response::new(full_body(Bytes::from_static(b"ok\n")));

            let res = match req.uri().path() {
                "/health" => ok(),
                "/ready" if is_ready => ok(),
                "/ready" => empty_response(StatusCode::SERVICE_UNAVAILABLE),
                _ => empty_response(StatusCode::NOT_FOUND),
            };
            Ok(res)
        })
    }
}
