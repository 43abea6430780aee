//! In-process HTTP servers for tests.

use crate::service::BundleService;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Minimal origin serving fixed path -> body pairs, for exercising
/// remote asset fetches.
pub struct StaticOriginServer {
    port: u16,
}

impl StaticOriginServer {
    pub async fn start(routes: &[(&str, &str)]) -> Self {
        let routes: Arc<HashMap<String, String>> = Arc::new(
            routes
                .iter()
                .map(|(path, body)| (path.to_string(), body.to_string()))
                .collect(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let routes = routes.clone();

                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let routes = routes.clone();
                        async move {
                            let res = match routes.get(req.uri().path()) {
                                Some(body) => Response::new(
                                    Full::new(Bytes::from(body.clone()))
                                        .map_err(|e| match e {})
                                        .boxed(),
                                ),
                                None => {
                                    let mut res = Response::new(
                                        Full::new(Bytes::new()).map_err(|e| match e {}).boxed(),
                                    );
                                    *res.status_mut() = StatusCode::NOT_FOUND;
                                    res
                                }
                            };
                            Ok::<_, Infallible>(res)
                        }
                    });

                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await;
                });
            }
        });

        Self { port }
    }

    pub fn base(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

/// Serves a `BundleService` on an ephemeral port and returns its base URL.
pub async fn serve_bundles(service: BundleService) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let svc = service.clone();

            tokio::spawn(async move {
                let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, svc)
                    .await;
            });
        }
    });

    format!("http://127.0.0.1:{port}")
}
