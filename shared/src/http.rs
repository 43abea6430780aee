use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Body type used by all services in this workspace: fully buffered,
/// infallible once built.
pub type ServiceBody = BoxBody<Bytes, Infallible>;

pub fn full_body(bytes: Bytes) -> ServiceBody {
    Full::new(bytes).map_err(|e| match e {}).boxed()
}

pub fn empty_response(status: StatusCode) -> Response<ServiceBody> {
    let mut res = Response::new(full_body(Bytes::new()));
    *res.status_mut() = status;
    res
}

/// Binds the listener for an HTTP service. Split from the accept loop
/// so callers can gate readiness on a successful bind before serving.
pub async fn bind_listener(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, "listening");
    Ok(listener)
}

/// Accept loop for a hyper service: serves each connection on its own
/// task, auto-detecting h1/h2. Accept failures are logged and the loop
/// keeps going.
pub async fn serve_connections<S>(listener: TcpListener, service: S)
where
    S: Service<Request<Incoming>, Response = Response<ServiceBody>, Error = Infallible>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let service = Arc::new(service);
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(error = %err, "failed to accept connection");
                continue;
            }
        };
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = service.clone();

        tokio::spawn(async move {
            if let Err(err) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!(%peer, error = %err, "connection ended with error");
            }
        });
    }
}

/// Convenience wrapper: bind, then serve. Only the bind error is
/// returned to the caller.
pub async fn run_http_service<S>(host: &str, port: u16, service: S) -> std::io::Result<()>
where
    S: Service<Request<Incoming>, Response = Response<ServiceBody>, Error = Infallible>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let listener = bind_listener(host, port).await?;
    serve_connections(listener, service).await;
    Ok(())
}
