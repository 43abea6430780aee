use bytes::Bytes;
use hyper::Response;
use hyper::header::{
    CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES, HeaderValue,
};
use shared::http::{ServiceBody, full_body};
use std::time::{Duration, SystemTime};

/// Builds a cacheable bundle response.
///
/// Emits `Content-Length`, `Content-Type`, `Content-Encoding: gzip`
/// (compressed variant only) and the public cache-control triple with
/// the `must-revalidate, proxy-revalidate` extension. No
/// `Vary: Accept-Encoding` is set; intermediaries that cache both
/// variants under one URL will serve the wrong one.
pub fn bundle_response(
    bytes: Bytes,
    content_type: &'static str,
    compressed: bool,
    ttl: Duration,
) -> Response<ServiceBody> {
    let mut builder = Response::builder()
        .header(CONTENT_LENGTH, bytes.len())
        .header(CONTENT_TYPE, content_type)
        .header(
            CACHE_CONTROL,
            format!(
                "public, max-age={}, must-revalidate, proxy-revalidate",
                ttl.as_secs()
            ),
        )
        .header(EXPIRES, httpdate::fmt_http_date(SystemTime::now() + ttl));

    if compressed {
        builder = builder.header(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }

    builder
        .body(full_body(bytes))
        .unwrap_or_else(|_| shared::http::empty_response(hyper::StatusCode::INTERNAL_SERVER_ERROR))
}
