use crate::assembler::ContentAssembler;
use crate::cache::{BundleCache, BundleKey, CachedBundle};
use crate::codec;
use crate::compress;
use crate::config::Config;
use crate::errors::CombinerError;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_FAILED, REQUESTS_REJECTED, REQUESTS_SERVED};
use crate::resolver;
use crate::respond::bundle_response;
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::header::ACCEPT_ENCODING;
use hyper::service::Service as HyperService;
use hyper::{Request, Response, StatusCode};
use shared::{counter, histogram};
use shared::http::{ServiceBody, empty_response};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Query parameter that bypasses cache reads without evicting entries.
const FORCE_REFRESH_PARAM: &str = "refresh";

/// The bundle request pipeline:
/// parse -> cache lookup -> resolve -> assemble -> compress? ->
/// cache put -> respond.
///
/// Parse failures answer 400 before any cache interaction. Failures
/// past that point are logged centrally and answer an empty 500.
pub struct BundleService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: Config,
    cache: BundleCache,
    assembler: ContentAssembler,
}

impl BundleService {
    pub fn new(config: Config) -> Self {
        let cache = BundleCache::new(config.caching_enabled);
        Self {
            inner: Arc::new(ServiceInner {
                config,
                cache,
                assembler: ContentAssembler::new(),
            }),
        }
    }
}

impl Clone for BundleService {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl ServiceInner {
    async fn handle(&self, req: Request<Incoming>) -> Response<ServiceBody> {
        let decoded = match codec::decode(req.uri().path()) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(path = req.uri().path(), error = %err, "rejecting bundle request");
                counter!(REQUESTS_REJECTED).increment(1);
                return empty_response(StatusCode::BAD_REQUEST);
            }
        };

        let compressed = compress::should_compress(
            req.headers()
                .get(ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok()),
            self.config.compression_enabled,
        );
        let force_refresh = has_force_refresh(req.uri().query());

        let key = BundleKey {
            signature: decoded.cache_key(),
            compressed,
        };

        if let Some(hit) = self.cache.get(&key, force_refresh) {
            counter!(REQUESTS_SERVED).increment(1);
            let ttl = self
                .config
                .namespace(decoded.kind)
                .map(|ns| ns.cache_ttl())
                .unwrap_or(hit.ttl);
            return bundle_response(hit.bytes, decoded.kind.content_type(), compressed, ttl);
        }

        match self.build(&decoded, compressed, key).await {
            Ok(Some((bytes, ttl))) => {
                counter!(REQUESTS_SERVED).increment(1);
                bundle_response(bytes, decoded.kind.content_type(), compressed, ttl)
            }
            // Nothing resolved to content: no body to serve or cache.
            Ok(None) => empty_response(StatusCode::NOT_FOUND),
            Err(err) => {
                tracing::error!(
                    keys = %decoded.keys,
                    kind = decoded.kind.as_str(),
                    error = %err,
                    "bundle assembly failed"
                );
                counter!(REQUESTS_FAILED).increment(1);
                empty_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Cache-miss path: resolve, assemble, optionally compress, store.
    async fn build(
        &self,
        decoded: &codec::DecodedRequest,
        compressed: bool,
        key: BundleKey,
    ) -> Result<Option<(Bytes, std::time::Duration)>, CombinerError> {
        let ns = self
            .config
            .namespace(decoded.kind)
            .ok_or(CombinerError::ConfigurationMissing(decoded.kind.as_str()))?;

        let keys = decoded.key_list();
        let targets = resolver::resolve(ns, &self.config.asset_root, &keys);
        let raw = self.assembler.assemble(&targets).await?;
        if raw.is_empty() {
            return Ok(None);
        }

        let body = if compressed {
            compress::gzip(&raw)?
        } else {
            raw
        };
        let bytes = Bytes::from(body);
        let ttl = ns.cache_ttl();

        self.cache.put(
            key,
            CachedBundle {
                bytes: bytes.clone(),
                ttl,
            },
        );

        Ok(Some((bytes, ttl)))
    }
}

fn has_force_refresh(query: Option<&str>) -> bool {
    query.is_some_and(|q| {
        q.split('&').any(|pair| {
            pair == FORCE_REFRESH_PARAM
                || pair
                    .strip_prefix(FORCE_REFRESH_PARAM)
                    .is_some_and(|rest| rest.starts_with('='))
        })
    })
}

impl HyperService<Request<Incoming>> for BundleService {
    type Response = Response<ServiceBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move {
            let started = std::time::Instant::now();
            let res = inner.handle(req).await;
            histogram!(REQUEST_DURATION).record(started.elapsed().as_secs_f64());
            Ok(res)
        })
    }
}
