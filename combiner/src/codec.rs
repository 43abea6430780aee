use crate::config::Namespace;
use crate::errors::CombinerError;
use crate::types::{AssetKind, CanonicalSignature};
use url::Url;

/// A decoded bundle request URL.
///
/// The filename segment is both the cache key seed and the content
/// manifest: `(nocache<digits>-)? <keys> (-v<digits>)? . <ext>` with
/// keys drawn from `[a-z0-9-]` and matched lazily against the version
/// suffix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedRequest {
    pub keys: String,
    pub kind: AssetKind,
    /// Version suffix as received, e.g. `-v2`; empty when absent.
    pub version: String,
    /// Whether a `nocache<digits>-` cache-busting prefix was present.
    pub cache_bust: bool,
}

impl DecodedRequest {
    /// Individual keys for config resolution, in URL order.
    pub fn key_list(&self) -> Vec<&str> {
        self.keys.split('-').filter(|k| !k.is_empty()).collect()
    }

    /// `normalizedKeys + upper(tag) + version`, no separators. The
    /// exact concatenation is load-bearing for shared caches.
    pub fn cache_key(&self) -> String {
        format!("{}{}{}", self.keys, self.kind.cache_tag(), self.version)
    }
}

/// Parses the filename portion of a request path into a bundle request.
pub fn decode(path: &str) -> Result<DecodedRequest, CombinerError> {
    let filename = path.rsplit('/').next().unwrap_or(path);

    let (stem, ext) = filename
        .rsplit_once('.')
        .ok_or_else(|| CombinerError::MalformedRequestUrl(filename.to_string()))?;

    let (stem, cache_bust) = strip_cache_bust(stem);
    let (keys, version) = split_version(stem);

    if keys.is_empty()
        || !keys
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CombinerError::MalformedRequestUrl(filename.to_string()));
    }

    let kind = kind_from_extension(ext)?;

    Ok(DecodedRequest {
        keys: keys.to_string(),
        kind,
        version: version.to_string(),
        cache_bust,
    })
}

/// Extension must contain `css` or `js`, case-insensitively; `css`
/// wins when both would match (e.g. `.cssx`).
fn kind_from_extension(ext: &str) -> Result<AssetKind, CombinerError> {
    let lower = ext.to_ascii_lowercase();
    if lower.contains("css") {
        Ok(AssetKind::Style)
    } else if lower.contains("js") {
        Ok(AssetKind::Script)
    } else {
        Err(CombinerError::UnrecognizedAssetType(ext.to_string()))
    }
}

fn strip_cache_bust(stem: &str) -> (&str, bool) {
    if let Some(rest) = stem.strip_prefix("nocache") {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0
            && let Some(stripped) = rest[digits..].strip_prefix('-')
        {
            return (stripped, true);
        }
    }
    (stem, false)
}

/// Splits a trailing `-v<digits>` suffix off the keys. Keys match
/// lazily, so the last possible suffix is taken: `a-v1-v2` is keys
/// `a-v1` with version `-v2`.
fn split_version(stem: &str) -> (&str, &str) {
    if let Some(pos) = stem.rfind("-v") {
        let candidate = &stem[pos + 2..];
        if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_digit()) {
            return (&stem[..pos], &stem[pos..]);
        }
    }
    (stem, "")
}

/// Builds the combined bundle URL from a canonical signature.
///
/// `{0}` is the normalized key segment (version suffix included), `{1}`
/// the cache-busting token for environments with caching disabled.
pub fn encode(
    ns: &Namespace,
    sig: &CanonicalSignature,
    secure: bool,
    cache_bust: Option<&str>,
) -> Result<String, CombinerError> {
    let template = if secure {
        ns.https_handler_path.as_ref().or(ns.handler_path.as_ref())
    } else {
        ns.handler_path.as_ref()
    }
    .ok_or(CombinerError::ConfigurationMissing(sig.kind.as_str()))?;

    let url = template
        .replace("{0}", &sig.url_segment())
        .replace("{1}", cache_bust.unwrap_or(""));

    Ok(correct_scheme(&url, secure))
}

/// Rewrites absolute `http` URLs to `https` when the current page
/// request is secure, so emitted tags never trigger mixed-content
/// warnings. Relative paths pass through untouched.
pub fn correct_scheme(raw: &str, secure: bool) -> String {
    if !secure {
        return raw.to_string();
    }
    match Url::parse(raw) {
        Ok(mut url) if url.scheme() == "http" => {
            // set_scheme only fails for non-special scheme changes
            if url.set_scheme("https").is_ok() {
                url.to_string()
            } else {
                raw.to_string()
            }
        }
        _ => raw.to_string(),
    }
}
