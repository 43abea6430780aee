/// The two asset kinds a bundle can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Style,
    Script,
}

impl AssetKind {
    pub const fn content_type(&self) -> &'static str {
        match self {
            AssetKind::Style => "text/css",
            AssetKind::Script => "text/javascript",
        }
    }

    /// Upper-cased tag concatenated into cache keys. The exact value is
    /// part of the shared-cache contract and must not change.
    pub const fn cache_tag(&self) -> &'static str {
        match self {
            AssetKind::Style => "CSS",
            AssetKind::Script => "JS",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Style => "style",
            AssetKind::Script => "script",
        }
    }
}

/// Normalized identity of one bundle: sorted, deduped, lower-cased keys
/// plus kind and optional version. Equal inputs always produce equal
/// signatures; the cache relies on that.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalSignature {
    pub normalized_keys: String,
    pub kind: AssetKind,
    pub version: Option<u32>,
}

/// Canonical key list: lower-cased, stripped of characters outside
/// `[a-z0-9-]`, sorted, deduped by exact match. Keys that normalize to
/// nothing are dropped.
pub fn normalize_keys<I, S>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = keys
        .into_iter()
        .map(|k| {
            k.as_ref()
                .to_ascii_lowercase()
                .chars()
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
                .collect()
        })
        .filter(|k: &String| !k.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

impl CanonicalSignature {
    /// Builds the signature from declared keys: the canonical key list
    /// joined with `-`. Key hyphens and the join separator are
    /// indistinguishable afterwards, so callers needing individual keys
    /// back must hold on to [`normalize_keys`] output instead.
    pub fn from_keys<I, S>(keys: I, kind: AssetKind, version: Option<u32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        CanonicalSignature {
            normalized_keys: normalize_keys(keys).join("-"),
            kind,
            version,
        }
    }

    /// Version suffix as it appears on the wire (`-v2`), empty if unset.
    pub fn version_suffix(&self) -> String {
        match self.version {
            Some(v) => format!("-v{v}"),
            None => String::new(),
        }
    }

    /// The URL payload: normalized keys with the version suffix appended.
    pub fn url_segment(&self) -> String {
        format!("{}{}", self.normalized_keys, self.version_suffix())
    }

    /// Plain concatenation of keys, tag and version suffix. Must be
    /// byte-identical across implementations sharing a cache.
    pub fn cache_key(&self) -> String {
        format!(
            "{}{}{}",
            self.normalized_keys,
            self.kind.cache_tag(),
            self.version_suffix()
        )
    }
}
