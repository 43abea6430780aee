use crate::config::Namespace;
use std::path::{Path, PathBuf};
use url::Url;

/// A resolved asset target: either a file under the asset root or an
/// absolute URL to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Local(PathBuf),
    Remote(Url),
}

/// Looks up the configured values for `keys` in deterministic global
/// order: priority tiers 1..9, keys in the supplied order within each
/// tier. Tier 5 is the default tier, so the unprefixed key is checked
/// there first, then `5_<key>`. Keys absent at a tier are skipped.
pub fn ordered_values<'a>(ns: &'a Namespace, keys: &[&str]) -> Vec<&'a str> {
    let mut values = Vec::new();
    for level in 1..=9u8 {
        for key in keys {
            let value = if level == 5 {
                ns.entries
                    .get(*key)
                    .or_else(|| ns.entries.get(&format!("5_{key}")))
            } else {
                ns.entries.get(&format!("{level}_{key}"))
            };
            if let Some(value) = value {
                values.push(value.as_str());
            }
        }
    }
    values
}

/// Classifies a configured value: absolute http/https URLs are remote,
/// everything else is a path under the asset root.
pub fn classify(value: &str, asset_root: &Path) -> Target {
    if value.starts_with("http://") || value.starts_with("https://") {
        if let Ok(url) = Url::parse(value) {
            return Target::Remote(url);
        }
    }
    Target::Local(asset_root.join(value.trim_start_matches('/')))
}

/// Full resolution: values in priority order, classified.
pub fn resolve(ns: &Namespace, asset_root: &Path, keys: &[&str]) -> Vec<Target> {
    ordered_values(ns, keys)
        .into_iter()
        .map(|value| classify(value, asset_root))
        .collect()
}
