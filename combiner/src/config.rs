use crate::types::AssetKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CACHE_DAYS: f64 = 30.0;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Handler path for {0} assets has no {{0}} slot: {1}")]
    MissingKeySlot(&'static str, String),

    #[error("Entry key has a priority prefix outside 1..9: {0}")]
    InvalidPriorityPrefix(String),

    #[error("Empty entry key in {0} namespace")]
    EmptyEntryKey(&'static str),
}

/// Bundle service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for bundle requests
    pub listener: Listener,
    /// Admin listener for health/readiness endpoints
    pub admin_listener: Listener,
    /// Directory local asset paths resolve under
    pub asset_root: PathBuf,
    /// Dev flag: when false, cache reads always miss (writes still occur)
    #[serde(default = "default_enabled")]
    pub caching_enabled: bool,
    /// Global switch for gzip negotiation
    #[serde(default = "default_enabled")]
    pub compression_enabled: bool,
    /// Namespace for stylesheet keys
    pub styles: Option<Namespace>,
    /// Namespace for script keys
    pub scripts: Option<Namespace>,
}

fn default_enabled() -> bool {
    true
}

impl Config {
    pub fn namespace(&self, kind: AssetKind) -> Option<&Namespace> {
        match kind {
            AssetKind::Style => self.styles.as_ref(),
            AssetKind::Script => self.scripts.as_ref(),
        }
    }

    /// Validates the bundle service configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        for kind in [AssetKind::Style, AssetKind::Script] {
            if let Some(ns) = self.namespace(kind) {
                ns.validate(kind.as_str())?;
            }
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Read-only key/value namespace for one asset kind.
///
/// Besides the reserved fields, every entry maps an asset key to a
/// local path or absolute URL. A `<1-9>_` key prefix assigns a load
/// priority tier; unprefixed keys load in the default tier 5.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Namespace {
    /// Template for combined URLs: `{0}` = normalized keys, `{1}` =
    /// cache-busting token
    pub handler_path: Option<String>,
    /// Overrides `handler_path` when the page request is secure
    pub https_handler_path: Option<String>,
    /// Identifier of the structural destination for emitted tags
    pub handler_placeholder: Option<String>,
    /// Decimal override of the cache TTL in days
    pub http_cache_days: Option<String>,
    /// Bundle version appended to URLs as `-v<N>`
    pub version: Option<u32>,
    #[serde(default)]
    pub entries: HashMap<String, String>,
}

impl Namespace {
    fn validate(&self, kind: &'static str) -> Result<(), ValidationError> {
        for template in [&self.handler_path, &self.https_handler_path]
            .into_iter()
            .flatten()
        {
            if !template.contains("{0}") {
                return Err(ValidationError::MissingKeySlot(kind, template.clone()));
            }
        }

        for key in self.entries.keys() {
            if key.is_empty() {
                return Err(ValidationError::EmptyEntryKey(kind));
            }
            let mut chars = key.chars();
            if let (Some(first), Some('_')) = (chars.next(), chars.next())
                && first.is_ascii_digit()
                && !('1'..='9').contains(&first)
            {
                return Err(ValidationError::InvalidPriorityPrefix(key.clone()));
            }
        }

        Ok(())
    }

    /// Cache TTL for this namespace: the `http_cache_days` override
    /// when it parses as a day count, otherwise the 30 day default. A
    /// non-numeric override is a warning, not an error.
    pub fn cache_ttl(&self) -> Duration {
        let days = match &self.http_cache_days {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(days) if days.is_finite() && days >= 0.0 => days,
                _ => {
                    tracing::warn!(
                        value = %raw,
                        "http_cache_days is not a valid day count, keeping default"
                    );
                    DEFAULT_CACHE_DAYS
                }
            },
            None => DEFAULT_CACHE_DAYS,
        };
        Duration::from_secs_f64(days * 86_400.0)
    }
}
