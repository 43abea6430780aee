//! Page-composition-time aggregation of asset declarations.
//!
//! Independent page components declare the stylesheets and scripts they
//! need into a per-render [`PageCollector`]. Compatible declarations
//! merge into a single owner; at finalization each owner emits one tag
//! pointing at the combined-bundle endpoint (or falls back to direct
//! per-key tags when no endpoint is configured).

pub mod collector;
pub mod request;

use thiserror::Error;

pub use collector::{DeclarationId, EmittedTag, Location, PageCollector};
pub use request::{AssetRequest, AttributeSignature};

/// Errors surfaced while finalizing a page's declarations
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// The configuration namespace for an asset kind is absent. This is
    /// a fatal deployment problem, not a recoverable per-page error.
    #[error("no configuration section for {0} assets")]
    ConfigurationMissing(&'static str),
}
