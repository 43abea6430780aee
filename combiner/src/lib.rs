pub mod assembler;
pub mod cache;
pub mod codec;
pub mod compress;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod resolver;
pub mod respond;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod testutils;

pub use errors::CombinerError;
pub use service::BundleService;
pub use types::AssetKind;
