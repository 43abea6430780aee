use crate::errors::CombinerError;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;

/// Decides whether the response should be gzip-compressed.
///
/// True iff the raw Accept-Encoding value contains `gzip` or `deflate`
/// as a case-sensitive substring and compression is globally enabled.
pub fn should_compress(accept_encoding: Option<&str>, enabled: bool) -> bool {
    if !enabled {
        return false;
    }
    match accept_encoding {
        Some(value) => value.contains("gzip") || value.contains("deflate"),
        None => false,
    }
}

/// Gzips an assembled bundle. Failures are fatal for the request.
pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>, CombinerError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .and_then(|_| encoder.finish())
        .map_err(|err| CombinerError::CompressionFailure(err.to_string()))
}
