use crate::errors::CombinerError;
use crate::metrics_defs::REMOTE_FETCHES;
use crate::resolver::Target;
use shared::counter;

const BOM: char = '\u{feff}';

/// Loads resolved targets in order and concatenates their content.
///
/// Local files are read as UTF-8 text and re-encoded without a byte
/// order mark, so a BOM in one source file cannot corrupt the content
/// concatenated after it. A missing local file contributes nothing at
/// all; a remote fetch failure is fatal for the request. Every target
/// that produced content is followed by one newline separator.
pub struct ContentAssembler {
    client: reqwest::Client,
}

impl ContentAssembler {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn assemble(&self, targets: &[Target]) -> Result<Vec<u8>, CombinerError> {
        let mut out = Vec::new();

        for target in targets {
            match target {
                Target::Remote(url) => {
                    counter!(REMOTE_FETCHES).increment(1);
                    let body = self
                        .client
                        .get(url.clone())
                        .send()
                        .await
                        .and_then(|res| res.error_for_status())
                        .map_err(|err| CombinerError::RemoteFetchFailure {
                            url: url.to_string(),
                            reason: err.to_string(),
                        })?
                        .bytes()
                        .await
                        .map_err(|err| CombinerError::RemoteFetchFailure {
                            url: url.to_string(),
                            reason: err.to_string(),
                        })?;
                    out.extend_from_slice(&body);
                    out.push(b'\n');
                }
                Target::Local(path) => match tokio::fs::read_to_string(path).await {
                    Ok(text) => {
                        out.extend_from_slice(text.trim_start_matches(BOM).as_bytes());
                        out.push(b'\n');
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        tracing::debug!(path = %path.display(), "asset file missing, skipped");
                    }
                    Err(err) => return Err(err.into()),
                },
            }
        }

        Ok(out)
    }
}

impl Default for ContentAssembler {
    fn default() -> Self {
        Self::new()
    }
}
