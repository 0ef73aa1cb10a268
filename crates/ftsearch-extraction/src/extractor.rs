//! Bounded, fail-safe invocation of decoders
//!
//! Decoding runs on the blocking pool. A decoder that panics surfaces as a
//! decode failure for that one file and never unwinds into the caller.

use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinError;

use ftsearch_config::ExtractionConfig;

use crate::decoders::{DecodeContext, DecoderRegistry};
use crate::error::{ExtractionError, ExtractionResult};
use crate::normalizer::ExtractedText;

/// Extracts raw text from files through a [`DecoderRegistry`]
#[derive(Clone)]
pub struct TextExtractor {
    registry: Arc<DecoderRegistry>,
    max_decoded_size: u64,
}

impl TextExtractor {
    pub fn new(registry: DecoderRegistry, max_decoded_size: u64) -> Self {
        Self {
            registry: Arc::new(registry),
            max_decoded_size,
        }
    }

    /// Extractor with the built-in decoders and the configured ceiling
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(DecoderRegistry::with_builtin(), config.max_decoded_size)
    }

    /// Decoded-size ceiling applied for a given text budget
    ///
    /// The file is always decoded in full; `max_size` only raises the
    /// ceiling so that budget-sized output is never rejected.
    pub fn decode_limit(&self, max_size: u64) -> u64 {
        self.max_decoded_size.max(max_size)
    }

    /// Extract the raw text of `path` decoded as `content_type`
    ///
    /// # Errors
    ///
    /// Returns an `ExtractionError` classified by [`ExtractionError::kind`];
    /// panics inside decoders are reported as `DecoderPanicked`
    pub async fn extract(
        &self,
        path: &Path,
        content_type: &str,
        max_size: u64,
    ) -> ExtractionResult<ExtractedText> {
        let registry = Arc::clone(&self.registry);
        let path = path.to_path_buf();
        let content_type = content_type.to_string();
        let limit = self.decode_limit(max_size);

        tokio::task::spawn_blocking(move || {
            extract_blocking(&registry, &path, &content_type, limit)
        })
        .await
        .map_err(from_join_error)?
    }
}

/// Synchronous extraction, for callers already on a blocking thread
///
/// # Errors
///
/// Returns `UnsupportedContentType` when no decoder matches, `Io` when the
/// file cannot be read, or whatever the decoder reports
pub fn extract_blocking(
    registry: &DecoderRegistry,
    path: &Path,
    content_type: &str,
    limit: u64,
) -> ExtractionResult<ExtractedText> {
    let decoder =
        registry
            .find(content_type)
            .ok_or_else(|| ExtractionError::UnsupportedContentType {
                content_type: content_type.to_string(),
            })?;

    let mut cx = DecodeContext::new(registry, limit);
    let file = std::fs::File::open(path).map_err(|e| ExtractionError::io(path, e))?;
    let input = cx.read_to_end(file, |e| ExtractionError::io(path, e))?;

    let text = decoder.decode(content_type, &input, &mut cx)?;
    tracing::trace!(
        decoder = decoder.name(),
        input_bytes = input.len(),
        decoded_bytes = cx.decoded(),
        "Decoded file"
    );
    Ok(text)
}

fn from_join_error(error: JoinError) -> ExtractionError {
    if !error.is_panic() {
        return ExtractionError::Cancelled;
    }

    let payload = error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    ExtractionError::DecoderPanicked { message }
}
