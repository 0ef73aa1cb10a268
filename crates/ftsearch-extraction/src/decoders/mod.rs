//! Decoder registry and the shared decode context
//!
//! A decoder turns the bytes of one file format into [`ExtractedText`]. All
//! memory a decoder materializes is charged against the [`DecodeContext`], so
//! an adversarial input fails with a resource error instead of exhausting the
//! process.

mod archive;
mod ooxml;
mod pdf;
mod plain_text;

pub use archive::{GzipDecoder, TarDecoder, ZipDecoder};
pub use ooxml::OoxmlDecoder;
pub use pdf::PdfDecoder;
pub use plain_text::PlainTextDecoder;

use std::io::Read;
use std::path::Path;

use crate::content_type::{essence, guess_from_path};
use crate::error::{ExtractionError, ExtractionResult, FailureKind};
use crate::normalizer::ExtractedText;

/// Maximum nesting of archives inside archives
pub const MAX_ARCHIVE_DEPTH: usize = 4;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Format-specific text decoder
pub trait Decoder: Send + Sync {
    /// Short format name used in errors and logs
    fn name(&self) -> &'static str;

    /// Whether this decoder handles the given MIME essence (lowercase)
    fn supports(&self, mime: &str) -> bool;

    /// Decode `input` into raw text
    ///
    /// `content_type` is the full declared type, parameters included.
    ///
    /// # Errors
    ///
    /// Returns an error when the input is malformed or exceeds the context's
    /// decoded-size ceiling
    fn decode(
        &self,
        content_type: &str,
        input: &[u8],
        cx: &mut DecodeContext<'_>,
    ) -> ExtractionResult<ExtractedText>;
}

/// Ordered collection of decoders, later registrations win
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn Decoder>>,
}

impl DecoderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    /// Registry with every built-in decoder
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(PlainTextDecoder);
        registry.register(PdfDecoder);
        registry.register(OoxmlDecoder);
        registry.register(ZipDecoder);
        registry.register(TarDecoder);
        registry.register(GzipDecoder);
        registry
    }

    pub fn register(&mut self, decoder: impl Decoder + 'static) {
        self.decoders.push(Box::new(decoder));
    }

    /// Find the decoder for a content type
    pub fn find(&self, content_type: &str) -> Option<&dyn Decoder> {
        let mime = essence(content_type).to_ascii_lowercase();
        self.decoders
            .iter()
            .rev()
            .find(|decoder| decoder.supports(&mime))
            .map(Box::as_ref)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Per-extraction decode state: the size ceiling and archive depth
pub struct DecodeContext<'a> {
    registry: &'a DecoderRegistry,
    limit: u64,
    decoded: u64,
    depth: usize,
}

impl<'a> DecodeContext<'a> {
    pub const fn new(registry: &'a DecoderRegistry, limit: u64) -> Self {
        Self {
            registry,
            limit,
            decoded: 0,
            depth: 0,
        }
    }

    /// Bytes charged so far
    pub const fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Account for `bytes` of newly materialized output
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::DecodedSizeExceeded` once the ceiling is crossed
    pub fn charge(&mut self, bytes: usize) -> ExtractionResult<()> {
        let total = self
            .decoded
            .saturating_add(u64::try_from(bytes).unwrap_or(u64::MAX));
        if total > self.limit {
            return Err(ExtractionError::DecodedSizeExceeded { limit: self.limit });
        }
        self.decoded = total;
        Ok(())
    }

    /// Read a stream to its end, charging every chunk
    ///
    /// # Errors
    ///
    /// Returns the mapped I/O error, `DecodedSizeExceeded` or `AllocationFailed`
    pub fn read_to_end<R, F>(&mut self, mut reader: R, map_io: F) -> ExtractionResult<Vec<u8>>
    where
        R: Read,
        F: Fn(std::io::Error) -> ExtractionError,
    {
        let mut out = Vec::new();
        let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
        loop {
            let read = match reader.read(&mut chunk) {
                Ok(0) => return Ok(out),
                Ok(read) => read,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io(e)),
            };
            self.charge(read)?;
            out.try_reserve(read)
                .map_err(|source| ExtractionError::AllocationFailed {
                    requested: read,
                    source,
                })?;
            out.extend_from_slice(chunk.get(..read).unwrap_or_default());
        }
    }

    /// Append decoded text, charging it against the ceiling
    ///
    /// # Errors
    ///
    /// Returns `DecodedSizeExceeded` or `AllocationFailed`
    pub fn push_str(&mut self, out: &mut String, text: &str) -> ExtractionResult<()> {
        self.charge(text.len())?;
        out.try_reserve(text.len())
            .map_err(|source| ExtractionError::AllocationFailed {
                requested: text.len(),
                source,
            })?;
        out.push_str(text);
        Ok(())
    }

    /// Decode one archive member, dispatching on its file name
    ///
    /// Members without a decoder, and members that fail to decode, are
    /// skipped. Resource failures abort the whole extraction.
    ///
    /// # Errors
    ///
    /// Returns `NestingTooDeep` past [`MAX_ARCHIVE_DEPTH`] or any resource failure
    pub fn decode_member(
        &mut self,
        name: &str,
        bytes: &[u8],
    ) -> ExtractionResult<Option<ExtractedText>> {
        if self.depth >= MAX_ARCHIVE_DEPTH {
            return Err(ExtractionError::NestingTooDeep {
                max_depth: MAX_ARCHIVE_DEPTH,
            });
        }

        let content_type = guess_from_path(Path::new(name));
        let registry = self.registry;
        let Some(decoder) = registry.find(content_type) else {
            tracing::trace!(member = name, "No decoder for archive member");
            return Ok(None);
        };

        self.depth = self.depth.saturating_add(1);
        let result = decoder.decode(content_type, bytes, self);
        self.depth = self.depth.saturating_sub(1);

        match result {
            Ok(text) => Ok(Some(text)),
            Err(error @ ExtractionError::NestingTooDeep { .. }) => Err(error),
            Err(error) if error.kind() == FailureKind::Decode => {
                tracing::debug!(member = name, error = %error, "Skipping undecodable archive member");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::{MIME_BZIP2, MIME_DOCX, MIME_GZIP, MIME_PDF, MIME_TEXT};

    #[test]
    fn test_builtin_registry_dispatch() {
        let registry = DecoderRegistry::with_builtin();
        assert_eq!(registry.find(MIME_TEXT).map(Decoder::name), Some("text"));
        assert_eq!(
            registry.find("TEXT/PLAIN; charset=utf-8").map(Decoder::name),
            Some("text")
        );
        assert_eq!(registry.find(MIME_PDF).map(Decoder::name), Some("PDF"));
        assert_eq!(registry.find(MIME_DOCX).map(Decoder::name), Some("OOXML"));
        assert_eq!(registry.find(MIME_GZIP).map(Decoder::name), Some("gzip"));
        assert!(registry.find(MIME_BZIP2).is_none());
    }

    #[test]
    fn test_later_registration_wins() {
        struct Shout;
        impl Decoder for Shout {
            fn name(&self) -> &'static str {
                "shout"
            }
            fn supports(&self, mime: &str) -> bool {
                mime == "text/plain"
            }
            fn decode(
                &self,
                _content_type: &str,
                input: &[u8],
                _cx: &mut DecodeContext<'_>,
            ) -> ExtractionResult<ExtractedText> {
                Ok(ExtractedText::Bytes(input.to_ascii_uppercase()))
            }
        }

        let mut registry = DecoderRegistry::with_builtin();
        registry.register(Shout);
        assert_eq!(registry.find(MIME_TEXT).map(Decoder::name), Some("shout"));
    }

    #[test]
    fn test_charge_enforces_ceiling() {
        let registry = DecoderRegistry::new();
        let mut cx = DecodeContext::new(&registry, 10);
        cx.charge(6).unwrap();
        let error = cx.charge(5).unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::DecodedSizeExceeded { limit: 10 }
        ));
        assert_eq!(cx.decoded(), 6);
    }

    #[test]
    fn test_read_to_end_counts_bytes() {
        let registry = DecoderRegistry::new();
        let mut cx = DecodeContext::new(&registry, 1024);
        let data = cx
            .read_to_end(&b"hello"[..], |e| ExtractionError::malformed("test", e))
            .unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(cx.decoded(), 5);
    }

    #[test]
    fn test_unknown_member_is_skipped() {
        let registry = DecoderRegistry::with_builtin();
        let mut cx = DecodeContext::new(&registry, 1024);
        assert!(cx.decode_member("image.png", b"\x89PNG").unwrap().is_none());
        let text = cx.decode_member("notes.txt", b"hi").unwrap();
        assert_eq!(text, Some(ExtractedText::Bytes(b"hi".to_vec())));
    }
}
