//! Content normalization
//!
//! Turns raw decoder output into text that is valid UTF-8 and no longer than
//! the extraction budget. The steps run in a fixed order: transcode, truncate
//! by bytes, then scrub the fragment a mid-character cut may leave behind.

use encoding_rs::{DecoderResult, Encoding};

use crate::error::{ExtractionError, ExtractionResult};

/// Raw output of a decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedText {
    /// Bytes with no asserted encoding, taken as UTF-8 without transcoding
    Bytes(Vec<u8>),
    /// Already valid UTF-8
    Text(String),
    /// Bytes in a known source encoding
    Encoded {
        bytes: Vec<u8>,
        encoding: &'static Encoding,
    },
}

impl ExtractedText {
    /// Size of the raw output in bytes
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) | Self::Encoded { bytes, .. } => bytes.len(),
            Self::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into UTF-8 bytes, transcoding when an encoding is asserted
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::AllocationFailed` if the output buffer cannot grow
    pub fn into_utf8_bytes(self) -> ExtractionResult<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Text(text) => Ok(text.into_bytes()),
            Self::Encoded { bytes, encoding } => {
                transcode_dropping_malformed(&bytes, encoding).map(String::into_bytes)
            }
        }
    }
}

impl From<String> for ExtractedText {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Normalized, bounded text ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    /// Byte size after transcoding and before truncation
    pub original_size: usize,
    /// Whether the budget cut the text; scrubbing alone never sets this
    pub truncated: bool,
}

/// Bounds and cleans decoder output
#[derive(Debug, Clone, Copy)]
pub struct ContentNormalizer {
    max_size: usize,
}

impl ContentNormalizer {
    pub const fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Normalize raw decoder output
    ///
    /// The result is always valid UTF-8 no longer than `max_size` bytes.
    /// Malformed input sequences are dropped, never replaced. Input that is
    /// entirely invalid yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::AllocationFailed` if transcoding cannot grow
    /// its output buffer
    pub fn normalize(&self, raw: ExtractedText) -> ExtractionResult<NormalizedText> {
        let mut bytes = raw.into_utf8_bytes()?;
        let original_size = bytes.len();
        let truncated = original_size > self.max_size;
        bytes.truncate(self.max_size);

        Ok(NormalizedText {
            text: scrub(bytes),
            original_size,
            truncated,
        })
    }
}

/// Decode `bytes` from `encoding` into UTF-8, dropping malformed sequences
pub(crate) fn transcode_dropping_malformed(
    bytes: &[u8],
    encoding: &'static Encoding,
) -> ExtractionResult<String> {
    let mut decoder = encoding.new_decoder_with_bom_removal();
    let mut out = String::new();
    let mut input = bytes;

    loop {
        let needed = decoder
            .max_utf8_buffer_length_without_replacement(input.len())
            .unwrap_or(input.len())
            .max(4);
        out.try_reserve(needed)
            .map_err(|source| ExtractionError::AllocationFailed {
                requested: needed,
                source,
            })?;

        let (result, read) = decoder.decode_to_string_without_replacement(input, &mut out, true);
        input = input.get(read..).unwrap_or_default();

        match result {
            DecoderResult::InputEmpty => return Ok(out),
            DecoderResult::OutputFull | DecoderResult::Malformed(_, _) => {}
        }
    }
}

/// Keep only the valid UTF-8 runs of `bytes`
fn scrub(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => error
            .as_bytes()
            .utf8_chunks()
            .map(|chunk| chunk.valid())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_unchanged() {
        let normalizer = ContentNormalizer::new(64);
        let result = normalizer
            .normalize(ExtractedText::Text("hello world".to_string()))
            .unwrap();
        assert_eq!(result.text, "hello world");
        assert!(!result.truncated);
    }

    #[test]
    fn test_truncation_never_splits_a_character() {
        // "あいう" is three 3-byte characters
        let normalizer = ContentNormalizer::new(7);
        let result = normalizer
            .normalize(ExtractedText::Text("あいう".to_string()))
            .unwrap();
        assert_eq!(result.text, "あい");
        assert_eq!(result.original_size, 9);
        assert!(result.truncated);
        assert!(result.text.len() <= 7);
    }

    #[test]
    fn test_unasserted_bytes_are_scrubbed_not_replaced() {
        let normalizer = ContentNormalizer::new(64);
        let result = normalizer
            .normalize(ExtractedText::Bytes(b"ab\xFF\xFEcd".to_vec()))
            .unwrap();
        assert_eq!(result.text, "abcd");
        assert!(!result.text.contains('\u{FFFD}'));
        assert!(!result.truncated);
    }

    #[test]
    fn test_scrubbing_under_budget_is_not_truncation() {
        let normalizer = ContentNormalizer::new(64);
        let result = normalizer
            .normalize(ExtractedText::Bytes(b"ab\xFFcd".to_vec()))
            .unwrap();
        assert_eq!(result.original_size, 5);
        assert_eq!(result.text.len(), 4);
        assert!(!result.truncated);
    }

    #[test]
    fn test_input_exactly_at_budget_is_not_truncated() {
        let normalizer = ContentNormalizer::new(5);
        let result = normalizer
            .normalize(ExtractedText::Text("hello".to_string()))
            .unwrap();
        assert_eq!(result.text, "hello");
        assert!(!result.truncated);
    }

    #[test]
    fn test_transcoding_drops_malformed_sequences() {
        // Shift_JIS "日本" followed by a lone lead byte
        let bytes = vec![0x93, 0xFA, 0x96, 0x7B, 0x81];
        let normalizer = ContentNormalizer::new(64);
        let result = normalizer
            .normalize(ExtractedText::Encoded {
                bytes,
                encoding: encoding_rs::SHIFT_JIS,
            })
            .unwrap();
        assert_eq!(result.text, "日本");
    }

    #[test]
    fn test_utf16_source_is_transcoded() {
        let bytes = vec![0xFF, 0xFE, b'h', 0x00, b'i', 0x00];
        let normalizer = ContentNormalizer::new(64);
        let result = normalizer
            .normalize(ExtractedText::Encoded {
                bytes,
                encoding: encoding_rs::UTF_16LE,
            })
            .unwrap();
        assert_eq!(result.text, "hi");
    }

    #[test]
    fn test_entirely_invalid_input_yields_empty_string() {
        let normalizer = ContentNormalizer::new(64);
        let result = normalizer
            .normalize(ExtractedText::Bytes(vec![0xFF, 0xFE, 0xFD]))
            .unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.original_size, 3);
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let normalizer = ContentNormalizer::new(5);
        let raw = ExtractedText::Bytes("héllo wörld".as_bytes().to_vec());
        let first = normalizer.normalize(raw.clone()).unwrap();
        let second = normalizer.normalize(raw).unwrap();
        assert_eq!(first, second);
    }
}
