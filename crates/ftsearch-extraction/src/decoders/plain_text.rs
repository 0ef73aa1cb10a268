//! Plain text decoder with BOM and charset detection

use encoding_rs::Encoding;

use super::{DecodeContext, Decoder};
use crate::content_type::charset;
use crate::error::ExtractionResult;
use crate::normalizer::ExtractedText;

const TEXTUAL_APPLICATION_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/javascript",
    "application/x-sh",
    "application/x-yaml",
    "application/sql",
];

/// Passes text through, asserting an encoding only when the input names one
///
/// A byte order mark wins over a declared `charset`; with neither, the bytes
/// are returned unasserted.
pub struct PlainTextDecoder;

impl Decoder for PlainTextDecoder {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supports(&self, mime: &str) -> bool {
        mime.starts_with("text/") || TEXTUAL_APPLICATION_TYPES.contains(&mime)
    }

    fn decode(
        &self,
        content_type: &str,
        input: &[u8],
        cx: &mut DecodeContext<'_>,
    ) -> ExtractionResult<ExtractedText> {
        cx.charge(input.len())?;
        let bytes = input.to_vec();

        if let Some((encoding, _bom_length)) = Encoding::for_bom(input) {
            return Ok(ExtractedText::Encoded { bytes, encoding });
        }

        match charset(content_type).and_then(|label| Encoding::for_label(label.as_bytes())) {
            Some(encoding) => Ok(ExtractedText::Encoded { bytes, encoding }),
            None => Ok(ExtractedText::Bytes(bytes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::DecoderRegistry;

    fn decode(content_type: &str, input: &[u8]) -> ExtractedText {
        let registry = DecoderRegistry::new();
        let mut cx = DecodeContext::new(&registry, 1024);
        PlainTextDecoder.decode(content_type, input, &mut cx).unwrap()
    }

    #[test]
    fn test_bom_asserts_encoding() {
        let text = decode("text/plain", &[0xFE, 0xFF, 0x00, b'a']);
        assert_eq!(
            text,
            ExtractedText::Encoded {
                bytes: vec![0xFE, 0xFF, 0x00, b'a'],
                encoding: encoding_rs::UTF_16BE,
            }
        );
    }

    #[test]
    fn test_charset_parameter_asserts_encoding() {
        let text = decode("text/plain; charset=Shift_JIS", b"abc");
        assert!(matches!(
            text,
            ExtractedText::Encoded { encoding, .. } if encoding == encoding_rs::SHIFT_JIS
        ));
    }

    #[test]
    fn test_no_hint_leaves_bytes_unasserted() {
        assert_eq!(
            decode("text/csv", b"a,b"),
            ExtractedText::Bytes(b"a,b".to_vec())
        );
    }

    #[test]
    fn test_supports_textual_types() {
        assert!(PlainTextDecoder.supports("text/markdown"));
        assert!(PlainTextDecoder.supports("application/json"));
        assert!(!PlainTextDecoder.supports("application/octet-stream"));
    }
}
