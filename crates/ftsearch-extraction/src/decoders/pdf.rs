//! PDF decoder backed by `pdf-extract`

use super::{DecodeContext, Decoder};
use crate::content_type::MIME_PDF;
use crate::error::{ExtractionError, ExtractionResult};
use crate::normalizer::ExtractedText;

pub struct PdfDecoder;

impl Decoder for PdfDecoder {
    fn name(&self) -> &'static str {
        "PDF"
    }

    fn supports(&self, mime: &str) -> bool {
        mime == MIME_PDF || mime == "application/x-pdf"
    }

    fn decode(
        &self,
        _content_type: &str,
        input: &[u8],
        cx: &mut DecodeContext<'_>,
    ) -> ExtractionResult<ExtractedText> {
        let text = pdf_extract::extract_text_from_mem(input)
            .map_err(|e| ExtractionError::malformed(self.name(), e))?;
        cx.charge(text.len())?;
        Ok(ExtractedText::Text(text))
    }
}
