//! Text extraction for attachments
//!
//! Resolves the effective content type of a file, decodes it into raw text
//! with a bounded, fail-safe decoder invocation, and normalizes the result
//! into valid UTF-8 within the extraction budget.

pub mod content_type;
pub mod decoders;
pub mod error;
pub mod extractor;
pub mod normalizer;

pub use content_type::{guess_from_path, resolve_content_type};
pub use decoders::{DecodeContext, Decoder, DecoderRegistry};
pub use error::{ExtractionError, ExtractionResult, FailureKind};
pub use extractor::{TextExtractor, extract_blocking};
pub use normalizer::{ContentNormalizer, ExtractedText, NormalizedText};
