//! End-to-end extraction tests against files on disk

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::io::Write;
use std::path::Path;

use ftsearch_extraction::content_type::{MIME_BZIP2, MIME_GZIP, MIME_TAR, MIME_TEXT};
use ftsearch_extraction::{
    ContentNormalizer, DecodeContext, Decoder, DecoderRegistry, ExtractedText, ExtractionError,
    ExtractionResult, FailureKind, TextExtractor, resolve_content_type,
};

fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(bytes).unwrap();
    path
}

fn gzipped_tarball(name: &str, body: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(u64::try_from(body.len()).unwrap());
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, body).unwrap();
    let tar = builder.into_inner().unwrap();

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

struct PanickingDecoder;

impl Decoder for PanickingDecoder {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn supports(&self, mime: &str) -> bool {
        mime == "application/x-explode"
    }

    fn decode(
        &self,
        _content_type: &str,
        _input: &[u8],
        _cx: &mut DecodeContext<'_>,
    ) -> ExtractionResult<ExtractedText> {
        panic!("decoder blew up");
    }
}

#[tokio::test]
async fn test_extracts_plain_text_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "notes.txt", "hello 世界".as_bytes());

    let extractor = TextExtractor::new(DecoderRegistry::with_builtin(), 1 << 20);
    let raw = extractor.extract(&path, MIME_TEXT, 1024).await.unwrap();
    let normalized = ContentNormalizer::new(1024).normalize(raw).unwrap();

    assert_eq!(normalized.text, "hello 世界");
}

#[tokio::test]
async fn test_resolves_tar_gz_before_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "bundle.tar.gz",
        &gzipped_tarball("inner.txt", b"archived words"),
    );

    let content_type = resolve_content_type(&path, MIME_TAR);
    assert_eq!(content_type, MIME_GZIP);

    let extractor = TextExtractor::new(DecoderRegistry::with_builtin(), 1 << 20);
    let raw = extractor.extract(&path, content_type, 1024).await.unwrap();
    let normalized = ContentNormalizer::new(1024).normalize(raw).unwrap();
    assert_eq!(normalized.text, "archived words");
}

#[tokio::test]
async fn test_bzip2_is_an_unsupported_decode_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "logs.tar.bz2", b"BZh91AY&SY");

    let content_type = resolve_content_type(&path, MIME_TAR);
    assert_eq!(content_type, MIME_BZIP2);

    let extractor = TextExtractor::new(DecoderRegistry::with_builtin(), 1 << 20);
    let error = extractor
        .extract(&path, content_type, 1024)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        ExtractionError::UnsupportedContentType { .. }
    ));
    assert_eq!(error.kind(), FailureKind::Decode);
}

#[tokio::test]
async fn test_missing_file_is_an_io_decode_failure() {
    let extractor = TextExtractor::new(DecoderRegistry::with_builtin(), 1 << 20);
    let error = extractor
        .extract(Path::new("/nonexistent/ftsearch/file.txt"), MIME_TEXT, 1024)
        .await
        .unwrap_err();
    assert!(matches!(error, ExtractionError::Io { .. }));
    assert_eq!(error.kind(), FailureKind::Decode);
}

#[tokio::test]
async fn test_decoder_panic_is_contained() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "boom.bin", b"anything");

    let mut registry = DecoderRegistry::with_builtin();
    registry.register(PanickingDecoder);
    let extractor = TextExtractor::new(registry, 1 << 20);

    let error = extractor
        .extract(&path, "application/x-explode", 1024)
        .await
        .unwrap_err();
    match error {
        ExtractionError::DecoderPanicked { ref message } => {
            assert!(message.contains("decoder blew up"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(error.kind(), FailureKind::Decode);

    // The extractor keeps working after a panic
    let ok = write_file(&dir, "ok.txt", b"still alive");
    assert!(extractor.extract(&ok, MIME_TEXT, 1024).await.is_ok());
}

#[tokio::test]
async fn test_oversized_decode_is_resource_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "big.tar.gz", &gzipped_tarball("big.txt", &[b'x'; 8192]));

    let extractor = TextExtractor::new(DecoderRegistry::with_builtin(), 1024);
    let error = extractor
        .extract(&path, MIME_GZIP, 16)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), FailureKind::ResourceExhausted);
}

#[tokio::test]
async fn test_budget_raises_the_ceiling() {
    let extractor = TextExtractor::new(DecoderRegistry::with_builtin(), 1024);
    assert_eq!(extractor.decode_limit(16), 1024);
    assert_eq!(extractor.decode_limit(4096), 4096);
}

#[tokio::test]
async fn test_repeated_extraction_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "doc.txt", "ünïcödé text ".repeat(50).as_bytes());

    let extractor = TextExtractor::new(DecoderRegistry::with_builtin(), 1 << 20);
    let normalizer = ContentNormalizer::new(100);

    let first = normalizer
        .normalize(extractor.extract(&path, MIME_TEXT, 100).await.unwrap())
        .unwrap();
    let second = normalizer
        .normalize(extractor.extract(&path, MIME_TEXT, 100).await.unwrap())
        .unwrap();

    assert_eq!(first.text, second.text);
    assert!(first.text.len() <= 100);
    assert!(first.truncated);
}
