//! Archive decoders: zip, tar and gzip
//!
//! Archives are flattened into the text of their members, one member per
//! line block. Members are dispatched by file name through the registry.

use std::io::Cursor;

use super::{DecodeContext, Decoder};
use crate::content_type::{MIME_GZIP, MIME_TAR, MIME_ZIP};
use crate::error::{ExtractionError, ExtractionResult};
use crate::normalizer::ExtractedText;

/// Offset of the `ustar` magic in a tar header
const TAR_MAGIC_OFFSET: usize = 257;

/// Concatenates member output as UTF-8 bytes
#[derive(Default)]
struct MemberText {
    bytes: Vec<u8>,
}

impl MemberText {
    fn push(&mut self, text: ExtractedText) -> ExtractionResult<()> {
        let text = text.into_utf8_bytes()?;
        if text.is_empty() {
            return Ok(());
        }
        let needed = text.len().saturating_add(1);
        self.bytes
            .try_reserve(needed)
            .map_err(|source| ExtractionError::AllocationFailed {
                requested: needed,
                source,
            })?;
        if !self.bytes.is_empty() {
            self.bytes.push(b'\n');
        }
        self.bytes.extend_from_slice(&text);
        Ok(())
    }

    fn finish(self) -> ExtractedText {
        ExtractedText::Bytes(self.bytes)
    }
}

pub struct ZipDecoder;

impl Decoder for ZipDecoder {
    fn name(&self) -> &'static str {
        "ZIP"
    }

    fn supports(&self, mime: &str) -> bool {
        matches!(mime, MIME_ZIP | "application/x-zip-compressed")
    }

    fn decode(
        &self,
        _content_type: &str,
        input: &[u8],
        cx: &mut DecodeContext<'_>,
    ) -> ExtractionResult<ExtractedText> {
        let mut archive = zip::ZipArchive::new(Cursor::new(input))
            .map_err(|e| ExtractionError::malformed(self.name(), e))?;
        let mut out = MemberText::default();

        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| ExtractionError::malformed(self.name(), e))?;
            if !entry.is_file() {
                continue;
            }
            let name = entry.name().to_string();
            let bytes = cx.read_to_end(entry, |e| ExtractionError::malformed("ZIP", e))?;
            if let Some(text) = cx.decode_member(&name, &bytes)? {
                out.push(text)?;
            }
        }
        Ok(out.finish())
    }
}

pub struct TarDecoder;

impl Decoder for TarDecoder {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn supports(&self, mime: &str) -> bool {
        mime == MIME_TAR
    }

    fn decode(
        &self,
        _content_type: &str,
        input: &[u8],
        cx: &mut DecodeContext<'_>,
    ) -> ExtractionResult<ExtractedText> {
        let mut archive = tar::Archive::new(input);
        let mut out = MemberText::default();

        let entries = archive
            .entries()
            .map_err(|e| ExtractionError::malformed(self.name(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ExtractionError::malformed(self.name(), e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry
                .path()
                .map_err(|e| ExtractionError::malformed(self.name(), e))?
                .to_string_lossy()
                .into_owned();
            let bytes = cx.read_to_end(entry, |e| ExtractionError::malformed("tar", e))?;
            if let Some(text) = cx.decode_member(&name, &bytes)? {
                out.push(text)?;
            }
        }
        Ok(out.finish())
    }
}

/// Gzip stream; a tarball inside is unpacked, anything else is read as text
pub struct GzipDecoder;

impl Decoder for GzipDecoder {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn supports(&self, mime: &str) -> bool {
        matches!(mime, MIME_GZIP | "application/x-gzip")
    }

    fn decode(
        &self,
        _content_type: &str,
        input: &[u8],
        cx: &mut DecodeContext<'_>,
    ) -> ExtractionResult<ExtractedText> {
        let inflated = cx.read_to_end(flate2::read::GzDecoder::new(input), |e| {
            ExtractionError::malformed("gzip", e)
        })?;

        let inner_name = if is_tarball(&inflated) {
            "inner.tar"
        } else {
            "inner.txt"
        };
        Ok(cx
            .decode_member(inner_name, &inflated)?
            .unwrap_or_else(|| ExtractedText::Bytes(Vec::new())))
    }
}

fn is_tarball(bytes: &[u8]) -> bool {
    bytes
        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET.saturating_add(5))
        .is_some_and(|magic| magic == b"ustar")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::DecoderRegistry;
    use std::io::Write;

    fn tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, body) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *body).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn decode_with(decoder: &dyn Decoder, input: &[u8], limit: u64) -> ExtractionResult<String> {
        let registry = DecoderRegistry::with_builtin();
        let mut cx = DecodeContext::new(&registry, limit);
        let bytes = decoder.decode("", input, &mut cx)?.into_utf8_bytes()?;
        Ok(String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn test_tar_members_are_concatenated() {
        let tar = tarball(&[
            ("a.txt", &b"first"[..]),
            ("image.png", &b"\x89PNG"[..]),
            ("b.md", &b"second"[..]),
        ]);
        assert_eq!(
            decode_with(&TarDecoder, &tar, 1 << 20).unwrap(),
            "first\nsecond"
        );
    }

    #[test]
    fn test_gzip_wrapped_tarball() {
        let tgz = gzip(&tarball(&[("readme.txt", &b"inside"[..])]));
        assert_eq!(decode_with(&GzipDecoder, &tgz, 1 << 20).unwrap(), "inside");
    }

    #[test]
    fn test_gzip_wrapped_text() {
        let gz = gzip(b"just text");
        assert_eq!(decode_with(&GzipDecoder, &gz, 1 << 20).unwrap(), "just text");
    }

    #[test]
    fn test_zip_members() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("notes.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"zipped").unwrap();
        let zip = writer.finish().unwrap().into_inner();
        assert_eq!(decode_with(&ZipDecoder, &zip, 1 << 20).unwrap(), "zipped");
    }

    #[test]
    fn test_decompression_bomb_hits_ceiling() {
        let gz = gzip(&vec![b'a'; 64 * 1024]);
        let error = decode_with(&GzipDecoder, &gz, 1024).unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::DecodedSizeExceeded { limit: 1024 }
        ));
    }

    #[test]
    fn test_corrupt_gzip_is_malformed() {
        let error = decode_with(&GzipDecoder, b"not gzip", 1024).unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::Malformed { format: "gzip", .. }
        ));
    }
}
