//! Content type resolution
//!
//! Hosts often report an archive by its container format only, so a
//! `.tar.gz` upload arrives as `application/x-tar`. The resolver maps such
//! declarations to the codec that actually has to run first.

use std::path::Path;

pub const MIME_TAR: &str = "application/x-tar";
pub const MIME_GZIP: &str = "application/gzip";
pub const MIME_BZIP2: &str = "application/x-bzip2";
pub const MIME_ZIP: &str = "application/zip";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Resolve the effective content type of a file
///
/// A declared generic tar container is narrowed by the outer compression
/// suffix of `path` (`.gz` or `.bz2`, case-insensitive). Every other
/// declaration is returned unchanged.
pub fn resolve_content_type<'a>(path: &Path, declared: &'a str) -> &'a str {
    if !essence(declared).eq_ignore_ascii_case(MIME_TAR) {
        return declared;
    }

    match extension(path).as_deref() {
        Some("gz") => MIME_GZIP,
        Some("bz2") => MIME_BZIP2,
        _ => declared,
    }
}

/// Guess a content type from a file name, used for archive members and for
/// attachments uploaded without a declared type
pub fn guess_from_path(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("txt" | "text" | "log" | "md" | "rst") => MIME_TEXT,
        Some("csv") => "text/csv",
        Some("html" | "htm") => "text/html",
        Some("xml") => "application/xml",
        Some("json") => "application/json",
        Some("pdf") => MIME_PDF,
        Some("docx") => MIME_DOCX,
        Some("pptx") => MIME_PPTX,
        Some("xlsx") => MIME_XLSX,
        Some("zip") => MIME_ZIP,
        Some("tar") => MIME_TAR,
        Some("gz" | "tgz") => MIME_GZIP,
        Some("bz2") => MIME_BZIP2,
        _ => MIME_OCTET_STREAM,
    }
}

/// MIME type without parameters (`text/plain; charset=utf-8` -> `text/plain`)
pub fn essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

/// Value of the `charset` parameter, if present
pub fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tar_with_gzip_suffix_resolves_to_gzip() {
        assert_eq!(
            resolve_content_type(Path::new("/files/backup.tar.gz"), MIME_TAR),
            MIME_GZIP
        );
        assert_eq!(
            resolve_content_type(Path::new("/files/BACKUP.TAR.GZ"), MIME_TAR),
            MIME_GZIP
        );
    }

    #[test]
    fn test_tar_with_bzip2_suffix_resolves_to_bzip2() {
        assert_eq!(
            resolve_content_type(Path::new("logs.tar.bz2"), MIME_TAR),
            MIME_BZIP2
        );
    }

    #[test]
    fn test_plain_tar_is_unchanged() {
        assert_eq!(resolve_content_type(Path::new("a.tar"), MIME_TAR), MIME_TAR);
        assert_eq!(resolve_content_type(Path::new("archive"), MIME_TAR), MIME_TAR);
    }

    #[test]
    fn test_other_types_ignore_suffix() {
        assert_eq!(
            resolve_content_type(Path::new("report.pdf.gz"), MIME_PDF),
            MIME_PDF
        );
    }

    #[test]
    fn test_declared_parameters_are_ignored_for_matching() {
        assert_eq!(
            resolve_content_type(Path::new("a.tgz.gz"), "application/x-tar; foo=bar"),
            MIME_GZIP
        );
    }

    #[test]
    fn test_charset_parameter() {
        assert_eq!(charset("text/plain; charset=Shift_JIS"), Some("Shift_JIS"));
        assert_eq!(charset("text/plain; charset=\"utf-8\""), Some("utf-8"));
        assert_eq!(charset("text/plain"), None);
        assert_eq!(essence(" text/plain ; charset=utf-8"), "text/plain");
    }

    #[test]
    fn test_guess_from_path() {
        assert_eq!(guess_from_path(Path::new("notes.TXT")), MIME_TEXT);
        assert_eq!(guess_from_path(Path::new("deck.pptx")), MIME_PPTX);
        assert_eq!(guess_from_path(Path::new("unknown")), MIME_OCTET_STREAM);
    }
}
