//! Office Open XML decoder (docx, pptx, xlsx)

use quick_xml::events::Event;
use std::io::Cursor;

use super::{DecodeContext, Decoder};
use crate::content_type::{MIME_DOCX, MIME_PPTX, MIME_XLSX};
use crate::error::{ExtractionError, ExtractionResult};
use crate::normalizer::ExtractedText;

/// Maximum sheets to read from a workbook
const XLSX_MAX_SHEETS: usize = 100;

type Archive<'i> = zip::ZipArchive<Cursor<&'i [u8]>>;

pub struct OoxmlDecoder;

impl Decoder for OoxmlDecoder {
    fn name(&self) -> &'static str {
        "OOXML"
    }

    fn supports(&self, mime: &str) -> bool {
        matches!(mime, MIME_DOCX | MIME_PPTX | MIME_XLSX)
    }

    fn decode(
        &self,
        content_type: &str,
        input: &[u8],
        cx: &mut DecodeContext<'_>,
    ) -> ExtractionResult<ExtractedText> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(input)).map_err(|e| malformed(&e))?;
        let mime = crate::content_type::essence(content_type).to_ascii_lowercase();

        let text = match mime.as_str() {
            MIME_PPTX => extract_pptx(&mut archive, cx)?,
            MIME_XLSX => extract_xlsx(&mut archive, cx)?,
            _ => {
                let xml = read_entry(&mut archive, "word/document.xml", cx)?;
                extract_text_runs(&xml, b"p", cx)?
            }
        };
        Ok(ExtractedText::Text(text))
    }
}

fn malformed(error: &dyn std::fmt::Display) -> ExtractionError {
    ExtractionError::malformed("OOXML", error)
}

fn read_entry(
    archive: &mut Archive<'_>,
    name: &str,
    cx: &mut DecodeContext<'_>,
) -> ExtractionResult<Vec<u8>> {
    let entry = archive.by_name(name).map_err(|e| malformed(&e))?;
    cx.read_to_end(entry, |e| malformed(&e))
}

/// Entry names sharing `prefix`, ordered by their numeric suffix
fn numbered_entries(archive: &Archive<'_>, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with(prefix) && name.ends_with(".xml"))
        .map(ToString::to_string)
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Collect the text of every `<*:t>` element, one line per `block` element
fn extract_text_runs(
    xml: &[u8],
    block: &[u8],
    cx: &mut DecodeContext<'_>,
) -> ExtractionResult<String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(text)) if in_text => {
                let text = text.unescape().map_err(|e| malformed(&e))?;
                cx.push_str(&mut out, &text)?;
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"t" {
                    in_text = false;
                } else if name.as_ref() == block && !out.is_empty() && !out.ends_with('\n') {
                    cx.push_str(&mut out, "\n")?;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(&e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn extract_pptx(archive: &mut Archive<'_>, cx: &mut DecodeContext<'_>) -> ExtractionResult<String> {
    let mut out = String::new();
    for name in numbered_entries(archive, "ppt/slides/slide") {
        let xml = read_entry(archive, &name, cx)?;
        let text = extract_text_runs(&xml, b"p", cx)?;
        if !out.is_empty() && !text.is_empty() {
            cx.push_str(&mut out, "\n")?;
        }
        cx.push_str(&mut out, &text)?;
    }
    Ok(out)
}

fn extract_xlsx(archive: &mut Archive<'_>, cx: &mut DecodeContext<'_>) -> ExtractionResult<String> {
    let shared_strings = if archive.index_for_name("xl/sharedStrings.xml").is_some() {
        read_shared_strings(&read_entry(archive, "xl/sharedStrings.xml", cx)?)?
    } else {
        Vec::new()
    };

    let mut out = String::new();
    for name in numbered_entries(archive, "xl/worksheets/sheet")
        .into_iter()
        .take(XLSX_MAX_SHEETS)
    {
        let xml = read_entry(archive, &name, cx)?;
        let cells = extract_sheet_cells(&xml, &shared_strings)?;
        if !out.is_empty() && !cells.is_empty() {
            cx.push_str(&mut out, "\n")?;
        }
        cx.push_str(&mut out, &cells.join(" "))?;
    }
    Ok(out)
}

fn read_shared_strings(xml: &[u8]) -> ExtractionResult<Vec<String>> {
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(text)) if in_text => {
                current.push_str(&text.unescape().map_err(|e| malformed(&e))?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(&e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Cell values of one sheet: shared strings, inline strings and literals
fn extract_sheet_cells(xml: &[u8], shared_strings: &[String]) -> ExtractionResult<Vec<String>> {
    let mut cells = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_value = false;
    let mut shared = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    shared = e.attributes().flatten().any(|attribute| {
                        attribute.key.as_ref() == b"t" && attribute.value.as_ref() == b"s"
                    });
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::Text(text)) if in_value => {
                let value = text.unescape().map_err(|e| malformed(&e))?;
                let value = value.trim();
                if shared {
                    if let Some(string) = value
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| shared_strings.get(index))
                    {
                        cells.push(string.clone());
                    }
                } else if !value.is_empty() {
                    cells.push(value.to_string());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => shared = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(&e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells)
}
