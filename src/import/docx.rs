//! Paragraph text extraction from .docx files.
//!
//! A .docx is a zip archive; the body lives in `word/document.xml`. Only
//! run text is kept, one string per `<w:p>` paragraph.

use std::io::{Cursor, Read};
use std::mem::take;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ImportError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the text of every paragraph in document order
pub fn document_paragraphs(bytes: &[u8]) -> Result<Vec<String>, ImportError> {
  let mut archive =
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ImportError::Document(e.to_string()))?;
  let mut part = archive
    .by_name(DOCUMENT_PART)
    .map_err(|e| ImportError::Document(format!("{}: {}", DOCUMENT_PART, e)))?;

  let mut xml = String::new();
  part
    .read_to_string(&mut xml)
    .map_err(|e| ImportError::Document(e.to_string()))?;
  xml_paragraphs(&xml)
}

fn malformed(e: impl std::fmt::Display) -> ImportError {
  ImportError::Document(format!("{}: {}", DOCUMENT_PART, e))
}

fn xml_paragraphs(xml: &str) -> Result<Vec<String>, ImportError> {
  let mut reader = Reader::from_str(xml);
  let mut paragraphs = Vec::new();
  let mut current = String::new();
  let mut in_text = false;
  let mut in_properties = false;
  // Inside mc:Fallback, which repeats the text of the preceding mc:Choice
  let mut fallback_depth = 0usize;

  loop {
    match reader.read_event().map_err(malformed)? {
      Event::Start(e) => match e.name().as_ref() {
        b"mc:Fallback" => fallback_depth += 1,
        _ if fallback_depth > 0 => {}
        b"w:t" => in_text = true,
        b"w:pPr" => in_properties = true,
        b"w:tab" if !in_properties => current.push('\t'),
        _ => {}
      },
      Event::End(e) => match e.name().as_ref() {
        b"mc:Fallback" => fallback_depth = fallback_depth.saturating_sub(1),
        _ if fallback_depth > 0 => {}
        b"w:t" => in_text = false,
        b"w:pPr" => in_properties = false,
        b"w:p" => paragraphs.push(take(&mut current)),
        _ => {}
      },
      Event::Empty(e) => match e.name().as_ref() {
        _ if fallback_depth > 0 => {}
        // Tab stops inside paragraph properties are not content
        b"w:tab" if !in_properties => current.push('\t'),
        b"w:br" | b"w:cr" => current.push('\n'),
        b"w:p" => paragraphs.push(take(&mut current)),
        _ => {}
      },
      Event::Text(t) if in_text && fallback_depth == 0 => {
        current.push_str(&t.unescape().map_err(malformed)?);
      }
      Event::Eof => break,
      _ => {}
    }
  }
  Ok(paragraphs)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn paragraph(text: &str) -> String {
    format!(r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
  }

  fn docx(body: &str) -> Vec<u8> {
    let xml = format!(
      r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="x"><w:body>{body}</w:body></w:document>"#
    );
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
      .compression_method(zip::CompressionMethod::Stored);
    zip.start_file(DOCUMENT_PART, options).unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
  }

  #[test]
  fn test_runs_are_joined_per_paragraph() {
    let xml = r#"<w:p><w:r><w:t>Which </w:t></w:r><w:r><w:t>surah?</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>A &amp; B &#1575; &#x41;</w:t></w:r></w:p>"#;
    assert_eq!(xml_paragraphs(xml).unwrap(), vec!["Which surah?", "", "A & B ا A"]);
  }

  #[test]
  fn test_tab_stops_in_properties_ignored() {
    assert_eq!(xml_paragraphs(&paragraph("x")).unwrap(), vec!["x"]);
  }

  #[test]
  fn test_angle_bracket_in_attribute_value() {
    let xml = r#"<w:p><w:r w:rsidR="a>b"><w:t>text</w:t></w:r></w:p>"#;
    assert_eq!(xml_paragraphs(xml).unwrap(), vec!["text"]);
  }

  #[test]
  fn test_alternate_content_fallback_not_repeated() {
    let xml = r#"<w:p><w:r><mc:AlternateContent><mc:Choice Requires="wps"><w:t>boxed</w:t></mc:Choice><mc:Fallback><w:t>boxed</w:t></mc:Fallback></mc:AlternateContent></w:r></w:p>"#;
    assert_eq!(xml_paragraphs(xml).unwrap(), vec!["boxed"]);
  }

  #[test]
  fn test_malformed_xml_is_document_error() {
    assert!(matches!(
      xml_paragraphs("<w:p><w:t>open</w:p>"),
      Err(ImportError::Document(_))
    ));
  }

  #[test]
  fn test_document_paragraphs_from_archive() {
    let body: String = [
      "1. Which surah opens the Quran?",
      "1) Al-Fatiha",
      "2) Al-Baqarah",
      "3) Al-Ikhlas",
      "4) An-Nas",
      "Answer: 1",
    ]
    .iter()
    .map(|line| paragraph(line))
    .collect();

    let bytes = docx(&body);
    let paragraphs = document_paragraphs(&bytes).unwrap();
    assert_eq!(paragraphs.len(), 6);

    let questions = crate::import::parse_upload("bank.docx", &bytes).unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].options[0], "Al-Fatiha");
  }

  #[test]
  fn test_not_a_zip() {
    assert!(matches!(
      document_paragraphs(b"plain text"),
      Err(ImportError::Document(_))
    ));
  }
}
