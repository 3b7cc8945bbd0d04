use anyhow::{Context, Result, anyhow};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{ERROR_STYLE, HEADING_STYLE, Page};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DOCUMENT_PART: &str = "word/document.xml";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="480" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:customStyle="1" w:styleId="TranslationError"><w:name w:val="Translation Error"/><w:basedOn w:val="Normal"/><w:rPr><w:i/><w:color w:val="C00000"/></w:rPr></w:style></w:styles>"#;

/// A paragraph read back from `word/document.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub style: Option<String>,
    pub text: String,
    pub page_break: bool,
}

pub(super) fn write_package(pages: &[Page]) -> Result<Vec<u8>> {
    let document = render_document_xml(pages)?;
    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS_XML.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
        ("word/styles.xml", STYLES_XML.as_bytes()),
        (DOCUMENT_PART, &document),
    ];

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in parts {
        writer
            .start_file(name, options)
            .with_context(|| format!("failed to start docx part {}", name))?;
        writer
            .write_all(content)
            .with_context(|| format!("failed to write docx part {}", name))?;
    }
    let bytes = writer
        .finish()
        .with_context(|| "failed to finalize docx package")?
        .into_inner();
    Ok(bytes)
}

fn render_document_xml(pages: &[Page]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("w:document").with_attributes([("xmlns:w", W_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("w:body")))?;

    for page in pages {
        write_paragraph(&mut writer, Some(HEADING_STYLE), &page.heading)?;
        let style = page.failed.then_some(ERROR_STYLE);
        write_paragraph(&mut writer, style, &page.body)?;
        write_page_break(&mut writer)?;
    }

    // US Letter, one inch margins
    writer.write_event(Event::Start(BytesStart::new("w:sectPr")))?;
    writer.write_event(Event::Empty(
        BytesStart::new("w:pgSz").with_attributes([("w:w", "12240"), ("w:h", "15840")]),
    ))?;
    writer.write_event(Event::Empty(BytesStart::new("w:pgMar").with_attributes([
        ("w:top", "1440"),
        ("w:right", "1440"),
        ("w:bottom", "1440"),
        ("w:left", "1440"),
        ("w:header", "720"),
        ("w:footer", "720"),
        ("w:gutter", "0"),
    ])))?;
    writer.write_event(Event::End(BytesEnd::new("w:sectPr")))?;

    writer.write_event(Event::End(BytesEnd::new("w:body")))?;
    writer.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(writer.into_inner())
}

fn write_paragraph(writer: &mut Writer<Vec<u8>>, style: Option<&str>, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("w:p")))?;
    if let Some(style) = style {
        writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
        writer.write_event(Event::Empty(
            BytesStart::new("w:pStyle").with_attributes([("w:val", style)]),
        ))?;
        writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
    }

    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    let text = sanitize_text(text);
    for (line_idx, line) in text.split('\n').enumerate() {
        if line_idx > 0 {
            writer.write_event(Event::Empty(BytesStart::new("w:br")))?;
        }
        for (tab_idx, chunk) in line.split('\t').enumerate() {
            if tab_idx > 0 {
                writer.write_event(Event::Empty(BytesStart::new("w:tab")))?;
            }
            if chunk.is_empty() {
                continue;
            }
            writer.write_event(Event::Start(
                BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
            ))?;
            writer.write_event(Event::Text(BytesText::new(chunk)))?;
            writer.write_event(Event::End(BytesEnd::new("w:t")))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

fn write_page_break(writer: &mut Writer<Vec<u8>>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("w:p")))?;
    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    writer.write_event(Event::Empty(
        BytesStart::new("w:br").with_attributes([("w:type", "page")]),
    ))?;
    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

/// Normalizes line endings and drops characters XML 1.0 cannot carry.
fn sanitize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|ch| match *ch {
            '\t' | '\n' => true,
            '\u{FFFE}' | '\u{FFFF}' => false,
            ch => ch >= '\u{20}',
        })
        .collect()
}

/// Reads the paragraphs of a generated package back, in document order.
pub fn read_paragraphs(bytes: &[u8]) -> Result<Vec<Paragraph>> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).with_context(|| "failed to read docx archive")?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .with_context(|| "docx package has no word/document.xml")?
        .read_to_string(&mut xml)
        .with_context(|| "failed to read word/document.xml")?;

    let mut reader = Reader::from_str(&xml);
    reader.trim_text(false);
    let mut paragraphs = Vec::new();
    let mut current: Option<Paragraph> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current = Some(Paragraph::default()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                let Some(paragraph) = current.as_mut() else {
                    continue;
                };
                match e.name().as_ref() {
                    b"w:pStyle" => {
                        if let Some(value) = e.try_get_attribute("w:val")? {
                            paragraph.style = Some(value.unescape_value()?.into_owned());
                        }
                    }
                    b"w:br" => match e.try_get_attribute("w:type")? {
                        Some(kind) if kind.value.as_ref() == b"page" => {
                            paragraph.page_break = true;
                        }
                        _ => paragraph.text.push('\n'),
                    },
                    b"w:tab" => paragraph.text.push('\t'),
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if in_text {
                    if let Some(paragraph) = current.as_mut() {
                        paragraph.text.push_str(&e.unescape()?);
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(anyhow!("failed to parse document xml: {}", err)),
        }
    }
    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(heading: &str, body: &str, failed: bool) -> Page {
        Page {
            heading: heading.to_string(),
            body: body.to_string(),
            failed,
        }
    }

    fn describe(paragraphs: &[Paragraph]) -> String {
        paragraphs
            .iter()
            .map(|paragraph| {
                if paragraph.page_break {
                    "--- page break ---".to_string()
                } else {
                    format!(
                        "[{}] {}",
                        paragraph.style.as_deref().unwrap_or("Normal"),
                        paragraph.text.replace('\n', "\\n")
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn package_layout_snapshot() {
        let bytes = write_package(&[
            page("Translation in fr", "Bonjour le monde", false),
            page(
                "Translation in de",
                "Error translating to de: invalid destination language",
                true,
            ),
        ])
        .unwrap();
        let paragraphs = read_paragraphs(&bytes).unwrap();
        insta::assert_snapshot!(describe(&paragraphs), @r"
        [Heading1] Translation in fr
        [Normal] Bonjour le monde
        --- page break ---
        [Heading1] Translation in de
        [TranslationError] Error translating to de: invalid destination language
        --- page break ---
        ");
    }

    #[test]
    fn package_contains_required_parts() {
        let bytes = write_package(&[page("Translation in es", "Hola", false)]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "word/_rels/document.xml.rels",
                "word/document.xml",
                "word/styles.xml",
            ]
        );
    }

    #[test]
    fn multiline_text_and_markup_survive() {
        let body = "Total: <5 & 6>\r\nline two\tcolumn\u{000C}";
        let bytes = write_package(&[page("Translation in en", body, false)]).unwrap();
        let paragraphs = read_paragraphs(&bytes).unwrap();
        assert_eq!(paragraphs[1].text, "Total: <5 & 6>\nline two\tcolumn");
    }

    #[test]
    fn empty_document_has_no_paragraphs() {
        let bytes = write_package(&[]).unwrap();
        assert!(read_paragraphs(&bytes).unwrap().is_empty());
    }

    #[test]
    fn sanitize_removes_control_characters() {
        assert_eq!(sanitize_text("a\u{0000}b\u{0007}c\u{FFFF}"), "abc");
        assert_eq!(sanitize_text("one\rtwo"), "one\ntwo");
    }
}
