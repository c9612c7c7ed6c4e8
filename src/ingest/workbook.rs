// src/ingest/workbook.rs
//! Workbook parsing: cell grid plus embedded-image enumeration
//!
//! calamine exposes the cell grid but not anchored pictures, so images are
//! pulled straight out of the xlsx ZIP container: `xl/drawings/drawingN.xml`
//! holds `<xdr:pic>` elements with a relationship id and a from-cell anchor,
//! `xl/drawings/_rels/drawingN.xml.rels` maps the relationship id to a file
//! under `xl/media/`.

use calamine::{open_workbook, Data, Reader, Xlsx};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read as IoRead;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// One embedded raster image and the sheet row it anchors to
pub struct EmbeddedImage {
    pub bytes: Vec<u8>,
    /// Nominal format from the media filename extension, lowercased
    pub format_hint: String,
    /// Integer part of the anchor's fractional row (the `<xdr:from>` row)
    pub anchor_row: u32,
}

/// Parsed view of one uploaded workbook: primary-sheet rows and embedded images
pub struct ParsedWorkbook {
    pub rows: Vec<Vec<Data>>,
    pub images: Vec<EmbeddedImage>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("could not open workbook: {0}")]
    Open(String),
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("could not read sheet: {0}")]
    Sheet(String),
}

/// Parse an uploaded xlsx file: primary sheet's rows plus embedded images.
///
/// Image enumeration is best-effort: a workbook without drawing parts (or
/// with unreadable ones) yields an empty image list, never an error.
pub fn parse_workbook(path: &Path) -> Result<ParsedWorkbook, WorkbookError> {
    let mut workbook: Xlsx<std::io::BufReader<File>> =
        open_workbook::<Xlsx<std::io::BufReader<File>>, _>(path)
            .map_err(|e| WorkbookError::Open(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(WorkbookError::NoSheets)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| WorkbookError::Sheet(e.to_string()))?;

    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();

    let images = extract_embedded_images(path);

    Ok(ParsedWorkbook { rows, images })
}

/// Render a cell as text. Integral floats print without the trailing `.0`
/// (phone numbers and ages come in as floats from most spreadsheets).
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => cell.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Empty | Data::Error(_) => String::new(),
    }
}

/// Enumerate embedded images from the first sheet's drawing part
fn extract_embedded_images(path: &Path) -> Vec<EmbeddedImage> {
    let Ok(file) = File::open(path) else {
        return Vec::new();
    };
    let Ok(mut archive) = ZipArchive::new(file) else {
        return Vec::new();
    };

    // Primary sheet only: sheet1 -> drawing1
    let Ok(drawing_xml) = read_zip_file(&mut archive, "xl/drawings/drawing1.xml") else {
        debug!("Workbook has no drawing part; no embedded images");
        return Vec::new();
    };
    let anchors = parse_drawing_anchors(&drawing_xml);
    if anchors.is_empty() {
        return Vec::new();
    }

    let Ok(rels_xml) = read_zip_file(&mut archive, "xl/drawings/_rels/drawing1.xml.rels") else {
        return Vec::new();
    };
    let relationships = parse_relationships(&rels_xml);

    let mut images = Vec::new();
    for (rel_id, anchor_row) in anchors {
        let Some(target) = relationships.get(&rel_id) else {
            continue;
        };
        // Targets are relative, e.g. "../media/image1.png"
        let media_path = target.strip_prefix("../media/").map_or_else(
            || format!("xl/{}", target),
            |suffix| format!("xl/media/{}", suffix),
        );

        let bytes = {
            let Ok(mut entry) = archive.by_name(&media_path) else {
                debug!(media = %media_path, "Embedded image target missing from archive");
                continue;
            };
            let mut buf = Vec::new();
            if entry.read_to_end(&mut buf).is_err() {
                continue;
            }
            buf
        };

        let format_hint = media_path
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        images.push(EmbeddedImage {
            bytes,
            format_hint,
            anchor_row,
        });
    }

    images
}

/// Parse drawing XML for `<xdr:pic>` elements: relationship id + from-row anchor
fn parse_drawing_anchors(xml: &str) -> Vec<(String, u32)> {
    let mut pictures = Vec::new();
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut in_pic = false;
    let mut in_from = false;
    let mut in_from_row = false;

    let mut current_rel_id: Option<String> = None;
    let mut from_row: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => match e.name().as_ref() {
                b"xdr:pic" | b"pic" => in_pic = true,
                b"a:blip" | b"blip" if in_pic => {
                    for attr in e.attributes().filter_map(Result::ok) {
                        let key = attr.key;
                        if key.as_ref() == b"r:embed" || key.as_ref() == b"embed" {
                            if let Ok(value) = attr.decode_and_unescape_value(&reader) {
                                current_rel_id = Some(value.to_string());
                            }
                        }
                    }
                }
                b"xdr:from" | b"from" => in_from = true,
                b"xdr:row" | b"row" if in_from => in_from_row = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_from_row {
                    if let Ok(text) = e.unescape() {
                        from_row = text.trim().parse().unwrap_or(0);
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"xdr:pic" | b"pic" => {
                    if let Some(rel_id) = current_rel_id.take() {
                        pictures.push((rel_id, from_row));
                    }
                    in_pic = false;
                    from_row = 0;
                }
                b"xdr:from" | b"from" => in_from = false,
                b"xdr:row" | b"row" if in_from => in_from_row = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    pictures
}

/// Parse a relationships part into id -> target
fn parse_relationships(xml: &str) -> HashMap<String, String> {
    let mut relationships = HashMap::new();
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e) | Event::Start(e)) => {
                if e.name().as_ref() == b"Relationship" {
                    let mut id = None;
                    let mut target = None;

                    for attr in e.attributes().filter_map(Result::ok) {
                        match attr.key.as_ref() {
                            b"Id" => {
                                if let Ok(value) = attr.decode_and_unescape_value(&reader) {
                                    id = Some(value.to_string());
                                }
                            }
                            b"Target" => {
                                if let Ok(value) = attr.decode_and_unescape_value(&reader) {
                                    target = Some(value.to_string());
                                }
                            }
                            _ => {}
                        }
                    }

                    if let (Some(id), Some(target)) = (id, target) {
                        relationships.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    relationships
}

fn read_zip_file(archive: &mut ZipArchive<File>, path: &str) -> std::io::Result<String> {
    let mut entry = archive
        .by_name(path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_integral_float_has_no_decimal_point() {
        assert_eq!(cell_text(&Data::Float(5551234.0)), "5551234");
        assert_eq!(cell_text(&Data::Float(3.5)), "3.5");
        assert_eq!(cell_text(&Data::Int(29)), "29");
        assert_eq!(cell_text(&Data::String("  Alice ".to_string())), "Alice");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_parse_drawing_anchors_extracts_rel_id_and_row() {
        let xml = r#"<?xml version="1.0"?>
            <xdr:wsDr xmlns:xdr="x" xmlns:a="a" xmlns:r="r">
              <xdr:twoCellAnchor>
                <xdr:from>
                  <xdr:col>0</xdr:col><xdr:colOff>9525</xdr:colOff>
                  <xdr:row>3</xdr:row><xdr:rowOff>19050</xdr:rowOff>
                </xdr:from>
                <xdr:to>
                  <xdr:col>1</xdr:col><xdr:colOff>0</xdr:colOff>
                  <xdr:row>4</xdr:row><xdr:rowOff>0</xdr:rowOff>
                </xdr:to>
                <xdr:pic>
                  <xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill>
                </xdr:pic>
              </xdr:twoCellAnchor>
            </xdr:wsDr>"#;
        let anchors = parse_drawing_anchors(xml);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].0, "rId1");
        assert_eq!(anchors[0].1, 3);
    }

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<?xml version="1.0"?>
            <Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
              <Relationship Id="rId1" Type="image" Target="../media/image1.png"/>
              <Relationship Id="rId2" Type="image" Target="../media/image2.jpeg"/>
            </Relationships>"#;
        let rels = parse_relationships(xml);
        assert_eq!(rels.get("rId1").unwrap(), "../media/image1.png");
        assert_eq!(rels.get("rId2").unwrap(), "../media/image2.jpeg");
    }
}
