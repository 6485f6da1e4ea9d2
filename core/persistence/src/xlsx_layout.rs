//! FILENAME: core/persistence/src/xlsx_layout.rs
//! PURPOSE: Reads the parts of an XLSX package that calamine does not expose.
//! CONTEXT: Sheet order, part paths, the active tab and the date system come
//! from xl/workbook.xml and its relationships. Per sheet we collect the style
//! id of every cell, column widths, row heights, merged ranges, hyperlinks and
//! the notes stored in the sheet's comments part.

use crate::xlsx_styles::{attr, parse_styles};
use crate::{ColumnSpan, PersistenceError};
use engine::annotation::{Hyperlink, LinkTarget, Note};
use engine::coord::{parse_a1, MergedRegion, MAX_COL};
use engine::style::CellStyle;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

const STYLES_REL_SUFFIX: &str = "/styles";
const COMMENTS_REL_SUFFIX: &str = "/comments";

/// One entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Relationship {
    pub rel_type: String,
    pub target: String,
}

type Relationships = HashMap<String, Relationship>;

/// A worksheet entry from xl/workbook.xml.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SheetEntry {
    pub name: String,
    /// Package path of the sheet part, e.g. "xl/worksheets/sheet1.xml".
    pub path: String,
}

/// Workbook-level structure.
#[derive(Debug, Clone, Default)]
pub(crate) struct PackageLayout {
    pub sheets: Vec<SheetEntry>,
    pub active_tab: usize,
    /// Serial numbers count days from 1904-01-01 instead of 1900-01-00.
    pub date1904: bool,
    /// One entry per `cellXfs` record; None where the style is unusable.
    pub styles: Vec<Option<CellStyle>>,
}

/// Formatting and structure of one worksheet.
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetLayout {
    /// Style id per populated cell position (only non-zero ids are kept).
    pub cell_styles: HashMap<(u32, u32), usize>,
    pub column_widths: Vec<ColumnSpan>,
    pub row_heights: HashMap<u32, f64>,
    pub merged_regions: Vec<MergedRegion>,
    pub hyperlinks: Vec<Hyperlink>,
    pub notes: Vec<Note>,
}

/// Read a part as UTF-8 text. Ok(None) when the package has no such part.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, PersistenceError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(Some(text))
}

/// Resolve a relationship target against the folder of the part that owns it.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    parts.join("/")
}

/// "xl/worksheets/sheet1.xml" -> ("xl/worksheets", "xl/worksheets/_rels/sheet1.xml.rels")
fn part_rels(path: &str) -> (&str, String) {
    match path.rsplit_once('/') {
        Some((dir, file)) => (dir, format!("{}/_rels/{}.rels", dir, file)),
        None => ("", format!("_rels/{}.rels", path)),
    }
}

pub(crate) fn parse_relationships(xml: &str) -> Result<Relationships, PersistenceError> {
    let mut rels = Relationships::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                    let rel_type = attr(&e, b"Type").unwrap_or_default();
                    rels.insert(id, Relationship { rel_type, target });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

pub(crate) fn read_package<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<PackageLayout, PersistenceError> {
    let workbook_xml = read_part(archive, "xl/workbook.xml")?
        .ok_or_else(|| PersistenceError::InvalidFormat("missing xl/workbook.xml".to_string()))?;
    let rels = match read_part(archive, "xl/_rels/workbook.xml.rels")? {
        Some(xml) => parse_relationships(&xml)?,
        None => Relationships::new(),
    };

    let mut layout = PackageLayout::default();
    let mut reader = Reader::from_str(&workbook_xml);
    reader.trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let name = attr(&e, b"name").unwrap_or_default();
                    // r:id, matched by local name
                    let path = attr(&e, b"id")
                        .and_then(|id| rels.get(&id))
                        .map(|rel| resolve_target("xl", &rel.target))
                        .unwrap_or_else(|| {
                            format!("xl/worksheets/sheet{}.xml", layout.sheets.len() + 1)
                        });
                    layout.sheets.push(SheetEntry { name, path });
                }
                b"workbookPr" => {
                    layout.date1904 =
                        attr(&e, b"date1904").map_or(false, |v| matches!(v.as_str(), "1" | "true"));
                }
                b"workbookView" => {
                    layout.active_tab = attr(&e, b"activeTab")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let styles_path = rels
        .values()
        .find(|rel| rel.rel_type.ends_with(STYLES_REL_SUFFIX))
        .map(|rel| resolve_target("xl", &rel.target))
        .unwrap_or_else(|| "xl/styles.xml".to_string());
    if let Some(styles_xml) = read_part(archive, &styles_path)? {
        layout.styles = parse_styles(&styles_xml)?;
    }

    Ok(layout)
}

pub(crate) fn read_sheet_layout<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<SheetLayout, PersistenceError> {
    let xml = read_part(archive, path)?
        .ok_or_else(|| PersistenceError::InvalidFormat(format!("missing sheet part {}", path)))?;
    let (sheet_dir, rels_path) = part_rels(path);
    let rels = match read_part(archive, &rels_path)? {
        Some(rels_xml) => parse_relationships(&rels_xml)?,
        None => Relationships::new(),
    };

    let mut layout = parse_sheet_layout(&xml, &rels)?;

    let comments_path = rels
        .values()
        .find(|rel| rel.rel_type.ends_with(COMMENTS_REL_SUFFIX))
        .map(|rel| resolve_target(sheet_dir, &rel.target));
    if let Some(comments_path) = comments_path {
        if let Some(comments_xml) = read_part(archive, &comments_path)? {
            layout.notes = parse_comments(&comments_xml)?;
        }
    }
    Ok(layout)
}

/// `rels` resolves the `r:id` of external hyperlinks.
pub(crate) fn parse_sheet_layout(
    xml: &str,
    rels: &Relationships,
) -> Result<SheetLayout, PersistenceError> {
    let mut layout = SheetLayout::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    // Rows and cells may omit their `r` attribute; positions then follow on
    // from the previous element.
    let mut next_row: u32 = 0;
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"col" => {
                    let min = attr(&e, b"min").and_then(|v| v.parse::<u32>().ok());
                    let max = attr(&e, b"max").and_then(|v| v.parse::<u32>().ok());
                    let width = attr(&e, b"width").and_then(|v| v.parse::<f64>().ok());
                    if let (Some(min), Some(width)) = (min, width) {
                        // `min`/`max` are 1-based
                        let first = min.max(1) - 1;
                        let last = max.unwrap_or(min).max(1).min(MAX_COL + 1) - 1;
                        if first <= last {
                            layout.column_widths.push(ColumnSpan::new(first, last, width));
                        }
                    }
                }
                b"row" => {
                    current_row = attr(&e, b"r")
                        .and_then(|v| v.parse::<u32>().ok())
                        .map_or(next_row, |r| r.saturating_sub(1));
                    next_row = current_row + 1;
                    next_col = 0;
                    if let Some(height) = attr(&e, b"ht").and_then(|v| v.parse::<f64>().ok()) {
                        layout.row_heights.insert(current_row, height);
                    }
                }
                b"c" => {
                    let (row, col) = attr(&e, b"r")
                        .and_then(|r| parse_a1(&r))
                        .unwrap_or((current_row, next_col));
                    next_col = col + 1;
                    let style = attr(&e, b"s")
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if style != 0 {
                        layout.cell_styles.insert((row, col), style);
                    }
                }
                b"hyperlink" => {
                    if let Some(link) = parse_hyperlink(&e, rels) {
                        layout.hyperlinks.push(link);
                    }
                }
                b"mergeCell" => {
                    if let Some(region) = attr(&e, b"ref").and_then(|r| MergedRegion::from_a1(&r)) {
                        if !region.is_single_cell() {
                            layout.merged_regions.push(region);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(layout)
}

/// A `<hyperlink>` of a worksheet. Range references attach to their top-left cell.
fn parse_hyperlink(e: &BytesStart, rels: &Relationships) -> Option<Hyperlink> {
    let reference = attr(e, b"ref")?;
    let anchor = reference.split(':').next().unwrap_or_default();
    let (row, col) = parse_a1(anchor)?;
    let location = attr(e, b"location");

    // r:id, matched by local name
    let target = match (attr(e, b"id").and_then(|id| rels.get(&id)), location) {
        (Some(rel), Some(location)) => LinkTarget::External(format!("{}#{}", rel.target, location)),
        (Some(rel), None) => LinkTarget::External(rel.target.clone()),
        (None, Some(location)) => LinkTarget::Location(location),
        (None, None) => return None,
    };

    Some(Hyperlink {
        row,
        col,
        target,
        tooltip: attr(e, b"tooltip"),
    })
}

/// Reads the legacy notes of a comments part. Rich text runs are joined;
/// phonetic runs are skipped.
pub(crate) fn parse_comments(xml: &str) -> Result<Vec<Note>, PersistenceError> {
    let mut authors: Vec<String> = Vec::new();
    let mut notes = Vec::new();

    let mut reader = Reader::from_str(xml);
    // Text runs keep their own spacing
    reader.trim_text(false);

    let mut in_author = false;
    let mut in_text = false;
    let mut in_phonetic = false;
    let mut buffer = String::new();
    let mut current: Option<(u32, u32, Option<usize>)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"author" => {
                    in_author = true;
                    buffer.clear();
                }
                b"comment" => {
                    current = attr(&e, b"ref").and_then(|r| parse_a1(&r)).map(|(row, col)| {
                        let author = attr(&e, b"authorId").and_then(|v| v.parse().ok());
                        (row, col, author)
                    });
                    buffer.clear();
                }
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Text(t) => {
                if in_author || (in_text && !in_phonetic && current.is_some()) {
                    let raw = std::str::from_utf8(&t).map_err(|e| {
                        PersistenceError::InvalidFormat(format!("comment text: {}", e))
                    })?;
                    let text = unescape(raw).map_err(|e| {
                        PersistenceError::InvalidFormat(format!("comment text: {}", e))
                    })?;
                    buffer.push_str(&text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"author" => {
                    in_author = false;
                    authors.push(std::mem::take(&mut buffer));
                }
                b"comment" => {
                    if let Some((row, col, author)) = current.take() {
                        notes.push(Note {
                            row,
                            col,
                            author: author
                                .and_then(|i| authors.get(i))
                                .filter(|a| !a.is_empty())
                                .cloned(),
                            text: std::mem::take(&mut buffer),
                        });
                    }
                }
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"author" => authors.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relationship_targets() {
        assert_eq!(resolve_target("xl", "worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("xl/worksheets", "../comments1.xml"), "xl/comments1.xml");
        assert_eq!(
            part_rels("xl/worksheets/sheet1.xml"),
            ("xl/worksheets", "xl/worksheets/_rels/sheet1.xml.rels".to_string())
        );
    }

    #[test]
    fn reads_sheet_dimensions_styles_and_merges() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <cols>
    <col min="2" max="3" width="20.5" customWidth="1"/>
    <col min="5" max="16384" width="12" customWidth="1"/>
  </cols>
  <sheetData>
    <row r="1" ht="30" customHeight="1">
      <c r="A1" s="2" t="s"><v>0</v></c>
      <c r="B1"><v>1</v></c>
    </row>
    <row>
      <c s="4"><v>2</v></c>
      <c s="5"/>
    </row>
  </sheetData>
  <mergeCells count="2"><mergeCell ref="A1:B1"/><mergeCell ref="C5"/></mergeCells>
</worksheet>"#;
        let layout = parse_sheet_layout(xml, &Relationships::new()).unwrap();

        assert_eq!(
            layout.column_widths,
            vec![ColumnSpan::new(1, 2, 20.5), ColumnSpan::new(4, MAX_COL, 12.0)]
        );
        assert_eq!(layout.row_heights.get(&0), Some(&30.0));
        assert_eq!(layout.cell_styles.get(&(0, 0)), Some(&2));
        assert_eq!(layout.cell_styles.get(&(0, 1)), None);
        assert_eq!(layout.cell_styles.get(&(1, 0)), Some(&4));
        assert_eq!(layout.cell_styles.get(&(1, 1)), Some(&5));
        assert_eq!(layout.merged_regions, vec![MergedRegion::new((0, 0), (0, 1))]);
    }

    #[test]
    fn reads_hyperlinks_through_sheet_relationships() {
        let rels = parse_relationships(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/q?a=1&amp;b=2" TargetMode="External"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments1.xml"/>
</Relationships>"#,
        )
        .unwrap();
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
  xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheetData/>
  <hyperlinks>
    <hyperlink ref="B2" r:id="rId1" tooltip="Report"/>
    <hyperlink ref="C3:D4" location="'Summary'!A1"/>
    <hyperlink ref="E5" r:id="rId9"/>
  </hyperlinks>
</worksheet>"#;
        let layout = parse_sheet_layout(xml, &rels).unwrap();

        assert_eq!(
            layout.hyperlinks,
            vec![
                Hyperlink::new_url(1, 1, "https://example.com/q?a=1&b=2").with_tooltip("Report"),
                Hyperlink::new_location(2, 2, "'Summary'!A1"),
            ]
        );
    }

    #[test]
    fn reads_notes_with_authors_and_runs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <authors><author>Ana</author><author/></authors>
  <commentList>
    <comment ref="A1" authorId="0"><text><r><rPr><b/></rPr><t>Ana:</t></r><r><t xml:space="preserve"> check &amp; sign</t></r></text></comment>
    <comment ref="C4" authorId="1"><text><t>Plain</t><rPh sb="0" eb="1"><t>ignored</t></rPh></text></comment>
  </commentList>
</comments>"#;
        let notes = parse_comments(xml).unwrap();

        assert_eq!(
            notes,
            vec![
                Note::new(0, 0, "Ana: check & sign").with_author("Ana"),
                Note::new(3, 2, "Plain"),
            ]
        );
    }
}
