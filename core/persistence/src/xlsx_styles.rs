//! FILENAME: core/persistence/src/xlsx_styles.rs
//! PURPOSE: Parses the workbook style part (xl/styles.xml) into style descriptors.
//! CONTEXT: calamine exposes values and formulas but no formatting, so the
//! style table is read directly from the package. Each entry of `cellXfs`
//! becomes one `CellStyle`; entries that reference missing fonts/fills/borders
//! or use fills we cannot express come back as `None`.

use crate::PersistenceError;
use engine::style::{
    Alignment, BorderLineStyle, BorderStyle, Borders, CellStyle, Color, ColorRef, FillPattern,
    FillStyle, FontScript, FontSize, FontStyle, Protection, TextAlign, TextRotation, Underline,
    VerticalAlign,
};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
    Other,
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// One `<xf>` record before its ids are resolved.
#[derive(Debug, Clone, Default)]
struct RawXf {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Alignment,
    protection: Protection,
}

/// Reads an attribute by local name and unescapes it. Package parts are
/// UTF-8, so the raw bytes are decoded directly.
pub(crate) fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    let attribute = e
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)?;
    let raw = std::str::from_utf8(&attribute.value).ok()?;
    unescape(raw).ok().map(|v| v.into_owned())
}

fn flag(value: &str) -> bool {
    matches!(value, "1" | "true")
}

/// Boolean child elements like `<b/>` are true unless `val` says otherwise.
fn toggle(e: &BytesStart) -> bool {
    attr(e, b"val").map_or(true, |v| flag(&v))
}

fn parse_color(e: &BytesStart) -> ColorRef {
    if let Some(rgb) = attr(e, b"rgb").and_then(|v| Color::from_argb_hex(&v)) {
        return ColorRef::Rgb(rgb);
    }
    if let Some(index) = attr(e, b"theme").and_then(|v| v.parse::<u8>().ok()) {
        let tint = attr(e, b"tint")
            .and_then(|v| v.parse::<f64>().ok())
            .map_or(0, |t| (t * 1000.0).round() as i16);
        return ColorRef::Theme { index, tint };
    }
    if let Some(index) = attr(e, b"indexed").and_then(|v| v.parse::<u8>().ok()) {
        return ColorRef::Indexed(index);
    }
    ColorRef::Auto
}

fn parse_alignment(e: &BytesStart) -> Alignment {
    let horizontal = match attr(e, b"horizontal").as_deref() {
        Some("left") => TextAlign::Left,
        Some("center") => TextAlign::Center,
        Some("right") => TextAlign::Right,
        Some("fill") => TextAlign::Fill,
        Some("justify") => TextAlign::Justify,
        Some("centerContinuous") => TextAlign::CenterContinuous,
        Some("distributed") => TextAlign::Distributed,
        _ => TextAlign::General,
    };
    let vertical = match attr(e, b"vertical").as_deref() {
        Some("top") => VerticalAlign::Top,
        Some("center") => VerticalAlign::Center,
        Some("justify") => VerticalAlign::Justify,
        Some("distributed") => VerticalAlign::Distributed,
        _ => VerticalAlign::Bottom,
    };
    Alignment {
        horizontal,
        vertical,
        wrap_text: attr(e, b"wrapText").map_or(false, |v| flag(&v)),
        shrink_to_fit: attr(e, b"shrinkToFit").map_or(false, |v| flag(&v)),
        rotation: attr(e, b"textRotation")
            .and_then(|v| v.parse::<u16>().ok())
            .map_or(TextRotation::None, TextRotation::from_ooxml),
        indent: attr(e, b"indent").and_then(|v| v.parse().ok()).unwrap_or(0),
    }
}

fn parse_xf(e: &BytesStart) -> RawXf {
    let id = |key: &[u8]| attr(e, key).and_then(|v| v.parse::<usize>().ok()).unwrap_or(0);
    RawXf {
        num_fmt_id: id(b"numFmtId") as u32,
        font_id: id(b"fontId"),
        fill_id: id(b"fillId"),
        border_id: id(b"borderId"),
        ..RawXf::default()
    }
}

/// Format codes for the built-in number format ids that files reference
/// without declaring them in `<numFmts>`.
pub(crate) fn builtin_format_code(id: u32) -> Option<&'static str> {
    Some(match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        5 => "$#,##0_);($#,##0)",
        6 => "$#,##0_);[Red]($#,##0)",
        7 => "$#,##0.00_);($#,##0.00)",
        8 => "$#,##0.00_);[Red]($#,##0.00)",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "m/d/yyyy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yyyy h:mm",
        37 => "#,##0_);(#,##0)",
        38 => "#,##0_);[Red](#,##0)",
        39 => "#,##0.00_);(#,##0.00)",
        40 => "#,##0.00_);[Red](#,##0.00)",
        41 => r#"_(* #,##0_);_(* \(#,##0\);_(* "-"_);_(@_)"#,
        42 => r#"_("$"* #,##0_);_("$"* \(#,##0\);_("$"* "-"_);_(@_)"#,
        43 => r#"_(* #,##0.00_);_(* \(#,##0.00\);_(* "-"??_);_(@_)"#,
        44 => r#"_("$"* #,##0.00_);_("$"* \(#,##0.00\);_("$"* "-"??_);_(@_)"#,
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mm:ss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    })
}

/// Parse `xl/styles.xml` into one entry per `cellXfs` record.
pub(crate) fn parse_styles(xml: &str) -> Result<Vec<Option<CellStyle>>, PersistenceError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut section = Section::None;
    // Element depth of the open section, so unknown nested tags cannot end it.
    let mut depth: usize = 0;
    let mut section_depth: usize = 0;
    let mut num_fmts: HashMap<u32, String> = HashMap::new();
    let mut fonts: Vec<FontStyle> = Vec::new();
    // None marks a fill we cannot express (gradients).
    let mut fills: Vec<Option<FillStyle>> = Vec::new();
    let mut borders: Vec<Borders> = Vec::new();
    let mut xfs: Vec<RawXf> = Vec::new();

    let mut font: Option<FontStyle> = None;
    let mut fill: Option<Option<FillStyle>> = None;
    let mut border: Option<Borders> = None;
    let mut edge: Option<Edge> = None;
    let mut xf: Option<RawXf> = None;

    loop {
        let event = reader.read_event()?;
        let (e, is_empty) = match &event {
            Event::Start(e) => {
                depth += 1;
                (e, false)
            }
            Event::Empty(e) => (e, true),
            Event::End(end) => {
                if section != Section::None && depth == section_depth {
                    section = Section::None;
                }
                depth = depth.saturating_sub(1);
                match end.local_name().as_ref() {
                    b"font" if section == Section::Fonts => {
                        fonts.extend(font.take());
                    }
                    b"fill" if section == Section::Fills => {
                        fills.extend(fill.take());
                    }
                    b"border" if section == Section::Borders => {
                        borders.extend(border.take());
                    }
                    b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end" | b"diagonal" => {
                        edge = None
                    }
                    b"xf" if section == Section::CellXfs => {
                        xfs.extend(xf.take());
                    }
                    _ => {}
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let name = e.local_name();
        let name = name.as_ref();
        match section {
            Section::None => {
                section = match name {
                    b"numFmts" => Section::NumFmts,
                    b"fonts" => Section::Fonts,
                    b"fills" => Section::Fills,
                    b"borders" => Section::Borders,
                    b"cellXfs" => Section::CellXfs,
                    b"styleSheet" => Section::None,
                    _ => Section::Other,
                };
                if is_empty {
                    section = Section::None;
                }
                section_depth = depth;
            }
            Section::NumFmts => {
                if name == b"numFmt" {
                    let id = attr(e, b"numFmtId").and_then(|v| v.parse::<u32>().ok());
                    if let (Some(id), Some(code)) = (id, attr(e, b"formatCode")) {
                        num_fmts.insert(id, code);
                    }
                }
            }
            Section::Fonts => match name {
                b"font" if is_empty => fonts.push(FontStyle::default()),
                b"font" => font = Some(FontStyle::default()),
                _ => {
                    if let Some(f) = font.as_mut() {
                        match name {
                            b"b" => f.bold = toggle(e),
                            b"i" => f.italic = toggle(e),
                            b"strike" => f.strikethrough = toggle(e),
                            b"u" => {
                                f.underline = match attr(e, b"val").as_deref() {
                                    Some("double") => Underline::Double,
                                    Some("singleAccounting") => Underline::SingleAccounting,
                                    Some("doubleAccounting") => Underline::DoubleAccounting,
                                    Some("none") => Underline::None,
                                    _ => Underline::Single,
                                }
                            }
                            b"vertAlign" => {
                                f.script = match attr(e, b"val").as_deref() {
                                    Some("superscript") => FontScript::Superscript,
                                    Some("subscript") => FontScript::Subscript,
                                    _ => FontScript::Baseline,
                                }
                            }
                            b"sz" => {
                                if let Some(size) = attr(e, b"val").and_then(|v| v.parse::<f64>().ok()) {
                                    f.size = FontSize::from_points(size);
                                }
                            }
                            b"name" | b"rFont" => {
                                if let Some(font_name) = attr(e, b"val") {
                                    f.name = font_name;
                                }
                            }
                            b"color" => f.color = parse_color(e),
                            _ => {}
                        }
                    }
                }
            },
            Section::Fills => match name {
                b"fill" if is_empty => fills.push(Some(FillStyle::default())),
                b"fill" => fill = Some(Some(FillStyle::default())),
                b"gradientFill" => fill = Some(None),
                b"patternFill" => {
                    if let Some(Some(f)) = fill.as_mut() {
                        f.pattern = attr(e, b"patternType")
                            .and_then(|p| FillPattern::from_ooxml(&p))
                            .unwrap_or(FillPattern::None);
                    }
                }
                b"fgColor" | b"bgColor" => {
                    if let Some(Some(f)) = fill.as_mut() {
                        let color = parse_color(e);
                        if name == b"fgColor" {
                            f.foreground = color;
                        } else {
                            f.background = color;
                        }
                    }
                }
                _ => {}
            },
            Section::Borders => match name {
                b"border" if is_empty => borders.push(Borders::default()),
                b"border" => border = Some(Borders::default()),
                b"left" | b"start" | b"right" | b"end" | b"top" | b"bottom" => {
                    let which = match name {
                        b"left" | b"start" => Edge::Left,
                        b"right" | b"end" => Edge::Right,
                        b"top" => Edge::Top,
                        _ => Edge::Bottom,
                    };
                    let style = attr(e, b"style")
                        .and_then(|s| BorderLineStyle::from_ooxml(&s))
                        .unwrap_or(BorderLineStyle::None);
                    if let Some(b) = border.as_mut() {
                        edge_mut(b, which).style = style;
                    }
                    edge = if is_empty { None } else { Some(which) };
                }
                b"color" => {
                    if let (Some(b), Some(which)) = (border.as_mut(), edge) {
                        edge_mut(b, which).color = parse_color(e);
                    }
                }
                _ => {}
            },
            Section::CellXfs => match name {
                b"xf" if is_empty => xfs.push(parse_xf(e)),
                b"xf" => xf = Some(parse_xf(e)),
                b"alignment" => {
                    if let Some(x) = xf.as_mut() {
                        x.alignment = parse_alignment(e);
                    }
                }
                b"protection" => {
                    if let Some(x) = xf.as_mut() {
                        x.protection = Protection {
                            locked: attr(e, b"locked").map_or(true, |v| flag(&v)),
                            hidden: attr(e, b"hidden").map_or(false, |v| flag(&v)),
                        };
                    }
                }
                _ => {}
            },
            Section::Other => {}
        }
    }

    Ok(xfs
        .into_iter()
        .map(|raw| {
            let number_format = num_fmts
                .get(&raw.num_fmt_id)
                .cloned()
                .or_else(|| builtin_format_code(raw.num_fmt_id).map(str::to_string))
                .unwrap_or_else(|| "General".to_string());
            Some(CellStyle {
                font: fonts.get(raw.font_id)?.clone(),
                fill: (*fills.get(raw.fill_id)?)?,
                borders: *borders.get(raw.border_id)?,
                number_format,
                alignment: raw.alignment,
                protection: raw.protection,
            })
        })
        .collect())
}

fn edge_mut(borders: &mut Borders, edge: Edge) -> &mut BorderStyle {
    match edge {
        Edge::Top => &mut borders.top,
        Edge::Right => &mut borders.right,
        Edge::Bottom => &mut borders.bottom,
        Edge::Left => &mut borders.left,
    }
}
