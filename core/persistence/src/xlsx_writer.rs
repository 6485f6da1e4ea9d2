//! FILENAME: core/persistence/src/xlsx_writer.rs
//! PURPOSE: Saves worksheets to XLSX through rust_xlsxwriter.
//! CONTEXT: Each distinct style table entry is converted to one `Format` up
//! front and shared by every cell that references it. Merged ranges are
//! declared before cells are written so the anchor's value wins. Hyperlinks
//! go in after the cells they decorate.

use crate::{PersistenceError, Sheet, Workbook};
use engine::annotation::{Hyperlink, LinkTarget};
use engine::cell::{CellContent, CellValue};
use engine::style::{
    BorderLineStyle, CellStyle, ColorRef, FillPattern, FontScript, TextAlign, TextRotation,
    Underline, VerticalAlign,
};
use log::warn;
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatPattern, FormatScript, FormatUnderline,
    Formula, Note as XlsxNote, Url, Workbook as XlsxWorkbook, Worksheet,
};
use std::path::Path;

/// Number format applied to date values whose style does not carry one.
pub const FALLBACK_DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Container column widths include about five pixels of padding on top of
/// the character width that `set_column_width` expects.
const COLUMN_PADDING: f64 = 5.0 / 7.0;

/// Link prefixes the writer accepts as they are.
const URL_SCHEMES: [&str; 6] = ["http://", "https://", "ftp://", "ftps://", "mailto:", "file://"];

pub fn save_xlsx(workbook: &Workbook, path: &Path) -> Result<(), PersistenceError> {
    let mut xlsx = XlsxWorkbook::new();

    for (index, sheet) in workbook.sheets.iter().enumerate() {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        if index == workbook.active_sheet {
            worksheet.set_active(true);
        }
        write_sheet(worksheet, sheet)?;
    }

    xlsx.save(path)?;
    Ok(())
}

fn col16(col: u32) -> Result<u16, PersistenceError> {
    u16::try_from(col)
        .map_err(|_| PersistenceError::InvalidFormat(format!("column {} out of range", col)))
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), PersistenceError> {
    // Column widths
    for span in &sheet.column_widths {
        let width = span.width;
        let chars = if width > 1.0 + COLUMN_PADDING {
            width - COLUMN_PADDING + 0.001
        } else {
            width
        };
        worksheet.set_column_range_width(col16(span.first)?, col16(span.last)?, chars)?;
    }

    // Row heights (points)
    for (&row, &height) in &sheet.row_heights {
        worksheet.set_row_height(row, height)?;
    }

    let default_format = Format::new();
    let formats: Vec<Option<Format>> = sheet
        .styles
        .all_styles()
        .iter()
        .map(|style| {
            if *style == CellStyle::default() {
                None
            } else {
                Some(convert_style_to_format(style))
            }
        })
        .collect();
    let format_for = |index: usize| pick_format(&formats, &default_format, index);

    for region in &sheet.merged_regions {
        let style_index = sheet
            .grid
            .get_cell(region.start_row, region.start_col)
            .map_or(0, |c| c.style_index);
        let result = worksheet.merge_range(
            region.start_row,
            col16(region.start_col)?,
            region.end_row,
            col16(region.end_col)?,
            "",
            format_for(style_index),
        );
        if let Err(e) = result {
            warn!("Skipping merged range {}: {}", region.to_a1(), e);
        }
    }

    let date_format = Format::new().set_num_format(FALLBACK_DATE_FORMAT);

    for (row, col, cell) in sheet.grid.iter() {
        let col = col16(col)?;
        let styled = formats
            .get(cell.style_index)
            .map_or(false, |f| f.as_ref().is_some());
        let format = format_for(cell.style_index);

        match &cell.content {
            CellContent::Value(CellValue::Empty) => {
                if styled {
                    worksheet.write_blank(row, col, format)?;
                }
            }
            CellContent::Value(CellValue::Number(n)) => {
                worksheet.write_number_with_format(row, col, *n, format)?;
            }
            CellContent::Value(CellValue::DateTime(serial)) => {
                let has_date_format = sheet
                    .styles
                    .get(cell.style_index)
                    .map_or(false, |s| s.is_date_format());
                if has_date_format && styled {
                    worksheet.write_number_with_format(row, col, *serial, format)?;
                } else {
                    worksheet.write_number_with_format(row, col, *serial, &date_format)?;
                }
            }
            CellContent::Value(CellValue::Text(s)) => {
                worksheet.write_string_with_format(row, col, s, format)?;
            }
            CellContent::Value(CellValue::Boolean(b)) => {
                worksheet.write_boolean_with_format(row, col, *b, format)?;
            }
            CellContent::Value(CellValue::Error(e)) => {
                worksheet.write_string_with_format(row, col, e.as_literal(), format)?;
            }
            CellContent::Formula { text, cached } => {
                let mut formula = Formula::new(text.as_str());
                if let Some(value) = cached {
                    formula = formula.set_result(value.to_result_string());
                }
                worksheet.write_formula_with_format(row, col, formula, format)?;
            }
        }
    }

    for link in &sheet.hyperlinks {
        write_hyperlink(worksheet, sheet, link, &formats, &default_format)?;
    }

    for note in &sheet.notes {
        let mut xlsx_note = XlsxNote::new(&note.text).add_author_prefix(false);
        if let Some(author) = &note.author {
            xlsx_note = xlsx_note.set_author(author);
        }
        if let Err(e) = worksheet.insert_note(note.row, col16(note.col)?, &xlsx_note) {
            warn!("Skipping note at row {} col {}: {}", note.row, note.col, e);
        }
    }

    Ok(())
}

fn link_url(target: &LinkTarget) -> String {
    match target {
        LinkTarget::Location(location) => format!("internal:{}", location),
        LinkTarget::External(url) if URL_SCHEMES.iter().any(|s| url.starts_with(s)) => url.clone(),
        // Relative or local file targets
        LinkTarget::External(path) => format!("external:{}", path),
    }
}

/// The link replaces the cell's value with its display text, keeping the format.
fn write_hyperlink(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    link: &Hyperlink,
    formats: &[Option<Format>],
    default_format: &Format,
) -> Result<(), PersistenceError> {
    let col = col16(link.col)?;
    let cell = sheet.grid.get_cell(link.row, link.col);
    if cell.and_then(|c| c.formula()).is_some() {
        warn!(
            "Skipping hyperlink on formula cell at row {} col {}",
            link.row, link.col
        );
        return Ok(());
    }

    let mut url = Url::new(link_url(&link.target));
    if let Some(text) = cell.map(|c| c.display_value()).filter(|t| !t.is_empty()) {
        url = url.set_text(text);
    }
    if let Some(tip) = &link.tooltip {
        url = url.set_tip(tip);
    }

    let result = match cell {
        Some(cell) => {
            let format = pick_format(formats, default_format, cell.style_index);
            worksheet.write_url_with_format(link.row, col, url, format)
        }
        None => worksheet.write_url(link.row, col, url),
    };
    if let Err(e) = result {
        warn!("Skipping hyperlink at row {} col {}: {}", link.row, link.col, e);
    }
    Ok(())
}

fn pick_format<'a>(formats: &'a [Option<Format>], default: &'a Format, index: usize) -> &'a Format {
    formats
        .get(index)
        .and_then(|f| f.as_ref())
        .unwrap_or(default)
}

// ============================================================================
// STYLE CONVERSION
// ============================================================================

fn convert_style_to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();

    // Font
    format = format
        .set_font_name(&style.font.name)
        .set_font_size(style.font.size.points());
    if let Some(color) = convert_color(style.font.color) {
        format = format.set_font_color(color);
    }
    if style.font.bold {
        format = format.set_bold();
    }
    if style.font.italic {
        format = format.set_italic();
    }
    if style.font.strikethrough {
        format = format.set_font_strikethrough();
    }
    format = match style.font.underline {
        Underline::None => format,
        Underline::Single => format.set_underline(FormatUnderline::Single),
        Underline::Double => format.set_underline(FormatUnderline::Double),
        Underline::SingleAccounting => format.set_underline(FormatUnderline::SingleAccounting),
        Underline::DoubleAccounting => format.set_underline(FormatUnderline::DoubleAccounting),
    };
    format = match style.font.script {
        FontScript::Baseline => format,
        FontScript::Superscript => format.set_font_script(FormatScript::Superscript),
        FontScript::Subscript => format.set_font_script(FormatScript::Subscript),
    };

    // Fill
    let fill = &style.fill;
    match fill.pattern {
        FillPattern::None => {}
        FillPattern::Solid => {
            format = format.set_pattern(FormatPattern::Solid);
            // rust_xlsxwriter treats the background color as the solid cell color
            if let Some(color) = convert_color(fill.foreground) {
                format = format.set_background_color(color);
            }
        }
        pattern => {
            format = format.set_pattern(convert_pattern(pattern));
            if let Some(color) = convert_color(fill.foreground) {
                format = format.set_foreground_color(color);
            }
            if let Some(color) = convert_color(fill.background) {
                format = format.set_background_color(color);
            }
        }
    }

    // Borders
    let borders = &style.borders;
    if borders.top.style != BorderLineStyle::None {
        format = format.set_border_top(convert_border(borders.top.style));
        if let Some(color) = convert_color(borders.top.color) {
            format = format.set_border_top_color(color);
        }
    }
    if borders.right.style != BorderLineStyle::None {
        format = format.set_border_right(convert_border(borders.right.style));
        if let Some(color) = convert_color(borders.right.color) {
            format = format.set_border_right_color(color);
        }
    }
    if borders.bottom.style != BorderLineStyle::None {
        format = format.set_border_bottom(convert_border(borders.bottom.style));
        if let Some(color) = convert_color(borders.bottom.color) {
            format = format.set_border_bottom_color(color);
        }
    }
    if borders.left.style != BorderLineStyle::None {
        format = format.set_border_left(convert_border(borders.left.style));
        if let Some(color) = convert_color(borders.left.color) {
            format = format.set_border_left_color(color);
        }
    }

    // Alignment
    let alignment = &style.alignment;
    format = match alignment.horizontal {
        TextAlign::General => format,
        TextAlign::Left => format.set_align(FormatAlign::Left),
        TextAlign::Center => format.set_align(FormatAlign::Center),
        TextAlign::Right => format.set_align(FormatAlign::Right),
        TextAlign::Fill => format.set_align(FormatAlign::Fill),
        TextAlign::Justify => format.set_align(FormatAlign::Justify),
        TextAlign::CenterContinuous => format.set_align(FormatAlign::CenterAcross),
        TextAlign::Distributed => format.set_align(FormatAlign::Distributed),
    };
    format = match alignment.vertical {
        VerticalAlign::Bottom => format,
        VerticalAlign::Top => format.set_align(FormatAlign::Top),
        VerticalAlign::Center => format.set_align(FormatAlign::VerticalCenter),
        VerticalAlign::Justify => format.set_align(FormatAlign::VerticalJustify),
        VerticalAlign::Distributed => format.set_align(FormatAlign::VerticalDistributed),
    };
    if alignment.wrap_text {
        format = format.set_text_wrap();
    }
    if alignment.shrink_to_fit {
        format = format.set_shrink();
    }
    if alignment.indent > 0 {
        format = format.set_indent(alignment.indent);
    }
    format = match alignment.rotation {
        TextRotation::None => format,
        TextRotation::Degrees(degrees) => format.set_rotation(degrees),
        TextRotation::Stacked => format.set_rotation(270),
    };

    // Protection
    if !style.protection.locked {
        format = format.set_unlocked();
    }
    if style.protection.hidden {
        format = format.set_hidden();
    }

    if style.number_format != "General" {
        format = format.set_num_format(&style.number_format);
    }

    format
}

fn convert_pattern(pattern: FillPattern) -> FormatPattern {
    match pattern {
        FillPattern::None => FormatPattern::None,
        FillPattern::Solid => FormatPattern::Solid,
        FillPattern::MediumGray => FormatPattern::MediumGray,
        FillPattern::DarkGray => FormatPattern::DarkGray,
        FillPattern::LightGray => FormatPattern::LightGray,
        FillPattern::DarkHorizontal => FormatPattern::DarkHorizontal,
        FillPattern::DarkVertical => FormatPattern::DarkVertical,
        FillPattern::DarkDown => FormatPattern::DarkDown,
        FillPattern::DarkUp => FormatPattern::DarkUp,
        FillPattern::DarkGrid => FormatPattern::DarkGrid,
        FillPattern::DarkTrellis => FormatPattern::DarkTrellis,
        FillPattern::LightHorizontal => FormatPattern::LightHorizontal,
        FillPattern::LightVertical => FormatPattern::LightVertical,
        FillPattern::LightDown => FormatPattern::LightDown,
        FillPattern::LightUp => FormatPattern::LightUp,
        FillPattern::LightGrid => FormatPattern::LightGrid,
        FillPattern::LightTrellis => FormatPattern::LightTrellis,
        FillPattern::Gray125 => FormatPattern::Gray125,
        FillPattern::Gray0625 => FormatPattern::Gray0625,
    }
}

fn convert_border(style: BorderLineStyle) -> FormatBorder {
    match style {
        BorderLineStyle::None => FormatBorder::None,
        BorderLineStyle::Thin => FormatBorder::Thin,
        BorderLineStyle::Medium => FormatBorder::Medium,
        BorderLineStyle::Dashed => FormatBorder::Dashed,
        BorderLineStyle::Dotted => FormatBorder::Dotted,
        BorderLineStyle::Thick => FormatBorder::Thick,
        BorderLineStyle::Double => FormatBorder::Double,
        BorderLineStyle::Hair => FormatBorder::Hair,
        BorderLineStyle::MediumDashed => FormatBorder::MediumDashed,
        BorderLineStyle::DashDot => FormatBorder::DashDot,
        BorderLineStyle::MediumDashDot => FormatBorder::MediumDashDot,
        BorderLineStyle::DashDotDot => FormatBorder::DashDotDot,
        BorderLineStyle::MediumDashDotDot => FormatBorder::MediumDashDotDot,
        BorderLineStyle::SlantDashDot => FormatBorder::SlantDashDot,
    }
}

/// Legacy indexed palette (entries 0-63).
const INDEXED_PALETTE: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080,
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF,
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF,
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99,
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696,
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333,
];

/// None means "leave the application default".
fn convert_color(color: ColorRef) -> Option<Color> {
    match color {
        ColorRef::Auto => None,
        ColorRef::Rgb(c) => Some(Color::RGB(c.to_rgb_u32())),
        // Tints have no equivalent in the writer; the base theme slot is kept.
        ColorRef::Theme { index, .. } => Some(Color::Theme(index.min(9), 0)),
        ColorRef::Indexed(i) => INDEXED_PALETTE.get(i as usize).map(|&rgb| Color::RGB(rgb)),
    }
}
