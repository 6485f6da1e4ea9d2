//! FILENAME: core/engine/src/style.rs
//! PURPOSE: Defines the style descriptor and the registry used to deduplicate it.
//! CONTEXT: This file implements the Flyweight Pattern for style storage.
//! Cells store a style_index (usize) into their sheet's `StyleTable`. The
//! `StyleRegistry` guarantees that structurally identical descriptors resolve to
//! a single table entry, no matter which source workbook they came from.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// COLORS
// ============================================================================

/// RGB color representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8, // Alpha channel (255 = opaque)
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub const fn black() -> Self {
        Color::new(0, 0, 0)
    }

    /// Parse an OOXML `rgb` attribute: "AARRGGBB" or "RRGGBB".
    pub fn from_argb_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Color::new(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Color::with_alpha(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
            _ => None,
        }
    }

    /// Packed 0xRRGGBB value.
    pub fn to_rgb_u32(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::black()
    }
}

/// A color reference as stored in a workbook's style part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ColorRef {
    /// Application default ("automatic").
    #[default]
    Auto,
    Rgb(Color),
    /// Theme palette slot with a tint in thousandths (-1000..=1000).
    Theme { index: u8, tint: i16 },
    /// Legacy indexed palette entry.
    Indexed(u8),
}

// ============================================================================
// FONT
// ============================================================================

/// Font size in hundredths of a point. Fixed-point keeps descriptors hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontSize(pub u32);

impl FontSize {
    pub fn from_points(points: f64) -> Self {
        FontSize((points * 100.0).round().max(0.0) as u32)
    }

    pub fn points(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for FontSize {
    fn default() -> Self {
        FontSize(1100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FontScript {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

/// Font style configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontStyle {
    pub name: String,
    pub size: FontSize,
    pub bold: bool,
    pub italic: bool,
    pub underline: Underline,
    pub strikethrough: bool,
    pub script: FontScript,
    pub color: ColorRef,
}

impl Default for FontStyle {
    fn default() -> Self {
        FontStyle {
            name: "Calibri".to_string(),
            size: FontSize::default(),
            bold: false,
            italic: false,
            underline: Underline::None,
            strikethrough: false,
            script: FontScript::Baseline,
            color: ColorRef::Auto,
        }
    }
}

// ============================================================================
// FILL
// ============================================================================

/// Pattern fill types supported by the container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FillPattern {
    #[default]
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

impl FillPattern {
    pub fn from_ooxml(name: &str) -> Option<Self> {
        Some(match name {
            "none" => FillPattern::None,
            "solid" => FillPattern::Solid,
            "mediumGray" => FillPattern::MediumGray,
            "darkGray" => FillPattern::DarkGray,
            "lightGray" => FillPattern::LightGray,
            "darkHorizontal" => FillPattern::DarkHorizontal,
            "darkVertical" => FillPattern::DarkVertical,
            "darkDown" => FillPattern::DarkDown,
            "darkUp" => FillPattern::DarkUp,
            "darkGrid" => FillPattern::DarkGrid,
            "darkTrellis" => FillPattern::DarkTrellis,
            "lightHorizontal" => FillPattern::LightHorizontal,
            "lightVertical" => FillPattern::LightVertical,
            "lightDown" => FillPattern::LightDown,
            "lightUp" => FillPattern::LightUp,
            "lightGrid" => FillPattern::LightGrid,
            "lightTrellis" => FillPattern::LightTrellis,
            "gray125" => FillPattern::Gray125,
            "gray0625" => FillPattern::Gray0625,
            _ => return None,
        })
    }
}

/// Cell background fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct FillStyle {
    pub pattern: FillPattern,
    /// Pattern color; for `Solid` this is the visible cell color.
    pub foreground: ColorRef,
    pub background: ColorRef,
}

impl FillStyle {
    pub fn solid(color: Color) -> Self {
        FillStyle {
            pattern: FillPattern::Solid,
            foreground: ColorRef::Rgb(color),
            background: ColorRef::Auto,
        }
    }
}

// ============================================================================
// BORDERS
// ============================================================================

/// Line style for borders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BorderLineStyle {
    #[default]
    None,
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderLineStyle {
    pub fn from_ooxml(name: &str) -> Option<Self> {
        Some(match name {
            "none" => BorderLineStyle::None,
            "thin" => BorderLineStyle::Thin,
            "medium" => BorderLineStyle::Medium,
            "dashed" => BorderLineStyle::Dashed,
            "dotted" => BorderLineStyle::Dotted,
            "thick" => BorderLineStyle::Thick,
            "double" => BorderLineStyle::Double,
            "hair" => BorderLineStyle::Hair,
            "mediumDashed" => BorderLineStyle::MediumDashed,
            "dashDot" => BorderLineStyle::DashDot,
            "mediumDashDot" => BorderLineStyle::MediumDashDot,
            "dashDotDot" => BorderLineStyle::DashDotDot,
            "mediumDashDotDot" => BorderLineStyle::MediumDashDotDot,
            "slantDashDot" => BorderLineStyle::SlantDashDot,
            _ => return None,
        })
    }
}

/// Border style for a single edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BorderStyle {
    pub style: BorderLineStyle,
    pub color: ColorRef,
}

impl BorderStyle {
    pub fn thin() -> Self {
        BorderStyle {
            style: BorderLineStyle::Thin,
            color: ColorRef::Auto,
        }
    }
}

/// Complete border configuration for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Borders {
    pub top: BorderStyle,
    pub right: BorderStyle,
    pub bottom: BorderStyle,
    pub left: BorderStyle,
}

impl Borders {
    pub fn all(edge: BorderStyle) -> Self {
        Borders {
            top: edge,
            right: edge,
            bottom: edge,
            left: edge,
        }
    }
}

// ============================================================================
// ALIGNMENT & PROTECTION
// ============================================================================

/// Horizontal alignment options for cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TextAlign {
    #[default]
    General, // Auto: numbers right, text left
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

/// Vertical alignment options for cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VerticalAlign {
    Top,
    Center,
    #[default]
    Bottom,
    Justify,
    Distributed,
}

/// Text rotation for cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TextRotation {
    #[default]
    None,
    /// Degrees counter-clockwise from horizontal, -90..=90.
    Degrees(i16),
    /// Letters stacked vertically.
    Stacked,
}

impl TextRotation {
    /// Decode the OOXML `textRotation` attribute (0-90 up, 91-180 down, 255 stacked).
    pub fn from_ooxml(value: u16) -> Self {
        match value {
            0 => TextRotation::None,
            1..=90 => TextRotation::Degrees(value as i16),
            91..=180 => TextRotation::Degrees(90 - value as i16),
            _ => TextRotation::Stacked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Alignment {
    pub horizontal: TextAlign,
    pub vertical: VerticalAlign,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub rotation: TextRotation,
    pub indent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Protection {
            locked: true,
            hidden: false,
        }
    }
}

// ============================================================================
// CELL STYLE (the style descriptor)
// ============================================================================

/// Complete cell style definition.
/// Two descriptors with equal fields are the same style regardless of origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellStyle {
    pub font: FontStyle,
    pub fill: FillStyle,
    pub borders: Borders,
    /// Number format code, e.g. "General", "0.00", "yyyy-mm-dd".
    pub number_format: String,
    pub alignment: Alignment,
    pub protection: Protection,
}

impl CellStyle {
    /// Create a new default style.
    pub fn new() -> Self {
        CellStyle {
            font: FontStyle::default(),
            fill: FillStyle::default(),
            borders: Borders::default(),
            number_format: "General".to_string(),
            alignment: Alignment::default(),
            protection: Protection::default(),
        }
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.font.italic = italic;
        self
    }

    pub fn with_font(mut self, name: &str, points: f64) -> Self {
        self.font.name = name.to_string();
        self.font.size = FontSize::from_points(points);
        self
    }

    pub fn with_fill(mut self, fill: FillStyle) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_borders(mut self, borders: Borders) -> Self {
        self.borders = borders;
        self
    }

    pub fn with_number_format(mut self, format: &str) -> Self {
        self.number_format = format.to_string();
        self
    }

    pub fn with_text_align(mut self, align: TextAlign) -> Self {
        self.alignment.horizontal = align;
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.protection.locked = locked;
        self
    }

    /// True when the number format renders serial numbers as dates or times.
    pub fn is_date_format(&self) -> bool {
        is_date_format_code(&self.number_format)
    }
}

impl Default for CellStyle {
    fn default() -> Self {
        CellStyle::new()
    }
}

/// Heuristic date detection on a number format code: any d/m/y/h/s token
/// outside quoted literals, escapes and bracketed sections (colors, locales).
pub fn is_date_format_code(code: &str) -> bool {
    if code.eq_ignore_ascii_case("General") {
        return false;
    }
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    for ch in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S'
                if !in_quotes && !in_brackets =>
            {
                return true
            }
            _ => {}
        }
    }
    false
}

// ============================================================================
// STYLE TABLE & REGISTRY
// ============================================================================

/// A worksheet's list of styles. Index 0 is always the default style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleTable {
    styles: Vec<CellStyle>,
}

impl StyleTable {
    /// Create a table holding only the default style.
    pub fn new() -> Self {
        StyleTable {
            styles: vec![CellStyle::new()],
        }
    }

    /// Build a table from a complete style list, e.g. a workbook's cellXfs.
    /// An empty list falls back to the default style at index 0.
    pub fn from_styles(styles: Vec<CellStyle>) -> Self {
        if styles.is_empty() {
            return StyleTable::new();
        }
        StyleTable { styles }
    }

    /// Append a style without looking for an equal entry.
    pub fn push(&mut self, style: CellStyle) -> usize {
        self.styles.push(style);
        self.styles.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&CellStyle> {
        self.styles.get(index)
    }

    pub fn default_style(&self) -> &CellStyle {
        &self.styles[0]
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// True when the table only contains the default style.
    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    pub fn all_styles(&self) -> &[CellStyle] {
        &self.styles
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        StyleTable::new()
    }
}

/// The StyleRegistry implements the Flyweight Pattern over an output table.
/// Each distinct descriptor is appended to the table once; later lookups
/// return the existing index.
#[derive(Debug, Clone, Default)]
pub struct StyleRegistry {
    /// Reverse lookup: descriptor -> index in the output table.
    style_to_index: HashMap<CellStyle, usize>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        StyleRegistry {
            style_to_index: HashMap::new(),
        }
    }

    /// A registry for a fresh `StyleTable`: descriptors equal to the default
    /// style resolve to index 0 instead of gaining a duplicate entry.
    pub fn with_default() -> Self {
        let mut style_to_index = HashMap::new();
        style_to_index.insert(CellStyle::default(), 0);
        StyleRegistry { style_to_index }
    }

    /// Get or create the table index for the given style.
    pub fn intern(&mut self, style: &CellStyle, table: &mut StyleTable) -> usize {
        if let Some(&index) = self.style_to_index.get(style) {
            return index;
        }

        let index = table.push(style.clone());
        self.style_to_index.insert(style.clone(), index);
        index
    }

    /// Number of distinct descriptors known, including a seeded default.
    pub fn len(&self) -> usize {
        self.style_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.style_to_index.is_empty()
    }
}
