//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: A cell holds either a static value or a formula (with the value the
//! source application last computed for it), plus an index into the owning
//! sheet's style table. Millions of these may be alive while a sheet is copied,
//! so the struct stays small.

use serde::{Deserialize, Serialize};

/// Error values a cell can hold (e.g., #DIV/0!).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellError {
    Div0,
    NA,
    Name,
    Null,
    Num,
    Ref,
    Value,
    GettingData,
}

impl CellError {
    /// The literal Excel displays for this error.
    pub fn as_literal(&self) -> &'static str {
        match self {
            CellError::Div0 => "#DIV/0!",
            CellError::NA => "#N/A",
            CellError::Name => "#NAME?",
            CellError::Null => "#NULL!",
            CellError::Num => "#NUM!",
            CellError::Ref => "#REF!",
            CellError::Value => "#VALUE!",
            CellError::GettingData => "#GETTING_DATA",
        }
    }
}

/// A typed scalar stored in a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Excel serial date (days since the 1900 epoch, fraction = time of day).
    DateTime(f64),
    Error(CellError),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text form used when a value has to be stored as a formula's cached result.
    pub fn to_result_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) | CellValue::DateTime(n) => format!("{}", n),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.as_literal().to_string(),
        }
    }
}

/// What a cell contains: a static value or a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellContent {
    Value(CellValue),
    Formula {
        /// Formula text including the leading '='.
        text: String,
        /// Result last computed by the application that saved the source.
        cached: Option<CellValue>,
    },
}

/// The atomic unit of the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub content: CellContent,
    pub style_index: usize,
}

impl Cell {
    pub fn new() -> Self {
        Cell {
            content: CellContent::Value(CellValue::Empty),
            style_index: 0,
        }
    }

    pub fn new_value(value: CellValue) -> Self {
        Cell {
            content: CellContent::Value(value),
            style_index: 0,
        }
    }

    pub fn new_number(num: f64) -> Self {
        Self::new_value(CellValue::Number(num))
    }

    pub fn new_text(text: String) -> Self {
        Self::new_value(CellValue::Text(text))
    }

    pub fn new_boolean(value: bool) -> Self {
        Self::new_value(CellValue::Boolean(value))
    }

    /// Create a formula cell. A missing '=' prefix is added.
    pub fn new_formula(formula: String, cached: Option<CellValue>) -> Self {
        let text = if formula.starts_with('=') {
            formula
        } else {
            format!("={}", formula)
        };
        Cell {
            content: CellContent::Formula { text, cached },
            style_index: 0,
        }
    }

    pub fn with_style(mut self, style_index: usize) -> Self {
        self.style_index = style_index;
        self
    }

    pub fn formula(&self) -> Option<&str> {
        match &self.content {
            CellContent::Formula { text, .. } => Some(text),
            CellContent::Value(_) => None,
        }
    }

    /// The value a reader of the saved file would see: the static value,
    /// or the cached result of a formula.
    pub fn value(&self) -> &CellValue {
        match &self.content {
            CellContent::Value(v) => v,
            CellContent::Formula { cached: Some(v), .. } => v,
            CellContent::Formula { cached: None, .. } => &CellValue::Empty,
        }
    }

    /// Returns the display value of the cell as a String.
    pub fn display_value(&self) -> String {
        match self.value() {
            CellValue::Empty => String::new(),
            CellValue::Number(n) | CellValue::DateTime(n) => {
                // Format without unnecessary decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.as_literal().to_string(),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_gets_equals_prefix() {
        let cell = Cell::new_formula("A1+B1".to_string(), None);
        assert_eq!(cell.formula(), Some("=A1+B1"));

        let cell = Cell::new_formula("=SUM(A1:A3)".to_string(), None);
        assert_eq!(cell.formula(), Some("=SUM(A1:A3)"));
    }

    #[test]
    fn formula_value_is_cached_result() {
        let cell = Cell::new_formula("=A1+B1".to_string(), Some(CellValue::Number(7.0)));
        assert_eq!(cell.value(), &CellValue::Number(7.0));
        assert_eq!(cell.display_value(), "7");

        let uncached = Cell::new_formula("=A1+B1".to_string(), None);
        assert!(uncached.value().is_empty());
    }

    #[test]
    fn result_strings() {
        assert_eq!(CellValue::Boolean(true).to_result_string(), "TRUE");
        assert_eq!(CellValue::Number(0.1).to_result_string(), "0.1");
        assert_eq!(CellValue::Error(CellError::NA).to_result_string(), "#N/A");
    }
}
