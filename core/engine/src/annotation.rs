//! FILENAME: core/engine/src/annotation.rs
//! PURPOSE: Cell-level attachments that live beside the grid: hyperlinks and notes.
//! CONTEXT: Both are keyed by a 0-based (row, col) and travel with their cell
//! when rows are copied into the combined sheet.

use serde::{Deserialize, Serialize};

// ============================================================================
// HYPERLINKS
// ============================================================================

/// Where a hyperlink points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkTarget {
    /// URL, e-mail or file target stored in the sheet relationships.
    External(String),
    /// A place in the same workbook, e.g. "Summary!B2".
    Location(String),
}

/// A hyperlink attached to a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hyperlink {
    pub row: u32,
    pub col: u32,
    pub target: LinkTarget,
    /// Screen tip shown on hover
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl Hyperlink {
    pub fn new_url(row: u32, col: u32, url: &str) -> Self {
        Hyperlink {
            row,
            col,
            target: LinkTarget::External(url.to_string()),
            tooltip: None,
        }
    }

    pub fn new_location(row: u32, col: u32, location: &str) -> Self {
        Hyperlink {
            row,
            col,
            target: LinkTarget::Location(location.to_string()),
            tooltip: None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = Some(tooltip.to_string());
        self
    }

    /// The same link attached to another cell.
    pub fn moved_to(&self, row: u32, col: u32) -> Self {
        Hyperlink {
            row,
            col,
            ..self.clone()
        }
    }
}

// ============================================================================
// NOTES
// ============================================================================

/// A legacy note (the yellow sticky note) attached to a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub row: u32,
    pub col: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Plain text content; rich text runs are flattened.
    pub text: String,
}

impl Note {
    pub fn new(row: u32, col: u32, text: &str) -> Self {
        Note {
            row,
            col,
            author: None,
            text: text.to_string(),
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn moved_to(&self, row: u32, col: u32) -> Self {
        Note {
            row,
            col,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moved_link_keeps_target() {
        let link = Hyperlink::new_url(1, 2, "https://example.com").with_tooltip("Open");
        let moved = link.moved_to(10, 3);
        assert_eq!((moved.row, moved.col), (10, 3));
        assert_eq!(moved.target, LinkTarget::External("https://example.com".to_string()));
        assert_eq!(moved.tooltip.as_deref(), Some("Open"));
    }

    #[test]
    fn test_moved_note_keeps_author() {
        let note = Note::new(0, 0, "Check totals").with_author("Ana");
        let moved = note.moved_to(4, 1);
        assert_eq!(moved.author.as_deref(), Some("Ana"));
        assert_eq!(moved.text, "Check totals");
        assert_eq!((moved.row, moved.col), (4, 1));
    }
}
