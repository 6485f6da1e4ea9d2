//! FILENAME: core/combiner/src/header_policy.rs
//! PURPOSE: Decides which rows of each source are emitted.
//! CONTEXT: The first file is always copied whole; its leading
//! `header_rows_keep_first` rows are only labelled as headers. Every later
//! file loses its leading `header_rows_discard_others` rows.

use crate::config::CombinationConfig;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPolicy {
    keep_first: u32,
    discard_others: u32,
}

impl HeaderPolicy {
    pub fn new(keep_first: u32, discard_others: u32) -> Self {
        HeaderPolicy {
            keep_first,
            discard_others,
        }
    }

    pub fn from_config(config: &CombinationConfig) -> Self {
        Self::new(
            config.header_rows_keep_first,
            config.header_rows_discard_others,
        )
    }

    /// Whether `row` of the file at `file_index` reaches the output.
    pub fn should_emit(&self, file_index: usize, row: u32) -> bool {
        file_index == 0 || row >= self.discard_others
    }

    /// Whether `row` is one of the header rows kept from the first file.
    pub fn is_header_row(&self, file_index: usize, row: u32) -> bool {
        file_index == 0 && row < self.keep_first
    }

    /// Rows of a file with `row_count` rows to copy. Empty when every row is
    /// discarded.
    pub fn emitted_rows(&self, file_index: usize, row_count: u32) -> Range<u32> {
        if file_index == 0 {
            0..row_count
        } else {
            self.discard_others.min(row_count)..row_count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_file_keeps_everything() {
        let policy = HeaderPolicy::new(2, 5);
        assert_eq!(policy.emitted_rows(0, 10), 0..10);
        assert!(policy.should_emit(0, 0));
        assert!(policy.is_header_row(0, 1));
        assert!(!policy.is_header_row(0, 2));
    }

    #[test]
    fn test_later_files_drop_leading_rows() {
        let policy = HeaderPolicy::new(1, 1);
        assert_eq!(policy.emitted_rows(1, 10), 1..10);
        assert!(!policy.should_emit(2, 0));
        assert!(policy.should_emit(2, 1));
        assert!(!policy.is_header_row(1, 0));
    }

    #[test]
    fn test_discard_all_rows_is_empty_range() {
        let policy = HeaderPolicy::new(1, 3);
        assert!(policy.emitted_rows(1, 3).is_empty());
        assert!(policy.emitted_rows(1, 2).is_empty());
        assert!(policy.emitted_rows(1, 0).is_empty());
    }

    proptest! {
        #[test]
        fn emitted_range_matches_should_emit(
            keep in 0u32..10,
            discard in 0u32..20,
            file_index in 0usize..5,
            rows in 0u32..50,
        ) {
            let policy = HeaderPolicy::new(keep, discard);
            let range = policy.emitted_rows(file_index, rows);
            prop_assert!(range.end <= rows);
            for row in 0..rows {
                prop_assert_eq!(range.contains(&row), policy.should_emit(file_index, row));
            }
        }

        #[test]
        fn later_files_emit_rows_minus_discard(discard in 0u32..100, rows in 0u32..100) {
            let policy = HeaderPolicy::new(1, discard);
            let range = policy.emitted_rows(1, rows);
            prop_assert_eq!(range.len() as u32, rows.saturating_sub(discard));
        }
    }
}
