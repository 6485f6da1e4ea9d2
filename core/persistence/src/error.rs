//! FILENAME: core/persistence/src/error.rs
//! PURPOSE: Failures raised while reading or writing an xlsx package.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("XLSX read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    /// The package container could not be opened or a part could not be read.
    #[error("ZIP container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A package part (workbook, rels, styles, worksheet) is not well-formed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    /// A sheet requested by name is absent from the workbook.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
}
