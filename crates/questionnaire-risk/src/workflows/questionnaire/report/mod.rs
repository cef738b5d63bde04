//! Turns resolved records into per-document and batch-wide tables.

mod master;
mod naming;
mod tables;
mod writer;

pub use master::MasterTables;
pub use naming::{sanitize_file_component, DocumentFileNames, MasterFileNames};
pub use tables::{
    raw_row, scored_row, text_row, Cell, Row, INFO_COLUMNS, NOT_PROCESSED_COLUMNS, RAW_COLUMNS,
    SCORED_COLUMNS,
};
pub use writer::{append_csv, write_csv, write_xlsx, FileCheckpoint, ReportError};

use super::document::DocumentContext;
use super::resolver::ResolvedDocument;
use std::path::Path;
use tracing::{debug, warn};

/// Files and rows produced for one document.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub files: DocumentFileNames,
    pub scored_rows: Vec<Row>,
    pub raw_rows: Vec<Row>,
}

/// Writes the document's scored and raw tables as XLSX and CSV, then appends
/// the same rows to the batch master CSVs and records the document in the
/// batch info file. On failure the document's own files are removed and the
/// master files are cut back to where they were, so nothing of a failed
/// document remains.
pub fn assemble_and_export(
    resolved: &ResolvedDocument,
    document: &DocumentContext,
    output_dir: &Path,
    batch_timestamp: &str,
) -> Result<ExportedDocument, ReportError> {
    let files = DocumentFileNames::new(
        output_dir,
        document.organization_name(),
        document.identifying_id(),
    );
    let masters = MasterFileNames::new(output_dir, batch_timestamp);

    let scored_rows: Vec<Row> = resolved.scored.iter().map(scored_row).collect();
    let raw_rows: Vec<Row> = resolved.raw.iter().map(raw_row).collect();
    let info_identifier = document.identifying_id().trim().to_lowercase();
    let info_rows = [text_row([
        files.organization.as_str(),
        info_identifier.as_str(),
    ])];

    let checkpoints = [
        FileCheckpoint::capture(&masters.scored_csv),
        FileCheckpoint::capture(&masters.raw_csv),
        FileCheckpoint::capture(&masters.info_csv),
    ];

    let written = write_document_files(&files, &scored_rows, &raw_rows).and_then(|()| {
        append_csv(&masters.scored_csv, &SCORED_COLUMNS, &scored_rows)?;
        append_csv(&masters.raw_csv, &RAW_COLUMNS, &raw_rows)?;
        append_csv(&masters.info_csv, &INFO_COLUMNS, &info_rows)
    });

    if let Err(err) = written {
        roll_back(&files, &checkpoints);
        return Err(err);
    }

    debug!(
        source = document.source_name(),
        scored = scored_rows.len(),
        raw = raw_rows.len(),
        "document tables written"
    );

    Ok(ExportedDocument {
        files,
        scored_rows,
        raw_rows,
    })
}

fn write_document_files(
    files: &DocumentFileNames,
    scored_rows: &[Row],
    raw_rows: &[Row],
) -> Result<(), ReportError> {
    write_xlsx(&files.scored_xlsx(), &SCORED_COLUMNS, scored_rows)?;
    write_csv(&files.scored_csv(), &SCORED_COLUMNS, scored_rows)?;
    write_xlsx(&files.raw_xlsx(), &RAW_COLUMNS, raw_rows)?;
    write_csv(&files.raw_csv(), &RAW_COLUMNS, raw_rows)
}

fn roll_back(files: &DocumentFileNames, checkpoints: &[FileCheckpoint]) {
    for path in [
        files.scored_xlsx(),
        files.scored_csv(),
        files.raw_xlsx(),
        files.raw_csv(),
    ] {
        if path.is_file() {
            if let Err(err) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %err, "could not remove partial output");
            }
        }
    }

    for checkpoint in checkpoints {
        if let Err(err) = checkpoint.restore() {
            warn!(
                path = %checkpoint.path().display(),
                error = %err,
                "could not roll back master file"
            );
        }
    }
}
