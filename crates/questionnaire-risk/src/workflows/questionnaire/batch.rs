use super::document::{DocumentContext, DEFAULT_IDENTIFIER_LABEL};
use super::radio::UnknownRadioCodeError;
use super::reference::ReferenceData;
use super::report::{
    assemble_and_export, text_row, write_csv, ExportedDocument, MasterFileNames, MasterTables,
    ReportError, NOT_PROCESSED_COLUMNS,
};
use super::resolver::resolve;
use super::source::{FieldSource, FieldSourceError};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const BATCH_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Local start time of a batch, used to namespace its master files.
pub fn batch_timestamp() -> String {
    Local::now().format(BATCH_TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Source(#[from] FieldSourceError),
    #[error(transparent)]
    Radio(#[from] UnknownRadioCodeError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("input {path} does not exist")]
    InputNotFound { path: PathBuf },
    #[error("no .{extension} documents found in {path}")]
    NoInputs {
        path: PathBuf,
        extension: &'static str,
    },
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Report(#[from] ReportError),
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub batch_timestamp: String,
    pub identifier_label: String,
}

impl BatchOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            batch_timestamp: batch_timestamp(),
            identifier_label: DEFAULT_IDENTIFIER_LABEL.to_string(),
        }
    }

    pub fn with_batch_timestamp(mut self, batch_timestamp: impl Into<String>) -> Self {
        self.batch_timestamp = batch_timestamp.into();
        self
    }

    pub fn with_identifier_label(mut self, identifier_label: impl Into<String>) -> Self {
        self.identifier_label = identifier_label.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one batch, for display.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub batch_timestamp: String,
    pub total: usize,
    pub processed: usize,
    pub failed: Vec<FailedDocument>,
    pub output_dir: PathBuf,
    pub master_files: MasterFileNames,
}

/// Runs documents through reading, resolution and export one at a time.
pub struct BatchDriver<'a> {
    reference: &'a ReferenceData,
    source: &'a dyn FieldSource,
    options: BatchOptions,
}

impl<'a> BatchDriver<'a> {
    pub fn new(
        reference: &'a ReferenceData,
        source: &'a dyn FieldSource,
        options: BatchOptions,
    ) -> Self {
        Self {
            reference,
            source,
            options,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// A single file is taken as is. A directory yields its files with the
    /// source's extension, compared case-insensitively, sorted by name.
    pub fn discover_inputs(&self, input: &Path) -> Result<Vec<PathBuf>, BatchError> {
        if !input.exists() {
            return Err(BatchError::InputNotFound {
                path: input.to_path_buf(),
            });
        }
        if input.is_file() {
            return Ok(vec![input.to_path_buf()]);
        }

        let io_error = |source| BatchError::Io {
            path: input.to_path_buf(),
            source,
        };
        let extension = self.source.extension();
        let mut inputs = Vec::new();
        for entry in std::fs::read_dir(input).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if matches && path.is_file() {
                inputs.push(path);
            }
        }
        inputs.sort_by(|left, right| left.file_name().cmp(&right.file_name()));

        if inputs.is_empty() {
            return Err(BatchError::NoInputs {
                path: input.to_path_buf(),
                extension,
            });
        }
        Ok(inputs)
    }

    pub fn run(&self, input: &Path) -> Result<BatchSummary, BatchError> {
        let inputs = self.discover_inputs(input)?;
        let output_dir = &self.options.output_dir;
        std::fs::create_dir_all(output_dir).map_err(|source| BatchError::Io {
            path: output_dir.clone(),
            source,
        })?;

        let total = inputs.len();
        let mut masters = MasterTables::new(output_dir, &self.options.batch_timestamp);
        let mut processed = 0;
        let mut failed = Vec::new();

        info!(
            total,
            batch = %self.options.batch_timestamp,
            output_dir = %output_dir.display(),
            "batch started"
        );
        for path in inputs {
            match self.process_document(&path) {
                Ok(exported) => {
                    masters.record(&exported);
                    processed += 1;
                    info!(
                        document = %path.display(),
                        "processed {processed}/{total}"
                    );
                }
                Err(err) => {
                    warn!(document = %path.display(), error = %err, "document not processed");
                    failed.push(FailedDocument {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        masters.write_workbooks()?;
        if !failed.is_empty() {
            let rows: Vec<_> = failed
                .iter()
                .map(|failure: &FailedDocument| {
                    let file_name = failure
                        .path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    text_row([file_name.as_str(), failure.reason.as_str()])
                })
                .collect();
            write_csv(
                &masters.files().not_processed_csv,
                &NOT_PROCESSED_COLUMNS,
                &rows,
            )?;
        }

        info!(processed, failed = failed.len(), "batch finished");
        Ok(BatchSummary {
            batch_timestamp: self.options.batch_timestamp.clone(),
            total,
            processed,
            failed,
            output_dir: output_dir.clone(),
            master_files: masters.files().clone(),
        })
    }

    /// Reads, resolves and exports one document. Nothing is written for a
    /// document that fails before export.
    pub fn process_document(&self, path: &Path) -> Result<ExportedDocument, DocumentError> {
        let fields = self.source.read_fields(path)?;
        let source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let document = DocumentContext::new(
            source_name,
            fields,
            &self.reference.fields,
            &self.options.identifier_label,
        );

        let resolved = resolve(&document, &self.reference.fields, &self.reference.risk_profile)?;
        let exported = assemble_and_export(
            &resolved,
            &document,
            &self.options.output_dir,
            &self.options.batch_timestamp,
        )?;
        Ok(exported)
    }
}
