use super::naming::MasterFileNames;
use super::tables::{Row, RAW_COLUMNS, SCORED_COLUMNS};
use super::writer::{write_xlsx, ReportError};
use super::ExportedDocument;
use std::path::Path;
use tracing::info;

/// Rows exported during one batch, kept so the master workbooks can be
/// written once the batch finishes.
#[derive(Debug, Clone)]
pub struct MasterTables {
    files: MasterFileNames,
    scored: Vec<Row>,
    raw: Vec<Row>,
}

impl MasterTables {
    pub fn new(output_dir: &Path, batch_timestamp: &str) -> Self {
        Self {
            files: MasterFileNames::new(output_dir, batch_timestamp),
            scored: Vec::new(),
            raw: Vec::new(),
        }
    }

    pub fn files(&self) -> &MasterFileNames {
        &self.files
    }

    pub fn record(&mut self, exported: &ExportedDocument) {
        self.scored.extend(exported.scored_rows.iter().cloned());
        self.raw.extend(exported.raw_rows.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.scored.is_empty() && self.raw.is_empty()
    }

    /// Writes both master workbooks. Nothing is written for an empty batch.
    pub fn write_workbooks(&self) -> Result<(), ReportError> {
        if self.is_empty() {
            return Ok(());
        }

        write_xlsx(&self.files.scored_xlsx, &SCORED_COLUMNS, &self.scored)?;
        write_xlsx(&self.files.raw_xlsx, &RAW_COLUMNS, &self.raw)?;
        info!(
            scored_rows = self.scored.len(),
            raw_rows = self.raw.len(),
            path = %self.files.scored_xlsx.display(),
            "master workbooks written"
        );
        Ok(())
    }
}
