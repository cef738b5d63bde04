use super::tables::{Cell, Row};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
/// Rows available below the header line of a single worksheet.
const MAX_SHEET_ROWS: usize = 1_048_575;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write {path}: {source}")]
    Xlsx {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("{path} would need {rows} rows, more than one worksheet holds")]
    SheetTooLarge { path: PathBuf, rows: usize },
}

/// Creates or truncates `path` and writes a BOM, the header and `rows`.
pub fn write_csv(path: &Path, header: &[&str], rows: &[Row]) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|source| io_error(path, source))?;
    write_csv_body(path, file, Some(header), rows)
}

/// Appends `rows` to `path`. A missing file is created first with a BOM and
/// the header; an existing one only receives the rows.
pub fn append_csv(path: &Path, header: &[&str], rows: &[Row]) -> Result<(), ReportError> {
    match OpenOptions::new().append(true).open(path) {
        Ok(file) => write_csv_body(path, file, None, rows),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => write_csv(path, header, rows),
        Err(err) => Err(io_error(path, err)),
    }
}

fn write_csv_body(
    path: &Path,
    mut file: File,
    header: Option<&[&str]>,
    rows: &[Row],
) -> Result<(), ReportError> {
    if header.is_some() {
        file.write_all(UTF8_BOM)
            .map_err(|source| io_error(path, source))?;
    }

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    if let Some(header) = header {
        writer.write_record(header).map_err(csv_error)?;
    }
    for row in rows {
        writer
            .write_record(row.iter().map(Cell::to_csv_field))
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|source| io_error(path, source))
}

/// Writes a single-sheet workbook with a bold header row.
pub fn write_xlsx(path: &Path, header: &[&str], rows: &[Row]) -> Result<(), ReportError> {
    if rows.len() > MAX_SHEET_ROWS {
        return Err(ReportError::SheetTooLarge {
            path: path.to_path_buf(),
            rows: rows.len(),
        });
    }

    fill_workbook(path, header, rows).map_err(|source| ReportError::Xlsx {
        path: path.to_path_buf(),
        source,
    })
}

fn fill_workbook(path: &Path, header: &[&str], rows: &[Row]) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, title) in (0_u16..).zip(header) {
        worksheet.write_string_with_format(0, col, *title, &bold)?;
    }

    for (row_index, row) in (1_u32..).zip(rows) {
        for (col, cell) in (0_u16..).zip(row) {
            match cell {
                Cell::Text(text) => {
                    worksheet.write_string(row_index, col, text)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number(row_index, col, *value)?;
                }
                Cell::Integer(value) => {
                    worksheet.write_number(row_index, col, *value as f64)?;
                }
                Cell::Empty => {}
            }
        }
    }

    workbook.save(path)
}

/// State of an output file before a document touched it, so a failed export
/// can put it back.
#[derive(Debug)]
pub struct FileCheckpoint {
    path: PathBuf,
    state: CheckpointState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckpointState {
    Existing(u64),
    Absent,
    Foreign,
}

impl FileCheckpoint {
    pub fn capture(path: &Path) -> Self {
        let state = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => CheckpointState::Existing(metadata.len()),
            Ok(_) => CheckpointState::Foreign,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CheckpointState::Absent,
            Err(_) => CheckpointState::Foreign,
        };
        Self {
            path: path.to_path_buf(),
            state,
        }
    }

    /// Truncates back to the captured length, or removes a file that did not
    /// exist yet. Paths that were not regular files are left alone.
    pub fn restore(&self) -> std::io::Result<()> {
        match self.state {
            CheckpointState::Existing(len) => OpenOptions::new()
                .write(true)
                .open(&self.path)
                .and_then(|file| file.set_len(len)),
            CheckpointState::Absent => match std::fs::remove_file(&self.path) {
                Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
                _ => Ok(()),
            },
            CheckpointState::Foreign => Ok(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}
