use std::path::{Path, PathBuf};

const UNSAFE_FILE_NAME_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Lowercases, trims and replaces characters that Windows rejects in file
/// names with `-`.
pub fn sanitize_file_component(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace(UNSAFE_FILE_NAME_CHARS, "-")
}

/// Output locations for one document's tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFileNames {
    pub organization: String,
    pub identifier: String,
    output_dir: PathBuf,
    scored_stem: String,
    raw_stem: String,
}

impl DocumentFileNames {
    pub fn new(output_dir: &Path, organization_name: &str, identifying_id: &str) -> Self {
        let organization = sanitize_file_component(organization_name);
        let identifier = sanitize_file_component(identifying_id);
        Self {
            output_dir: output_dir.to_path_buf(),
            scored_stem: format!("responses_{organization}_{identifier}"),
            raw_stem: format!("responses_raw_{organization}_{identifier}"),
            organization,
            identifier,
        }
    }

    pub fn scored_csv(&self) -> PathBuf {
        self.file(&self.scored_stem, "csv")
    }

    pub fn scored_xlsx(&self) -> PathBuf {
        self.file(&self.scored_stem, "xlsx")
    }

    pub fn raw_csv(&self) -> PathBuf {
        self.file(&self.raw_stem, "csv")
    }

    pub fn raw_xlsx(&self) -> PathBuf {
        self.file(&self.raw_stem, "xlsx")
    }

    // Stems may contain dots, so extensions are appended rather than set.
    fn file(&self, stem: &str, extension: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.{extension}"))
    }
}

/// Batch-scoped files, namespaced by the batch start timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterFileNames {
    pub scored_csv: PathBuf,
    pub raw_csv: PathBuf,
    pub info_csv: PathBuf,
    pub scored_xlsx: PathBuf,
    pub raw_xlsx: PathBuf,
    pub not_processed_csv: PathBuf,
}

impl MasterFileNames {
    pub fn new(output_dir: &Path, batch_timestamp: &str) -> Self {
        Self {
            scored_csv: output_dir.join(format!("response_master_{batch_timestamp}.csv")),
            raw_csv: output_dir.join(format!("response_raw_master_{batch_timestamp}.csv")),
            info_csv: output_dir.join(format!("info_{batch_timestamp}.csv")),
            scored_xlsx: output_dir.join(format!("response_master_{batch_timestamp}.xlsx")),
            raw_xlsx: output_dir.join(format!("response_raw_master_{batch_timestamp}.xlsx")),
            not_processed_csv: output_dir.join(format!("not_processed_{batch_timestamp}.csv")),
        }
    }
}
