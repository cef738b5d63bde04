use super::metadata::{FieldMetadataStore, MetadataError};
use super::risk::{RiskProfileError, RiskProfileTable};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ReferenceDataError {
    #[error("field metadata file {path} could not be loaded: {source}")]
    FieldMetadata {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },
    #[error("risk profile file {path} could not be loaded: {source}")]
    RiskProfile {
        path: PathBuf,
        #[source]
        source: RiskProfileError,
    },
}

/// Read-only inputs shared by every document in a batch.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub fields: FieldMetadataStore,
    pub risk_profile: RiskProfileTable,
}

impl ReferenceData {
    pub fn load(
        field_info_path: &Path,
        risk_profile_path: &Path,
    ) -> Result<Self, ReferenceDataError> {
        let fields = FieldMetadataStore::from_path(field_info_path).map_err(|source| {
            ReferenceDataError::FieldMetadata {
                path: field_info_path.to_path_buf(),
                source,
            }
        })?;
        let risk_profile = RiskProfileTable::from_path(risk_profile_path).map_err(|source| {
            ReferenceDataError::RiskProfile {
                path: risk_profile_path.to_path_buf(),
                source,
            }
        })?;

        info!(
            fields = fields.len(),
            scored_questions = risk_profile.len(),
            "reference data loaded"
        );
        Ok(Self {
            fields,
            risk_profile,
        })
    }
}
