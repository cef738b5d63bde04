//! Questionnaire extraction: reads filled PDF form fields, joins them with
//! field metadata and a risk profile, and exports scored and raw tables.

mod batch;
mod document;
mod metadata;
mod normalizer;
mod radio;
mod reference;
pub mod report;
mod resolver;
mod risk;
mod source;

pub use batch::{
    batch_timestamp, BatchDriver, BatchError, BatchOptions, BatchSummary, DocumentError,
    FailedDocument, BATCH_TIMESTAMP_FORMAT,
};
pub use document::{
    find_identifying_id, find_organization_name, DocumentContext, FieldEntry, RawFieldMap,
    RawFieldValue, DEFAULT_IDENTIFIER_LABEL, ORGANIZATION_LABEL,
};
pub use metadata::{
    parse_integer, parse_risk_id, FieldDescriptor, FieldMetadataStore, MetadataError,
};
pub use normalizer::{
    canonicalize, decode_permissive, is_unanswered, normalize_raw_value, risk_lookup_key,
    UNANSWERED_LABEL,
};
pub use radio::{is_radio_field, resolve_radio, RadioCodeTable, UnknownRadioCodeError};
pub use reference::{ReferenceData, ReferenceDataError};
pub use report::{assemble_and_export, ExportedDocument, ReportError};
pub use resolver::{resolve, RawRecord, ResolvedDocument, ScoredRecord};
pub use risk::{RiskEntry, RiskProfileError, RiskProfileTable};
pub use source::{
    form_fields, FieldSource, FieldSourceError, InputFormat, JsonFieldDump, PdfFormReader,
};
