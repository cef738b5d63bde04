use super::metadata::FieldMetadataStore;
use super::normalizer::decode_permissive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display text of the field holding the external respondent identifier.
pub const DEFAULT_IDENTIFIER_LABEL: &str = "BPID";
/// Display text of the field holding the respondent organization.
pub const ORGANIZATION_LABEL: &str = "Organization Legal Name";

/// A field's current value as reported by the form reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFieldValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl RawFieldValue {
    fn decoded(&self) -> String {
        match self {
            RawFieldValue::Text(text) => text.clone(),
            RawFieldValue::Bytes(bytes) => decode_permissive(bytes),
        }
    }
}

impl From<&str> for RawFieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for RawFieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Value bag for one form field. Only the current value (`/V`) matters here;
/// an absent entry means the respondent left the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    #[serde(rename = "/V", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RawFieldValue>,
}

impl FieldEntry {
    pub fn with_value(value: impl Into<RawFieldValue>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }

    pub fn unset() -> Self {
        Self::default()
    }
}

/// Field key to value bag, as read from one document.
pub type RawFieldMap = BTreeMap<String, FieldEntry>;

/// Per-document state for one resolution pass.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    source_name: String,
    fields: RawFieldMap,
    identifying_id: String,
    organization_name: String,
}

impl DocumentContext {
    pub fn new(
        source_name: impl Into<String>,
        fields: RawFieldMap,
        store: &FieldMetadataStore,
        identifier_label: &str,
    ) -> Self {
        let identifying_id = find_identifying_id(&fields, store, identifier_label);
        let organization_name = find_organization_name(&fields, store);
        Self {
            source_name: source_name.into(),
            fields,
            identifying_id,
            organization_name,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn fields(&self) -> &RawFieldMap {
        &self.fields
    }

    pub fn identifying_id(&self) -> &str {
        &self.identifying_id
    }

    pub fn organization_name(&self) -> &str {
        &self.organization_name
    }
}

/// Current value of the first field labelled `identifier_label`, or empty.
pub fn find_identifying_id(
    fields: &RawFieldMap,
    store: &FieldMetadataStore,
    identifier_label: &str,
) -> String {
    labelled_value(fields, store, identifier_label).unwrap_or_default()
}

/// Current value of the organization-name field, trimmed, or empty.
pub fn find_organization_name(fields: &RawFieldMap, store: &FieldMetadataStore) -> String {
    labelled_value(fields, store, ORGANIZATION_LABEL)
        .map(|name| name.trim().to_string())
        .unwrap_or_default()
}

fn labelled_value(fields: &RawFieldMap, store: &FieldMetadataStore, label: &str) -> Option<String> {
    let descriptor = store.find_by_display_text(label)?;
    fields
        .get(descriptor.field_key())
        .and_then(|entry| entry.value.as_ref())
        .map(RawFieldValue::decoded)
}
