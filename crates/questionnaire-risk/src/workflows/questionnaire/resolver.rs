use super::document::{DocumentContext, RawFieldValue};
use super::metadata::{FieldDescriptor, FieldMetadataStore};
use super::normalizer::{canonicalize, is_unanswered, normalize_raw_value, UNANSWERED_LABEL};
use super::radio::{is_radio_field, resolve_radio, UnknownRadioCodeError};
use super::risk::{RiskEntry, RiskProfileTable};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// One scored answer. Weight, level and score are `None` when the answer is
/// missing or has no risk profile entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub identifying_id: String,
    pub item_id: f64,
    pub response: String,
    pub response_weight: Option<f64>,
    pub risk_level: Option<f64>,
    pub risk_score: Option<f64>,
}

/// One answer with its position in the questionnaire, unscored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub identifying_id: String,
    pub global_number: i64,
    pub local_index: i64,
    pub group: String,
    pub display_text: String,
    pub response: String,
    #[serde(skip)]
    item_id: Option<f64>,
}

/// Both record sequences for one document, each sorted by item id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDocument {
    pub scored: Vec<ScoredRecord>,
    pub raw: Vec<RawRecord>,
}

/// Joins every described field of the document with its metadata and risk
/// profile. Fields missing from either side are skipped. An unknown radio
/// code aborts the whole document.
pub fn resolve(
    document: &DocumentContext,
    store: &FieldMetadataStore,
    risk_profile: &RiskProfileTable,
) -> Result<ResolvedDocument, UnknownRadioCodeError> {
    let identifying_id = document.identifying_id();
    let mut resolved = ResolvedDocument::default();

    for (field_key, entry) in document.fields() {
        let Some(descriptor) = store.get(field_key) else {
            debug!(field_key = %field_key, "field has no metadata; skipped");
            continue;
        };

        let response = match &entry.value {
            Some(value) => resolve_response(field_key, value, descriptor)?,
            None => String::new(),
        };

        if let Some(item_id) = descriptor.risk_id() {
            let weighting = score(item_id, &response, risk_profile);
            if weighting.is_none() && !is_unanswered(&response) {
                debug!(item_id, response = %response, "no risk weighting for response");
            }
            resolved.scored.push(ScoredRecord {
                identifying_id: identifying_id.to_string(),
                item_id,
                response: response.clone(),
                response_weight: weighting.map(|entry| entry.response_weight()),
                risk_level: weighting.map(|entry| entry.risk_level()),
                risk_score: weighting.map(|entry| entry.risk_score()),
            });
        }

        let raw_response = if entry.value.is_some() {
            response
        } else {
            UNANSWERED_LABEL.to_string()
        };
        resolved.raw.push(RawRecord {
            identifying_id: identifying_id.to_string(),
            global_number: descriptor.global_number(),
            local_index: descriptor.local_index(),
            group: descriptor.group().to_string(),
            display_text: descriptor.display_text().to_string(),
            response: raw_response,
            item_id: descriptor.risk_id(),
        });
    }

    resolved
        .scored
        .sort_by(|left, right| left.item_id.total_cmp(&right.item_id));
    resolved
        .raw
        .sort_by(|left, right| compare_item_ids(left.item_id, right.item_id));

    Ok(resolved)
}

fn resolve_response(
    field_key: &str,
    value: &RawFieldValue,
    descriptor: &FieldDescriptor,
) -> Result<String, UnknownRadioCodeError> {
    let normalized = normalize_raw_value(value);
    if is_radio_field(field_key) {
        let label = resolve_radio(field_key, &normalized)?;
        return Ok(canonicalize(&label));
    }

    Ok(canonicalize(descriptor.translate(&normalized)))
}

fn score(item_id: f64, response: &str, risk_profile: &RiskProfileTable) -> Option<RiskEntry> {
    if is_unanswered(response) || !risk_profile.contains_risk_id(item_id) {
        return None;
    }
    risk_profile.lookup(item_id, response)
}

/// Identified records first, ascending; unidentified ones keep their order.
fn compare_item_ids(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
