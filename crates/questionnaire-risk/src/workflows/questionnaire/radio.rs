use std::collections::HashMap;
use std::sync::OnceLock;

const RADIO_FIELD_PREFIX: &str = "RadioButton";

static STANDARD_TABLE: OnceLock<RadioCodeTable> = OnceLock::new();

/// A radio group reported a selection code the questionnaire does not define.
/// This points at a corrupted or unsupported form version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("radio button field '{field_key}' reported unknown code '{code}'")]
pub struct UnknownRadioCodeError {
    pub field_key: String,
    pub code: String,
}

/// Per-field translation of radio selection codes to the option labels
/// printed on the questionnaire.
#[derive(Debug, Clone, Default)]
pub struct RadioCodeTable {
    fields: HashMap<String, HashMap<String, String>>,
}

impl RadioCodeTable {
    pub fn standard() -> &'static Self {
        STANDARD_TABLE.get_or_init(|| {
            const AGREEMENT_SCALE: &[(&str, &str)] = &[
                ("0", "Strongly Agree"),
                ("4", "Agree"),
                ("3", "Neutral"),
                ("2", "Disagree"),
                ("1", "Strongly disagree"),
            ];
            const COMPLAINT_MONITORING_SCALE: &[(&str, &str)] = &[
                ("0", "Strongly Agree"),
                ("5", "Agree"),
                ("4", "Neutral"),
                ("3", "Disagree"),
                ("2", "Strongly disagree"),
                ("1", "Unsure"),
                (
                    "6",
                    "N/A; we have not yet implemented a system for monitoring and responding to beneficiary complaints",
                ),
            ];

            Self::default()
                .with_field("RadioButton1", AGREEMENT_SCALE)
                .with_field("RadioButton2", COMPLAINT_MONITORING_SCALE)
        })
    }

    pub fn with_field(mut self, field_key: &str, codes: &[(&str, &str)]) -> Self {
        let codes = codes
            .iter()
            .map(|(code, label)| (code.to_string(), label.to_string()))
            .collect();
        self.fields.insert(field_key.to_string(), codes);
        self
    }

    pub fn resolve(&self, field_key: &str, code: &str) -> Result<&str, UnknownRadioCodeError> {
        self.fields
            .get(field_key)
            .and_then(|codes| codes.get(code))
            .map(String::as_str)
            .ok_or_else(|| UnknownRadioCodeError {
                field_key: field_key.to_string(),
                code: code.to_string(),
            })
    }
}

pub fn is_radio_field(field_key: &str) -> bool {
    field_key.starts_with(RADIO_FIELD_PREFIX)
}

/// Translates a selection code through the standard questionnaire table.
pub fn resolve_radio(field_key: &str, code: &str) -> Result<String, UnknownRadioCodeError> {
    RadioCodeTable::standard()
        .resolve(field_key, code)
        .map(str::to_string)
}
