use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Two identifying questions precede the numbered sequence, so the global
/// question number is the authored sequence number minus this offset.
const GLOBAL_NUMBER_OFFSET: i64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("field descriptor has a blank field key")]
    BlankFieldKey,
    #[error("field '{field_key}' has a non-finite risk id {value}")]
    NonFiniteRiskId { field_key: String, value: f64 },
    #[error("field key '{0}' is described more than once")]
    DuplicateFieldKey(String),
    #[error("column '{column}' expects an integer, found '{value}'")]
    InvalidInteger { column: &'static str, value: String },
    #[error("column 'id' expects a number, found '{value}'")]
    InvalidRiskId { value: String },
    #[error("unsupported field metadata format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// What one PDF form field means and how it is scored.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    field_key: String,
    sequence_number: i64,
    local_index: i64,
    group: String,
    display_text: String,
    risk_id: Option<f64>,
    value_translations: Option<BTreeMap<String, String>>,
}

impl FieldDescriptor {
    pub fn new(
        field_key: impl Into<String>,
        sequence_number: i64,
        local_index: i64,
        group: impl Into<String>,
        display_text: impl Into<String>,
        risk_id: Option<f64>,
    ) -> Result<Self, MetadataError> {
        let field_key = field_key.into();
        if field_key.trim().is_empty() {
            return Err(MetadataError::BlankFieldKey);
        }
        if let Some(value) = risk_id.filter(|value| !value.is_finite()) {
            return Err(MetadataError::NonFiniteRiskId { field_key, value });
        }

        Ok(Self {
            field_key,
            sequence_number,
            local_index,
            group: group.into(),
            display_text: display_text.into(),
            risk_id,
            value_translations: None,
        })
    }

    pub fn with_value_translations(mut self, translations: BTreeMap<String, String>) -> Self {
        self.value_translations = Some(translations).filter(|map| !map.is_empty());
        self
    }

    pub fn field_key(&self) -> &str {
        &self.field_key
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn global_number(&self) -> i64 {
        self.sequence_number - GLOBAL_NUMBER_OFFSET
    }

    pub fn local_index(&self) -> i64 {
        self.local_index
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn risk_id(&self) -> Option<f64> {
        self.risk_id
    }

    /// Controlled-vocabulary replacement for a normalized value, if defined.
    pub fn translate<'a>(&'a self, value: &'a str) -> &'a str {
        self.value_translations
            .as_ref()
            .and_then(|translations| translations.get(value))
            .map_or(value, String::as_str)
    }
}

/// Every known field of the questionnaire, ordered by sequence number.
#[derive(Debug, Clone, Default)]
pub struct FieldMetadataStore {
    descriptors: Vec<FieldDescriptor>,
    by_key: HashMap<String, usize>,
}

impl FieldMetadataStore {
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self, MetadataError>
    where
        I: IntoIterator<Item = FieldDescriptor>,
    {
        let mut descriptors: Vec<FieldDescriptor> = descriptors.into_iter().collect();
        descriptors.sort_by_key(FieldDescriptor::sequence_number);

        let mut by_key = HashMap::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            if by_key.insert(descriptor.field_key.clone(), index).is_some() {
                return Err(MetadataError::DuplicateFieldKey(
                    descriptor.field_key.clone(),
                ));
            }
        }

        Ok(Self {
            descriptors,
            by_key,
        })
    }

    /// Loads a `.json` field-info file or a `.csv` items table.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Self::from_json_reader(std::fs::File::open(path)?),
            Some("csv") => Self::from_csv_reader(std::fs::File::open(path)?),
            _ => Err(MetadataError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Field-info JSON: `{ "<field key>": {num, local, text, group, id?, values?} }`.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, MetadataError> {
        let entries: BTreeMap<String, InfoEntry> = serde_json::from_reader(reader)?;
        let descriptors = entries
            .into_iter()
            .map(|(field_key, entry)| entry.into_descriptor(field_key))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_descriptors(descriptors)
    }

    /// Items table with columns `key, num, local, text, group, id`.
    pub fn from_csv_reader<R: Read>(mut reader: R) -> Result<Self, MetadataError> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut descriptors = Vec::new();
        for row in csv_reader.deserialize::<ItemRow>() {
            let row = row?;
            descriptors.push(FieldDescriptor::new(
                row.key,
                parse_integer("num", &row.num)?,
                parse_integer("local", &row.local)?,
                row.group,
                row.text,
                parse_risk_id(row.id.as_deref().unwrap_or_default())?,
            )?);
        }
        Self::from_descriptors(descriptors)
    }

    pub fn get(&self, field_key: &str) -> Option<&FieldDescriptor> {
        self.by_key
            .get(field_key)
            .map(|index| &self.descriptors[*index])
    }

    /// First descriptor, in sequence order, whose display text equals `label`.
    pub fn find_by_display_text(&self, label: &str) -> Option<&FieldDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.display_text == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Parses `num` and `local`. Integral decimals such as `3.0` are accepted
/// because spreadsheet exports write whole numbers that way.
pub fn parse_integer(column: &'static str, raw: &str) -> Result<i64, MetadataError> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && fits_i64(value) => Ok(value as i64),
        _ => Err(MetadataError::InvalidInteger {
            column,
            value: raw.to_string(),
        }),
    }
}

// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn fits_i64(value: f64) -> bool {
    value >= i64::MIN as f64 && value < i64::MAX as f64
}

/// Parses `id`: a float when non-empty, otherwise unset.
pub fn parse_risk_id(raw: &str) -> Result<Option<f64>, MetadataError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(MetadataError::InvalidRiskId {
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct InfoEntry {
    #[serde(deserialize_with = "integer_cell")]
    num: i64,
    #[serde(deserialize_with = "integer_cell")]
    local: i64,
    text: String,
    group: String,
    #[serde(default, deserialize_with = "risk_id_cell")]
    id: Option<f64>,
    #[serde(default)]
    values: Option<BTreeMap<String, String>>,
}

impl InfoEntry {
    fn into_descriptor(self, field_key: String) -> Result<FieldDescriptor, MetadataError> {
        let descriptor =
            FieldDescriptor::new(field_key, self.num, self.local, self.group, self.text, self.id)?;
        Ok(match self.values {
            Some(values) => descriptor.with_value_translations(values),
            None => descriptor,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    key: String,
    num: String,
    local: String,
    text: String,
    group: String,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonCell {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl JsonCell {
    fn into_text(self) -> String {
        match self {
            JsonCell::Integer(value) => value.to_string(),
            JsonCell::Float(value) => value.to_string(),
            JsonCell::Text(value) => value,
        }
    }
}

fn integer_cell<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = JsonCell::deserialize(deserializer)?;
    match cell {
        JsonCell::Integer(value) => Ok(value),
        other => parse_integer("num/local", &other.into_text()).map_err(serde::de::Error::custom),
    }
}

fn risk_id_cell<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = Option::<JsonCell>::deserialize(deserializer)?;
    match cell {
        None => Ok(None),
        Some(JsonCell::Integer(value)) => Ok(Some(value as f64)),
        Some(JsonCell::Float(value)) => Ok(Some(value)),
        Some(JsonCell::Text(value)) => parse_risk_id(&value).map_err(serde::de::Error::custom),
    }
}
