use crate::workflows::questionnaire::resolver::{RawRecord, ScoredRecord};

pub const SCORED_COLUMNS: [&str; 6] = [
    "Identifier",
    "ID",
    "Response",
    "Response Weight",
    "Risk Level",
    "Risk Score",
];

pub const RAW_COLUMNS: [&str; 6] = [
    "Identifier",
    "Global Number",
    "Topic Number",
    "Topic",
    "Text",
    "Response",
];

pub const INFO_COLUMNS: [&str; 2] = ["organization", "identifier"];

pub const NOT_PROCESSED_COLUMNS: [&str; 2] = ["file_name", "reason"];

/// A single table cell. `Empty` stands for a not-available value and is
/// written as an empty field in CSV and a blank cell in XLSX.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Integer(i64),
    Empty,
}

impl Cell {
    /// CSV text for the cell. Whole floats keep a trailing `.0` so numeric
    /// columns read back as floats.
    pub fn to_csv_field(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e16 => {
                format!("{value:.1}")
            }
            Cell::Number(value) => value.to_string(),
            Cell::Integer(value) => value.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }
}

pub type Row = Vec<Cell>;

pub fn scored_row(record: &ScoredRecord) -> Row {
    vec![
        Cell::Text(record.identifying_id.clone()),
        Cell::Number(record.item_id),
        Cell::Text(record.response.clone()),
        record.response_weight.into(),
        record.risk_level.into(),
        record.risk_score.into(),
    ]
}

pub fn raw_row(record: &RawRecord) -> Row {
    vec![
        Cell::Text(record.identifying_id.clone()),
        Cell::Integer(record.global_number),
        Cell::Integer(record.local_index),
        Cell::Text(record.group.clone()),
        Cell::Text(record.display_text.clone()),
        Cell::Text(record.response.clone()),
    ]
}

pub fn text_row<'a>(values: impl IntoIterator<Item = &'a str>) -> Row {
    values
        .into_iter()
        .map(|value| Cell::Text(value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_like_float_columns() {
        assert_eq!(Cell::Number(6.0).to_csv_field(), "6.0");
        assert_eq!(Cell::Number(0.0).to_csv_field(), "0.0");
        assert_eq!(Cell::Number(2.5).to_csv_field(), "2.5");
        assert_eq!(Cell::Number(0.1).to_csv_field(), "0.1");
        assert_eq!(Cell::Integer(2).to_csv_field(), "2");
        assert_eq!(Cell::from(None).to_csv_field(), "");
    }

    #[test]
    fn scored_rows_follow_column_order() {
        let record = ScoredRecord {
            identifying_id: "BP-1".to_string(),
            item_id: 1.0,
            response: "Yes".to_string(),
            response_weight: Some(2.0),
            risk_level: Some(3.0),
            risk_score: Some(6.0),
        };
        let fields: Vec<String> = scored_row(&record).iter().map(Cell::to_csv_field).collect();
        assert_eq!(fields, ["BP-1", "1.0", "Yes", "2.0", "3.0", "6.0"]);
        assert_eq!(fields.len(), SCORED_COLUMNS.len());
    }

    #[test]
    fn missing_weights_render_as_empty_cells() {
        let record = ScoredRecord {
            identifying_id: "BP-1".to_string(),
            item_id: 4.5,
            response: String::new(),
            response_weight: None,
            risk_level: None,
            risk_score: None,
        };
        let row = scored_row(&record);
        assert_eq!(&row[3..], [Cell::Empty, Cell::Empty, Cell::Empty]);
    }
}
