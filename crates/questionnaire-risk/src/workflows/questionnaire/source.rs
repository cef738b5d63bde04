use super::document::{FieldEntry, RawFieldMap, RawFieldValue};
use lopdf::{Dictionary, Document, Object};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Nesting limit for `/Kids` chains; deeper trees are treated as malformed.
const MAX_FIELD_DEPTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum FieldSourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse PDF {path}: {source}")]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
    #[error("failed to parse field dump {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} has no interactive form")]
    MissingAcroForm { path: PathBuf },
    #[error("{path} nests form fields deeper than {MAX_FIELD_DEPTH} levels")]
    FieldTreeTooDeep { path: PathBuf },
}

/// Anything that can produce a document's raw field map.
pub trait FieldSource {
    fn read_fields(&self, path: &Path) -> Result<RawFieldMap, FieldSourceError>;

    /// File extension (without the dot) of documents this source reads.
    fn extension(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputFormat {
    #[default]
    Pdf,
    FieldDump,
}

impl InputFormat {
    pub fn source(self) -> Box<dyn FieldSource> {
        match self {
            InputFormat::Pdf => Box::new(PdfFormReader),
            InputFormat::FieldDump => Box::new(JsonFieldDump),
        }
    }
}

/// Reads AcroForm field values straight from a PDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfFormReader;

impl FieldSource for PdfFormReader {
    fn read_fields(&self, path: &Path) -> Result<RawFieldMap, FieldSourceError> {
        let document = Document::load(path).map_err(|source| FieldSourceError::Pdf {
            path: path.to_path_buf(),
            source,
        })?;
        form_fields(&document, path)
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }
}

/// Reads a JSON dump of a field map, as written by the `fields` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFieldDump;

impl FieldSource for JsonFieldDump {
    fn read_fields(&self, path: &Path) -> Result<RawFieldMap, FieldSourceError> {
        let file = File::open(path).map_err(|source| FieldSourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| FieldSourceError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

/// Collects every named field of the document's AcroForm, nested kids
/// included. Each field is keyed by its mapping name (`/TM`) when present,
/// otherwise by its partial name (`/T`); metadata files use the same keys.
pub fn form_fields(document: &Document, path: &Path) -> Result<RawFieldMap, FieldSourceError> {
    let missing = || FieldSourceError::MissingAcroForm {
        path: path.to_path_buf(),
    };
    let catalog = document.catalog().map_err(|_| missing())?;
    let acro_form = catalog
        .get(b"AcroForm")
        .and_then(|object| resolve(document, object))
        .and_then(Object::as_dict)
        .map_err(|_| missing())?;
    let roots = acro_form
        .get(b"Fields")
        .and_then(|object| resolve(document, object))
        .and_then(Object::as_array)
        .map_err(|_| missing())?;

    let mut fields = RawFieldMap::new();
    let mut pending: Vec<(&Object, usize)> = roots.iter().rev().map(|object| (object, 0)).collect();

    while let Some((object, depth)) = pending.pop() {
        if depth > MAX_FIELD_DEPTH {
            return Err(FieldSourceError::FieldTreeTooDeep {
                path: path.to_path_buf(),
            });
        }
        let Ok(node) = resolve(document, object).and_then(Object::as_dict) else {
            debug!(depth, "skipping non-dictionary form field");
            continue;
        };

        if let Some(key) = field_key(node) {
            let value = node
                .get(b"V")
                .ok()
                .and_then(|object| resolve(document, object).ok())
                .and_then(field_value);
            fields.insert(key, FieldEntry { value });
        }

        if let Ok(kids) = node
            .get(b"Kids")
            .and_then(|object| resolve(document, object))
            .and_then(Object::as_array)
        {
            pending.extend(kids.iter().rev().map(|kid| (kid, depth + 1)));
        }
    }

    Ok(fields)
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> lopdf::Result<&'a Object> {
    document.dereference(object).map(|(_, object)| object)
}

/// `/TM` wins over `/T`. Widget annotations carry neither and are skipped.
fn field_key(node: &Dictionary) -> Option<String> {
    text_entry(node, b"TM").or_else(|| text_entry(node, b"T"))
}

fn text_entry(node: &Dictionary, key: &[u8]) -> Option<String> {
    match node.get(key).ok()? {
        Object::String(bytes, _) => Some(
            decode_pdf_text(bytes).unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned()),
        ),
        _ => None,
    }
}

fn field_value(object: &Object) -> Option<RawFieldValue> {
    match object {
        Object::Name(name) => Some(RawFieldValue::Text(format!(
            "/{}",
            String::from_utf8_lossy(name)
        ))),
        Object::String(bytes, _) => Some(
            decode_pdf_text(bytes)
                .map(RawFieldValue::Text)
                .unwrap_or_else(|| RawFieldValue::Bytes(bytes.clone())),
        ),
        Object::Integer(value) => Some(RawFieldValue::Text(value.to_string())),
        Object::Real(value) => Some(RawFieldValue::Text(value.to_string())),
        Object::Boolean(value) => Some(RawFieldValue::Text(value.to_string())),
        Object::Null => None,
        other => {
            debug!(value = ?other, "unsupported field value type");
            None
        }
    }
}

/// UTF-16BE text (with its byte-order mark) or UTF-8. Anything else is left
/// for permissive decoding downstream.
fn decode_pdf_text(bytes: &[u8]) -> Option<String> {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn form_document(fields: Vec<Object>) -> Document {
        let mut document = Document::with_version("1.5");
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "AcroForm" => dictionary! { "Fields" => fields },
        });
        document.trailer.set("Root", catalog_id);
        document
    }

    #[test]
    fn reads_nested_fields_and_value_kinds() {
        let mut document = Document::with_version("1.5");
        let text = document.add_object(dictionary! {
            "T" => Object::string_literal("Text1"),
            "V" => Object::string_literal("BP-1042"),
        });
        let radio = document.add_object(dictionary! {
            "T" => Object::string_literal("RadioButton1"),
            "V" => "0",
            "Kids" => vec![Object::Dictionary(dictionary! { "AS" => "0" })],
        });
        let unicode = document.add_object(dictionary! {
            "T" => Object::string_literal("Name"),
            "V" => Object::String(
                vec![0xFE, 0xFF, 0x00, 0x41, 0x00, 0xE9],
                lopdf::StringFormat::Hexadecimal,
            ),
        });
        let untouched = document.add_object(dictionary! {
            "T" => Object::string_literal("Text9"),
        });
        let parent = document.add_object(dictionary! {
            "T" => Object::string_literal("Section"),
            "Kids" => vec![Object::Reference(unicode), Object::Reference(untouched)],
        });
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "AcroForm" => dictionary! {
                "Fields" => vec![
                    Object::Reference(text),
                    Object::Reference(radio),
                    Object::Reference(parent),
                ],
            },
        });
        document.trailer.set("Root", catalog_id);

        let fields = form_fields(&document, Path::new("form.pdf")).expect("fields");
        assert_eq!(fields["Text1"], FieldEntry::with_value("BP-1042"));
        assert_eq!(fields["RadioButton1"], FieldEntry::with_value("/0"));
        assert_eq!(fields["Name"], FieldEntry::with_value("A\u{e9}"));
        assert_eq!(fields["Text9"], FieldEntry::unset());
        assert!(fields.contains_key("Section"));
        assert_eq!(fields.len(), 5);
    }

    #[test]
    fn nested_fields_are_keyed_like_metadata_files() {
        let mut document = Document::with_version("1.5");
        let question = document.add_object(dictionary! {
            "T" => Object::string_literal("Q1_key"),
            "V" => Object::string_literal("Yes"),
        });
        let mapped = document.add_object(dictionary! {
            "T" => Object::string_literal("Text4"),
            "TM" => Object::string_literal("Q2_key"),
            "V" => "Off",
        });
        let page = document.add_object(dictionary! {
            "T" => Object::string_literal("Page1"),
            "Kids" => vec![Object::Reference(question), Object::Reference(mapped)],
        });
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "AcroForm" => dictionary! { "Fields" => vec![Object::Reference(page)] },
        });
        document.trailer.set("Root", catalog_id);

        let fields = form_fields(&document, Path::new("form.pdf")).expect("fields");
        let keys: Vec<_> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Page1", "Q1_key", "Q2_key"]);
        assert_eq!(fields["Q1_key"], FieldEntry::with_value("Yes"));
        assert_eq!(fields["Q2_key"], FieldEntry::with_value("/Off"));
    }

    #[test]
    fn non_utf8_strings_stay_as_bytes() {
        let field = Object::Dictionary(dictionary! {
            "T" => Object::string_literal("Text2"),
            "V" => Object::String(vec![0x41, 0xFF], lopdf::StringFormat::Literal),
        });
        let fields =
            form_fields(&form_document(vec![field]), Path::new("form.pdf")).expect("fields");
        assert_eq!(fields["Text2"], FieldEntry::with_value(vec![0x41_u8, 0xFF]));
    }

    #[test]
    fn documents_without_a_form_are_rejected() {
        let mut document = Document::with_version("1.5");
        let catalog_id = document.add_object(dictionary! { "Type" => "Catalog" });
        document.trailer.set("Root", catalog_id);

        let err = form_fields(&document, Path::new("plain.pdf")).expect_err("no form");
        assert!(matches!(err, FieldSourceError::MissingAcroForm { .. }));
    }

    #[test]
    fn field_dump_reads_json_map() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{"Text1": {"/V": "Yes"}, "Text2": {}}"#).expect("write dump");

        let fields = InputFormat::FieldDump
            .source()
            .read_fields(&path)
            .expect("dump parses");
        assert_eq!(fields["Text1"], FieldEntry::with_value("Yes"));
        assert_eq!(fields["Text2"], FieldEntry::unset());
    }
}
