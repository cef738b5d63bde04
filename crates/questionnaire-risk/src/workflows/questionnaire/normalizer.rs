use super::document::RawFieldValue;

/// Raw-table response for a field the respondent never touched.
pub const UNANSWERED_LABEL: &str = "Not Selected/ Not Answered";

/// Flattens a field value into text: byte payloads are decoded permissively
/// with line breaks removed, then a single leading selector slash is dropped.
/// Whitespace is left alone; trimming happens in [`canonicalize`].
pub fn normalize_raw_value(value: &RawFieldValue) -> String {
    match value {
        RawFieldValue::Text(text) => strip_selector(text).to_string(),
        RawFieldValue::Bytes(bytes) => {
            let decoded = decode_permissive(bytes).replace(['\r', '\n'], "");
            strip_selector(&decoded).to_string()
        }
    }
}

/// Decodes UTF-8, silently dropping invalid sequences.
pub fn decode_permissive(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

fn strip_selector(value: &str) -> &str {
    value.strip_prefix('/').unwrap_or(value)
}

/// Canonical response text. Must stay identical to the derivation used for
/// risk-table keys, otherwise joins silently miss.
pub fn canonicalize(text: &str) -> String {
    text.replace(['\u{2018}', '\u{2019}'], "'")
        .trim()
        .replace("N/A", "NA")
}

/// Key under which a response is stored in, and looked up from, the risk
/// profile table.
pub fn risk_lookup_key(text: &str) -> String {
    canonicalize(text).to_lowercase()
}

/// Empty responses and dash placeholders (`-`, `---`, ...) carry no answer.
pub fn is_unanswered(response: &str) -> bool {
    response.chars().all(|ch| ch == '-')
}
