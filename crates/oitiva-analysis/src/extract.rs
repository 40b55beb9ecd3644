//! JSON extraction from free-form model output

/// Pull the JSON object out of a model response.
///
/// Code-fence markers are stripped first, then the text between the first
/// `{` and the last `}` is taken. Without such a pair the cleaned text is
/// returned unchanged and will fail to parse.
pub fn extract_json(response: &str) -> String {
    let cleaned = strip_code_fences(response);
    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => cleaned[start..=end].to_string(),
        _ => cleaned.trim().to_string(),
    }
}

/// Remove ``` fence markers, along with a `json` language tag
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
}
