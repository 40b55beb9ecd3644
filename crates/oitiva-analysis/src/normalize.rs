//! Turn model output into a schema-complete [`AnalysisResult`]

use oitiva_core::AnalysisResult;
use serde_json::Value;

use crate::error::AnalysisError;
use crate::extract::extract_json;

/// Extract, parse and normalize a raw model response.
///
/// Fails with [`AnalysisError::MalformedOutput`] carrying the raw response and
/// the extracted substring. A default result is never substituted.
pub fn parse_response(response: &str) -> Result<AnalysisResult, AnalysisError> {
    let extracted = extract_json(response);
    let malformed = |reason: String| AnalysisError::MalformedOutput {
        reason,
        raw: response.to_string(),
        extracted: extracted.clone(),
    };

    let value: Value = serde_json::from_str(&extracted).map_err(|e| malformed(e.to_string()))?;
    normalize(value).map_err(malformed)
}

/// Coerce a parsed JSON object into the result schema.
///
/// Missing or non-array list fields become `[]`, missing metadata becomes
/// `{}`. Only a non-object root is rejected.
pub fn normalize(value: Value) -> Result<AnalysisResult, String> {
    match value {
        Value::Object(_) => serde_json::from_value(value).map_err(|e| e.to_string()),
        other => Err(format!("expected a JSON object, found {}", kind(&other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_gets_every_field() {
        let result = normalize(json!({})).unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["metadata"], json!({}));
        for key in AnalysisResult::LIST_FIELDS {
            assert_eq!(value[key], json!([]), "{key}");
        }
    }

    #[test]
    fn test_wrong_types_become_empty_lists() {
        let result = normalize(json!({
            "metadata": { "processo": "0001234-56.2024.5.02.0001", "extra": [1, 2] },
            "depoentes": "d1, d2",
            "sinteses": null,
            "temas": { "tema": "horas extras" },
            "contradicoes": [{ "descricao": "datas divergentes" }]
        }))
        .unwrap();

        assert!(result.deponents.is_empty());
        assert!(result.syntheses.is_empty());
        assert!(result.topics.is_empty());
        assert_eq!(result.contradictions.len(), 1);
        assert_eq!(result.metadata["extra"], json!([1, 2]));
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        assert!(normalize(json!([])).unwrap_err().contains("an array"));
        assert!(normalize(json!("texto")).is_err());
    }

    #[test]
    fn test_parse_response_keeps_diagnostics() {
        let raw = "Sure! Here's your analysis: not json";
        match parse_response(raw).unwrap_err() {
            AnalysisError::MalformedOutput { raw: got, extracted, .. } => {
                assert_eq!(got, raw);
                assert_eq!(extracted, raw);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_response_rejects_truncated_json() {
        let raw = "```json\n{\"depoentes\": [{\"id\": \"d1\"}, {\"id\": \"d2\"}\n```";
        let err = parse_response(raw).unwrap_err();
        assert_eq!(err.raw_response(), Some(raw));
    }

    #[test]
    fn test_parse_response_wrapped_in_prose() {
        let raw = "Segue:\n```json\n{\"depoentes\": [{\"id\": \"d1\", \"nome\": \"Ana\"}]}\n```\nFim.";
        let result = parse_response(raw).unwrap();
        assert_eq!(result.deponent("d1").map(|d| d.nome.as_str()), Some("Ana"));
        assert!(result.credibility.is_empty());
    }
}
