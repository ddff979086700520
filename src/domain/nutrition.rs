use crate::domain::numeric::lenient_number;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

const DEFAULT_CALORIES: f64 = 300.0;
const DEFAULT_PROTEIN: f64 = 12.0;
const DEFAULT_CARBS: f64 = 45.0;
const DEFAULT_FAT: f64 = 8.0;
const DEFAULT_FIBER: f64 = 5.0;
const DEFAULT_CONFIDENCE: f64 = 0.7;
const DEFAULT_FOOD_NAME: &str = "Unknown Indian Food";
const DEFAULT_PORTION: &str = "1 serving";
const DEFAULT_DESCRIPTION: &str = "AI analyzed Indian food";

/// Nutrition estimate for a single photographed dish. Every field is always
/// populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionEstimate {
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    /// Descriptive serving text such as "1 bowl (250g)".
    pub portion_size: String,
    pub description: String,
    pub confidence: f64,
}

#[derive(Debug, Error)]
#[error("model reply is not valid JSON: {0}")]
pub struct ParseError(#[from] serde_json::Error);

pub type Candidate = Map<String, Value>;

/// Turns free-form model output into a complete estimate. Never fails.
pub fn normalize(raw_text: &str) -> NutritionEstimate {
    let candidate = match try_parse(extract_json_object(raw_text)) {
        Ok(candidate) => candidate,
        Err(err) => {
            tracing::warn!("Falling back to default nutrition record: {}", err);
            fallback_candidate()
        }
    };
    sanitize(&candidate)
}

/// Greedy slice from the first `{` to the last `}`; the whole text when no
/// such pair exists.
pub fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Strict parse. Valid JSON that is not an object yields an empty candidate.
pub fn try_parse(text: &str) -> Result<Candidate, ParseError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

pub fn fallback_candidate() -> Candidate {
    let value = json!({
        "foodName": "Indian Food Item",
        "calories": 300,
        "protein": 12.0,
        "carbs": 45.0,
        "fat": 8.0,
        "fiber": 5.0,
        "portionSize": "1 serving",
        "description": "AI analysis completed but response format needs adjustment",
        "confidence": 0.6
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn sanitize(candidate: &Candidate) -> NutritionEstimate {
    NutritionEstimate {
        food_name: text_field(candidate, "foodName", DEFAULT_FOOD_NAME),
        calories: numeric_field(candidate, "calories", DEFAULT_CALORIES),
        protein: numeric_field(candidate, "protein", DEFAULT_PROTEIN),
        carbs: numeric_field(candidate, "carbs", DEFAULT_CARBS),
        fat: numeric_field(candidate, "fat", DEFAULT_FAT),
        fiber: numeric_field(candidate, "fiber", DEFAULT_FIBER),
        portion_size: text_field(candidate, "portionSize", DEFAULT_PORTION),
        description: text_field(candidate, "description", DEFAULT_DESCRIPTION),
        confidence: numeric_field(candidate, "confidence", DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
    }
}

// Zero counts as missing, same as an absent or unreadable value.
fn numeric_field(candidate: &Candidate, key: &str, default: f64) -> f64 {
    candidate
        .get(key)
        .and_then(lenient_number)
        .filter(|v| *v != 0.0)
        .unwrap_or(default)
}

fn text_field(candidate: &Candidate, key: &str, default: &str) -> String {
    match candidate.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) if n.as_f64().is_some_and(|v| v != 0.0) => n.to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback_estimate() -> NutritionEstimate {
        NutritionEstimate {
            food_name: "Indian Food Item".into(),
            calories: 300.0,
            protein: 12.0,
            carbs: 45.0,
            fat: 8.0,
            fiber: 5.0,
            portion_size: "1 serving".into(),
            description: "AI analysis completed but response format needs adjustment".into(),
            confidence: 0.6,
        }
    }

    #[test]
    fn test_extracts_json_embedded_in_prose() {
        let raw = r#"Sure! {"foodName":"Dal Rice","calories":350,"protein":14,"carbs":60,"fat":6,"fiber":7,"portionSize":"1 plate","description":"Yellow dal with steamed rice","confidence":0.85} Thanks"#;
        let estimate = normalize(raw);
        assert_eq!(estimate.food_name, "Dal Rice");
        assert_eq!(estimate.calories, 350.0);
        assert_eq!(estimate.protein, 14.0);
        assert_eq!(estimate.portion_size, "1 plate");
        assert_eq!(estimate.confidence, 0.85);
    }

    #[test]
    fn test_code_fenced_reply() {
        let raw = "```json\n{\"foodName\": \"Masala Dosa\", \"calories\": 420}\n```";
        let estimate = normalize(raw);
        assert_eq!(estimate.food_name, "Masala Dosa");
        assert_eq!(estimate.calories, 420.0);
        assert_eq!(estimate.fat, DEFAULT_FAT);
        assert_eq!(estimate.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_malformed_json_gives_fallback_record() {
        assert_eq!(normalize("{\"foodName\": \"Idli\", calories: }"), fallback_estimate());
        assert_eq!(normalize("I could not identify this dish."), fallback_estimate());
        assert_eq!(normalize(""), fallback_estimate());
        assert_eq!(normalize("} backwards {"), fallback_estimate());
    }

    #[test]
    fn test_missing_and_bad_numeric_fields_use_defaults() {
        let raw = r#"{"foodName":"Samosa","calories":"lots","protein":null,"carbs":0,"fat":"9.5 g"}"#;
        let estimate = normalize(raw);
        assert_eq!(estimate.calories, DEFAULT_CALORIES);
        assert_eq!(estimate.protein, DEFAULT_PROTEIN);
        assert_eq!(estimate.carbs, DEFAULT_CARBS);
        assert_eq!(estimate.fat, 9.5);
        assert_eq!(estimate.fiber, DEFAULT_FIBER);
        assert_eq!(estimate.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_empty_strings_use_defaults() {
        let estimate = normalize(r#"{"foodName":"","portionSize":"","description":""}"#);
        assert_eq!(estimate.food_name, DEFAULT_FOOD_NAME);
        assert_eq!(estimate.portion_size, DEFAULT_PORTION);
        assert_eq!(estimate.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_non_object_json_yields_defaults() {
        let estimate = normalize("42");
        assert_eq!(estimate.food_name, DEFAULT_FOOD_NAME);
        assert_eq!(estimate.calories, DEFAULT_CALORIES);
        assert_eq!(estimate.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(normalize(r#"{"confidence": 85}"#).confidence, 1.0);
        assert_eq!(normalize(r#"{"confidence": -0.2}"#).confidence, 0.0);
    }

    #[test]
    fn test_try_parse_reports_error() {
        assert!(try_parse("{not json}").is_err());
        assert!(try_parse("{}").is_ok_and(|c| c.is_empty()));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = r#"noise {"foodName":"Poha","calories":250} noise"#;
        let first = serde_json::to_string(&normalize(raw)).unwrap();
        let second = serde_json::to_string(&normalize(raw)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(fallback_estimate()).unwrap();
        assert_eq!(value["foodName"], "Indian Food Item");
        assert_eq!(value["portionSize"], "1 serving");
    }
}
