//! Structural validation of analysis and emotion JSON.
//!
//! Validation here is intentionally shallow: presence and primitive type of the
//! required fields only. Element shapes, ranges and cross-field sums are not checked,
//! except by the opt-in strict mode.

use serde_json::Value;

use crate::analysis::{
    parse_percentage, AnalysisRecord, DEPTH_KEYS, RADAR_KEYS, REQUIRED_FIELDS,
};

/// Allowed deviation of the depth percentages from 100 in strict mode.
const DEPTH_SUM_TOLERANCE: f64 = 5.0;
const RADAR_MIN: f64 = 1.0;
const RADAR_MAX: f64 = 10.0;

/// True when `candidate` carries every required field, depth level and radar score.
pub fn validate_analysis(candidate: &Value) -> bool {
    missing_analysis_fields(candidate).is_empty()
}

/// Names of the required fields that are absent, empty or mistyped.
///
/// Top-level and depth fields must be present and non-empty (`null`, `""`, `0`,
/// `false`, `[]` and `{}` count as empty); radar scores must be numbers.
/// Nested names are reported as `parent.child`.
pub fn missing_analysis_fields(candidate: &Value) -> Vec<String> {
    let Some(object) = candidate.as_object() else {
        return REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect();
    };

    let mut missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !object.get(**field).is_some_and(is_truthy))
        .map(|field| field.to_string())
        .collect();

    if let Some(depth) = object.get("communication_depth_distribution") {
        missing.extend(
            DEPTH_KEYS
                .iter()
                .filter(|key| !depth.get(**key).is_some_and(is_truthy))
                .map(|key| format!("communication_depth_distribution.{}", key)),
        );
    }

    if let Some(radar) = object.get("pentagonal_radar_assessment") {
        missing.extend(
            RADAR_KEYS
                .iter()
                .filter(|key| !radar.get(**key).is_some_and(Value::is_number))
                .map(|key| format!("pentagonal_radar_assessment.{}", key)),
        );
    }

    missing
}

/// True when `candidate` is an array whose elements all carry a string `speaker`,
/// a numeric `quintile` and a string `main_emotion`. An empty array is valid.
pub fn validate_emotion_list(candidate: &Value) -> bool {
    let Some(entries) = candidate.as_array() else {
        return false;
    };

    entries.iter().all(|entry| {
        entry.get("speaker").is_some_and(Value::is_string)
            && entry.get("quintile").is_some_and(Value::is_number)
            && entry.get("main_emotion").is_some_and(Value::is_string)
    })
}

/// Semantic checks enabled by strict validation: depth percentages sum to about 100
/// and radar scores lie within 1-10. Returns one message per violation.
pub fn strict_violations(record: &AnalysisRecord) -> Vec<String> {
    let mut violations = Vec::new();

    let depth = &record.communication_depth_distribution;
    let parsed: Vec<Option<f64>> = depth.values().iter().map(|v| parse_percentage(v)).collect();
    for (key, value) in DEPTH_KEYS.iter().zip(parsed.iter()) {
        if value.is_none() {
            violations.push(format!(
                "communication_depth_distribution.{} is not a percentage",
                key
            ));
        }
    }
    if parsed.iter().all(Option::is_some) {
        let sum: f64 = parsed.iter().flatten().sum();
        if (sum - 100.0).abs() > DEPTH_SUM_TOLERANCE {
            violations.push(format!(
                "communication_depth_distribution sums to {}%, expected 100%",
                sum
            ));
        }
    }

    let radar = record.pentagonal_radar_assessment.values();
    for (key, score) in RADAR_KEYS.iter().zip(radar.iter()) {
        if !(RADAR_MIN..=RADAR_MAX).contains(score) {
            violations.push(format!(
                "pentagonal_radar_assessment.{} = {} is outside {}-{}",
                key, score, RADAR_MIN, RADAR_MAX
            ));
        }
    }

    violations
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_analysis;
    use serde_json::json;

    #[test]
    fn test_complete_analysis_is_valid() {
        assert!(validate_analysis(&sample_analysis()));
    }

    #[test]
    fn test_each_missing_top_level_field_invalidates() {
        for field in REQUIRED_FIELDS {
            let mut value = sample_analysis();
            value.as_object_mut().unwrap().remove(field);
            assert!(!validate_analysis(&value), "{field} should be required");
            assert!(missing_analysis_fields(&value).contains(&field.to_string()));
        }
    }

    #[test]
    fn test_each_missing_depth_and_radar_key_invalidates() {
        for key in DEPTH_KEYS {
            let mut value = sample_analysis();
            value["communication_depth_distribution"]
                .as_object_mut()
                .unwrap()
                .remove(key);
            assert_eq!(
                missing_analysis_fields(&value),
                vec![format!("communication_depth_distribution.{key}")]
            );
        }
        for key in RADAR_KEYS {
            let mut value = sample_analysis();
            value["pentagonal_radar_assessment"]
                .as_object_mut()
                .unwrap()
                .remove(key);
            assert!(!validate_analysis(&value), "{key} should be required");
        }
    }

    #[test]
    fn test_empty_values_are_not_truthy() {
        let mut value = sample_analysis();
        value["progress_metrics"] = json!([]);
        value["conversation_summary"] = json!("");
        value["communication_depth_distribution"]["level_5_feelings_about_relationship"] =
            json!(0);

        assert_eq!(
            missing_analysis_fields(&value),
            vec![
                "conversation_summary".to_string(),
                "progress_metrics".to_string(),
                "communication_depth_distribution.level_5_feelings_about_relationship"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_radar_scores_must_be_numbers() {
        let mut value = sample_analysis();
        value["pentagonal_radar_assessment"]["curiosity"] = json!("6");
        assert!(!validate_analysis(&value));

        value["pentagonal_radar_assessment"]["curiosity"] = json!(true);
        assert!(!validate_analysis(&value));

        // Zero is a number, so it passes even though it is outside the expected range.
        value["pentagonal_radar_assessment"]["curiosity"] = json!(0);
        assert!(validate_analysis(&value));
    }

    #[test]
    fn test_non_object_reports_every_field() {
        assert_eq!(missing_analysis_fields(&json!([1, 2])).len(), REQUIRED_FIELDS.len());
    }

    #[test]
    fn test_emotion_list_validation() {
        assert!(validate_emotion_list(&json!([])));
        assert!(validate_emotion_list(&json!([
            {"speaker": "A", "quintile": 1, "main_emotion": "Joy"},
            {"speaker": "B", "quintile": 2.0, "main_emotion": "Calmness"}
        ])));

        assert!(!validate_emotion_list(&json!({"speaker": "A"})));
        assert!(!validate_emotion_list(&json!([
            {"speaker": "A", "quintile": "1", "main_emotion": "Joy"}
        ])));
        assert!(!validate_emotion_list(&json!([
            {"speaker": "A", "quintile": 1}
        ])));
        assert!(!validate_emotion_list(&json!([
            {"speaker": 7, "quintile": 1, "main_emotion": "Joy"}
        ])));
    }

    #[test]
    fn test_strict_mode_flags_sum_and_range() {
        let mut value = sample_analysis();
        value["communication_depth_distribution"]["level_1_ritual"] = json!("50%");
        value["pentagonal_radar_assessment"]["curiosity"] = json!(11);
        let record: AnalysisRecord = serde_json::from_value(value).unwrap();

        let violations = strict_violations(&record);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("sums to 140%"));
        assert!(violations[1].contains("curiosity"));
    }

    #[test]
    fn test_strict_mode_accepts_sample() {
        let record: AnalysisRecord = serde_json::from_value(sample_analysis()).unwrap();
        assert!(strict_violations(&record).is_empty());
    }
}
