//! Merge of coach output and emotion data into one [`AnalysisRecord`].
//!
//! Provider field names drift, so every recognized upstream name is mapped to its
//! canonical name here and nowhere else. Unknown fields are dropped.

use log::*;
use serde_json::{Map, Value};

use crate::analysis::{AnalysisRecord, EmotionEntry, EMOTION_FIELD};
use crate::error::Error;
use crate::validation::{missing_analysis_fields, validate_emotion_list};

/// Canonical top-level name and the upstream names accepted for it.
const TOP_LEVEL_ALIASES: &[(&str, &[&str])] = &[
    (
        "conversation_summary",
        &["summary", "conversationSummary", "overall_summary"],
    ),
    (
        "communication_depth_distribution",
        &[
            "depth_distribution",
            "communication_depth",
            "communicationDepthDistribution",
        ],
    ),
    (
        "pentagonal_radar_assessment",
        &[
            "radar_assessment",
            "pentagonal_radar",
            "pentagonalRadarAssessment",
        ],
    ),
    (
        "strengths_and_growth",
        &["strengths_and_growth_opportunities", "strengthsAndGrowth"],
    ),
    (
        "key_recommendations",
        &[
            "key_recommendations_overview",
            "recommendations",
            "keyRecommendations",
        ],
    ),
    (
        "detailed_recommendations",
        &["detailedRecommendations", "recommendation_details"],
    ),
    (
        "strengths_assessment",
        &["strength_assessment", "strengthsAssessment"],
    ),
    ("progress_metrics", &["metrics", "progressMetrics"]),
    (
        EMOTION_FIELD,
        &["emotions", "emotion_quintiles", "emotionAnalysis"],
    ),
];

const DEPTH_ALIASES: &[(&str, &[&str])] = &[
    ("level_1_ritual", &["level_1", "level1", "ritual"]),
    ("level_2_extrinsic", &["level_2", "level2", "extrinsic"]),
    ("level_3_intrinsic", &["level_3", "level3", "intrinsic"]),
    ("level_4_feelings", &["level_4", "level4", "feelings"]),
    (
        "level_5_feelings_about_relationship",
        &["level_5", "level5", "feelings_about_relationship"],
    ),
];

const RADAR_ALIASES: &[(&str, &[&str])] = &[
    ("active_listening", &["activeListening", "listening"]),
    ("emotional_awareness", &["emotionalAwareness"]),
    ("clarity_of_expression", &["clarity", "clarityOfExpression"]),
    (
        "ownership_of_experience",
        &["ownership", "ownershipOfExperience"],
    ),
    ("curiosity", &["curiosity_and_openness"]),
];

const STRENGTHS_AND_GROWTH_ALIASES: &[(&str, &[&str])] = &[
    ("strengths", &["key_strengths"]),
    (
        "growth_opportunities",
        &["growth_areas", "areas_for_growth", "growthOpportunities"],
    ),
];

const EMOTION_ENTRY_ALIASES: &[(&str, &[&str])] = &[
    ("speaker", &["speaker_id", "speakerId"]),
    ("quintile", &["quintile_index", "quintileIndex"]),
    ("main_emotion", &["dominant_emotion", "emotion", "mainEmotion"]),
];

/// Result of a successful merge plus anything that was dropped along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub record: AnalysisRecord,
    pub warnings: Vec<String>,
}

/// Rename recognized aliases of an analysis document to their canonical names.
///
/// A canonical key already present wins over any alias. Nested depth, radar and
/// strengths sections are normalized the same way.
pub fn normalize_analysis(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return value.clone();
    };

    let mut normalized = apply_aliases(object, TOP_LEVEL_ALIASES);
    for (field, aliases) in [
        ("communication_depth_distribution", DEPTH_ALIASES),
        ("pentagonal_radar_assessment", RADAR_ALIASES),
        ("strengths_and_growth", STRENGTHS_AND_GROWTH_ALIASES),
    ] {
        if let Some(Value::Object(section)) = normalized.get(field) {
            let section = apply_aliases(section, aliases);
            normalized.insert(field.to_string(), Value::Object(section));
        }
    }
    if let Some(emotions) = normalized.get(EMOTION_FIELD) {
        let emotions = normalize_emotion_list(emotions);
        normalized.insert(EMOTION_FIELD.to_string(), emotions);
    }

    Value::Object(normalized)
}

/// Rename recognized aliases inside every element of an emotion list.
pub fn normalize_emotion_list(value: &Value) -> Value {
    match value {
        Value::Array(entries) => Value::Array(
            entries
                .iter()
                .map(|entry| match entry {
                    Value::Object(fields) => {
                        Value::Object(apply_aliases(fields, EMOTION_ENTRY_ALIASES))
                    }
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Combine the coach's analysis with an optional emotion list.
///
/// Emotion data is an enhancement: an absent or invalid list yields an empty
/// `emotion_analysis` and a warning, never an error. A coach document missing a
/// required field, or whose sections have the wrong shape, fails the merge.
pub fn merge(coach_output: &Value, emotion_output: Option<&Value>) -> Result<Merged, Error> {
    let mut analysis = normalize_analysis(coach_output);

    let missing = missing_analysis_fields(&analysis);
    if !missing.is_empty() {
        return Err(Error::merge(format!(
            "coach output is missing or has invalid {}",
            missing.join(", ")
        )));
    }

    let mut warnings = Vec::new();
    let emotion_analysis = match emotion_output {
        None => Vec::new(),
        Some(list) => match emotion_entries(list) {
            Ok(entries) => entries,
            Err(reason) => {
                warn!("Dropping emotion data: {}", reason);
                warnings.push(format!("Emotion data ignored: {}", reason));
                Vec::new()
            }
        },
    };

    if let Some(object) = analysis.as_object_mut() {
        object.remove(EMOTION_FIELD);
    }
    let mut record: AnalysisRecord = serde_json::from_value(analysis)
        .map_err(|e| Error::merge(format!("coach output has an unexpected shape: {}", e)))?;
    record.emotion_analysis = emotion_analysis;

    Ok(Merged { record, warnings })
}

/// Turn a validated emotion list into typed entries.
///
/// Quintiles must be whole numbers from 1 to 5.
pub fn emotion_entries(value: &Value) -> Result<Vec<EmotionEntry>, String> {
    let normalized = normalize_emotion_list(value);
    if !validate_emotion_list(&normalized) {
        return Err(
            "does not match the required emotion structure (speaker, quintile, main_emotion)"
                .to_string(),
        );
    }

    let mut entries = Vec::new();
    for entry in normalized.as_array().into_iter().flatten() {
        let quintile = entry
            .get("quintile")
            .and_then(Value::as_f64)
            .filter(|q| q.fract() == 0.0 && (1.0..=5.0).contains(q))
            .ok_or_else(|| format!("quintile {} is not between 1 and 5", entry["quintile"]))?;

        entries.push(EmotionEntry {
            speaker: entry["speaker"].as_str().unwrap_or_default().to_string(),
            quintile: quintile as u8,
            main_emotion: entry["main_emotion"].as_str().unwrap_or_default().to_string(),
        });
    }
    Ok(entries)
}

fn apply_aliases(object: &Map<String, Value>, table: &[(&str, &[&str])]) -> Map<String, Value> {
    let mut normalized = object.clone();
    for (canonical, aliases) in table {
        for alias in aliases.iter() {
            if let Some(value) = normalized.remove(*alias) {
                if !normalized.contains_key(*canonical) {
                    debug!("Mapping upstream field {} to {}", alias, canonical);
                    normalized.insert(canonical.to_string(), value);
                }
            }
        }
    }
    normalized
}
