//! The canonical analysis record produced for every completed job.
//!
//! The serialized form of [`AnalysisRecord`] is both the archive format and the shape
//! accepted on the direct JSON upload path, so the two are interchangeable.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Required top-level fields, in canonical order.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "conversation_summary",
    "communication_depth_distribution",
    "pentagonal_radar_assessment",
    "strengths_and_growth",
    "key_recommendations",
    "detailed_recommendations",
    "strengths_assessment",
    "progress_metrics",
];

pub const EMOTION_FIELD: &str = "emotion_analysis";

pub const DEPTH_KEYS: [&str; 5] = [
    "level_1_ritual",
    "level_2_extrinsic",
    "level_3_intrinsic",
    "level_4_feelings",
    "level_5_feelings_about_relationship",
];

pub const RADAR_KEYS: [&str; 5] = [
    "active_listening",
    "emotional_awareness",
    "clarity_of_expression",
    "ownership_of_experience",
    "curiosity",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisRecord {
    pub conversation_summary: String,
    pub communication_depth_distribution: DepthDistribution,
    pub pentagonal_radar_assessment: RadarAssessment,
    pub strengths_and_growth: StrengthsAndGrowth,
    pub key_recommendations: Vec<String>,
    pub detailed_recommendations: Vec<DetailedRecommendation>,
    pub strengths_assessment: Vec<StrengthAssessment>,
    pub progress_metrics: Vec<String>,
    /// One entry per (speaker, quintile); empty when no emotion data was available.
    #[serde(default)]
    pub emotion_analysis: Vec<EmotionEntry>,
}

/// Share of the conversation spent at each depth level, as percentage strings ("25%").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DepthDistribution {
    #[serde(deserialize_with = "percentage")]
    pub level_1_ritual: String,
    #[serde(deserialize_with = "percentage")]
    pub level_2_extrinsic: String,
    #[serde(deserialize_with = "percentage")]
    pub level_3_intrinsic: String,
    #[serde(deserialize_with = "percentage")]
    pub level_4_feelings: String,
    #[serde(deserialize_with = "percentage")]
    pub level_5_feelings_about_relationship: String,
}

impl DepthDistribution {
    pub fn values(&self) -> [&str; 5] {
        [
            &self.level_1_ritual,
            &self.level_2_extrinsic,
            &self.level_3_intrinsic,
            &self.level_4_feelings,
            &self.level_5_feelings_about_relationship,
        ]
    }
}

/// Scores on the five communication dimensions, expected within 1-10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RadarAssessment {
    pub active_listening: f64,
    pub emotional_awareness: f64,
    pub clarity_of_expression: f64,
    pub ownership_of_experience: f64,
    pub curiosity: f64,
}

impl RadarAssessment {
    pub fn values(&self) -> [f64; 5] {
        [
            self.active_listening,
            self.emotional_awareness,
            self.clarity_of_expression,
            self.ownership_of_experience,
            self.curiosity,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StrengthsAndGrowth {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub growth_opportunities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct DetailedRecommendation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_opportunity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_reframing: Option<ExampleReframing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ExampleReframing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct StrengthAssessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effectiveness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverage: Option<String>,
}

/// Dominant emotion of one speaker during one fifth of their utterances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmotionEntry {
    pub speaker: String,
    /// 1 through 5.
    pub quintile: u8,
    pub main_emotion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Priority {
    High,
    Medium,
}

/// A key recommendation with the priority implied by its position. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PrioritizedRecommendation {
    pub priority: Priority,
    pub recommendation: String,
}

impl AnalysisRecord {
    /// Key recommendations paired with the priority implied by their position.
    pub fn prioritized_recommendations(&self) -> Vec<PrioritizedRecommendation> {
        self.key_recommendations
            .iter()
            .enumerate()
            .map(|(index, text)| PrioritizedRecommendation {
                priority: priority_for(index),
                recommendation: text.clone(),
            })
            .collect()
    }

    /// Distinct speakers present in `emotion_analysis`, in first-seen order.
    pub fn emotion_speakers(&self) -> Vec<&str> {
        let mut speakers: Vec<&str> = Vec::new();
        for entry in &self.emotion_analysis {
            if !speakers.contains(&entry.speaker.as_str()) {
                speakers.push(entry.speaker.as_str());
            }
        }
        speakers
    }
}

/// First two recommendations are `High`, everything after is `Medium`.
pub fn priority_for(index: usize) -> Priority {
    if index < 2 {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Normalize a depth value to a percentage string; accepts `25`, `25.5`, `"25"` or `"25%"`.
fn percentage<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => format_percentage(n),
        Raw::Text(text) => {
            let trimmed = text.trim();
            match trimmed.parse::<f64>() {
                Ok(n) => format_percentage(n),
                Err(_) => trimmed.to_string(),
            }
        }
    })
}

fn format_percentage(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}%", n as i64)
    } else {
        format!("{}%", n)
    }
}

/// Numeric part of a percentage string, `"25%"` -> `25.0`.
pub fn parse_percentage(value: &str) -> Option<f64> {
    value.trim().trim_end_matches('%').trim().parse().ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// A complete coach output with every required field populated.
    pub(crate) fn sample_analysis() -> Value {
        json!({
            "conversation_summary": "Two colleagues plan a product launch.",
            "communication_depth_distribution": {
                "level_1_ritual": "10%",
                "level_2_extrinsic": "40%",
                "level_3_intrinsic": "30%",
                "level_4_feelings": "15%",
                "level_5_feelings_about_relationship": "5%"
            },
            "pentagonal_radar_assessment": {
                "active_listening": 7,
                "emotional_awareness": 6.5,
                "clarity_of_expression": 8,
                "ownership_of_experience": 5,
                "curiosity": 6
            },
            "strengths_and_growth": {
                "strengths": ["Clear structure"],
                "growth_opportunities": ["Ask more open questions"]
            },
            "key_recommendations": ["Pause before answering", "Name feelings", "Summarize"],
            "detailed_recommendations": [{
                "title": "Reflect back",
                "current_pattern": "Jumps to solutions",
                "improvement_opportunity": "Mirror the concern first",
                "example_reframing": {"before": "Just do X", "after": "It sounds like X worries you"},
                "benefits": "Builds trust",
                "practice_suggestion": "Use one reflection per meeting"
            }],
            "strengths_assessment": [{
                "strength": "Preparation",
                "effectiveness": "High",
                "leverage": "Share agendas early"
            }],
            "progress_metrics": ["Number of open questions per meeting"]
        })
    }

    #[test]
    fn test_deserializes_sample_without_emotions() {
        let record: AnalysisRecord = serde_json::from_value(sample_analysis()).unwrap();
        assert!(record.emotion_analysis.is_empty());
        assert_eq!(record.pentagonal_radar_assessment.emotional_awareness, 6.5);
        assert_eq!(record.communication_depth_distribution.level_2_extrinsic, "40%");
    }

    #[test]
    fn test_numeric_depth_values_become_percent_strings() {
        let mut value = sample_analysis();
        value["communication_depth_distribution"]["level_1_ritual"] = json!(12);
        value["communication_depth_distribution"]["level_3_intrinsic"] = json!("28");
        value["communication_depth_distribution"]["level_4_feelings"] = json!(12.5);

        let record: AnalysisRecord = serde_json::from_value(value).unwrap();
        let depth = &record.communication_depth_distribution;
        assert_eq!(depth.level_1_ritual, "12%");
        assert_eq!(depth.level_3_intrinsic, "28%");
        assert_eq!(depth.level_4_feelings, "12.5%");
    }

    #[test]
    fn test_canonical_json_round_trip_keeps_all_sections() {
        let record: AnalysisRecord = serde_json::from_value(sample_analysis()).unwrap();
        let serialized = serde_json::to_value(&record).unwrap();

        for field in REQUIRED_FIELDS {
            assert!(serialized.get(field).is_some(), "{field} missing");
        }
        assert_eq!(serialized[EMOTION_FIELD], json!([]));

        let reparsed: AnalysisRecord = serde_json::from_value(serialized).unwrap();
        assert_eq!(reparsed, record);
    }

    #[test]
    fn test_priority_is_derived_from_position() {
        let record: AnalysisRecord = serde_json::from_value(sample_analysis()).unwrap();
        let priorities: Vec<Priority> = record
            .prioritized_recommendations()
            .into_iter()
            .map(|item| item.priority)
            .collect();
        assert_eq!(
            priorities,
            vec![Priority::High, Priority::High, Priority::Medium]
        );
        assert_eq!(
            serde_json::to_value(&record.prioritized_recommendations()[2]).unwrap(),
            json!({"priority": "Medium", "recommendation": "Summarize"})
        );
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("25%"), Some(25.0));
        assert_eq!(parse_percentage(" 12.5 % "), Some(12.5));
        assert_eq!(parse_percentage("about a quarter"), None);
    }
}
