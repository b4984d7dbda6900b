//! Instructions sent to the conversation coach.

use crate::analysis::{DEPTH_KEYS, RADAR_KEYS};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert communication coach. You analyze \
conversations for how openly and effectively the participants communicate, and you answer \
with a single JSON document and nothing else.";

/// Instruction placed before the transcript, describing the JSON shape to return.
pub fn analysis_instruction() -> String {
    let depth = DEPTH_KEYS
        .iter()
        .map(|key| format!("    \"{}\": \"<percentage, e.g. 20%>\"", key))
        .collect::<Vec<_>>()
        .join(",\n");
    let radar = RADAR_KEYS
        .iter()
        .map(|key| format!("    \"{}\": <score from 1 to 10>", key))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#"Analyze the conversation transcript below. Speakers are labelled in square brackets.

Classify each exchange into one of five depth levels (ritual, extrinsic, intrinsic, feelings,
feelings about the relationship) and report the share of the conversation at each level so that
the five percentages add up to 100%. Score the speakers on five communication dimensions from
1 to 10. List key recommendations with the most important first.

Return ONLY a JSON object with exactly this structure:
{{
  "conversation_summary": "<two or three sentences>",
  "communication_depth_distribution": {{
{depth}
  }},
  "pentagonal_radar_assessment": {{
{radar}
  }},
  "strengths_and_growth": {{
    "strengths": ["<strength>"],
    "growth_opportunities": ["<opportunity>"]
  }},
  "key_recommendations": ["<recommendation>"],
  "detailed_recommendations": [
    {{
      "title": "<title>",
      "current_pattern": "<what happens now>",
      "improvement_opportunity": "<what could change>",
      "example_reframing": {{"before": "<quote>", "after": "<reframed quote>"}},
      "benefits": "<why it helps>",
      "practice_suggestion": "<how to practice>"
    }}
  ],
  "strengths_assessment": [
    {{"strength": "<strength>", "effectiveness": "<how well it works>", "leverage": "<how to build on it>"}}
  ],
  "progress_metrics": ["<observable metric>"]
}}"#
    )
}
