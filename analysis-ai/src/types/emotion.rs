//! Types for emotion inference operations.

use serde::{Deserialize, Serialize};

use super::media::Audio;
use super::transcription::Segment;

/// One named emotion with its intensity as scored by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub name: String,
    pub score: f64,
}

/// Multi-emotion score vector for a single utterance.
///
/// Utterances are returned in conversation order; `speaker` matches the
/// transcript's speaker label in text mode and the provider's speaker id in audio mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtteranceEmotions {
    pub speaker: String,
    pub text: Option<String>,
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
    pub emotions: Vec<EmotionScore>,
}

impl UtteranceEmotions {
    /// Highest-scoring emotion of this utterance.
    pub fn dominant(&self) -> Option<&EmotionScore> {
        self.emotions
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// What the emotion provider is asked to score.
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    /// Already-transcribed utterances; scored with the provider's language model.
    Text(&'a [Segment]),
    /// Raw audio; scored with the provider's prosody model and its own diarization.
    Audio(&'a Audio),
}

impl Input<'_> {
    pub fn mode(&self) -> &'static str {
        match self {
            Input::Text(_) => "text",
            Input::Audio(_) => "audio",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_picks_highest_score() {
        let utterance = UtteranceEmotions {
            speaker: "A".to_string(),
            text: None,
            start_ms: None,
            end_ms: None,
            emotions: vec![
                EmotionScore {
                    name: "Calmness".to_string(),
                    score: 0.4,
                },
                EmotionScore {
                    name: "Joy".to_string(),
                    score: 0.7,
                },
            ],
        };
        assert_eq!(utterance.dominant().map(|e| e.name.as_str()), Some("Joy"));
    }
}
