//! Types for transcription operations.

use serde::{Deserialize, Serialize};

/// Continuous speech segment (utterance) from a single speaker.
///
/// Represents natural speaking turns in conversation with speaker diarization.
/// Downstream stages only rely on the `(speaker, text)` grouping; timing is kept
/// for providers that return it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub speaker: String,
    pub text: String,
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

impl Segment {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            start_ms: None,
            end_ms: None,
        }
    }
}

/// Speaker-attributed, time-ordered transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<Segment>,
    pub language_code: Option<String>,
}

impl Transcript {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            language_code: None,
        }
    }

    /// True when no segment carries any non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }

    /// Distinct speakers in order of first appearance.
    pub fn speakers(&self) -> Vec<&str> {
        let mut speakers: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if !speakers.contains(&segment.speaker.as_str()) {
                speakers.push(segment.speaker.as_str());
            }
        }
        speakers
    }
}

/// Configuration for a transcription request.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider model identifier (e.g. "best").
    pub model: String,
    pub language_code: Option<String>,
    pub enable_speaker_labels: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "best".to_string(),
            language_code: None,
            enable_speaker_labels: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speakers_in_first_appearance_order() {
        let transcript = Transcript::new(vec![
            Segment::new("B", "hi"),
            Segment::new("A", "hello"),
            Segment::new("B", "how are you"),
        ]);
        assert_eq!(transcript.speakers(), vec!["B", "A"]);
    }

    #[test]
    fn test_whitespace_only_transcript_is_empty() {
        let transcript = Transcript::new(vec![Segment::new("A", "  \n")]);
        assert!(transcript.is_empty());
        assert!(Transcript::default().is_empty());
    }
}
