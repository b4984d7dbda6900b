//! Bucketing of per-utterance emotion scores into quintiles per speaker.
//!
//! Each speaker's utterances, in conversation order, are split into five contiguous
//! groups of (nearly) equal size by position. With fewer than five utterances the
//! groups overlap so every speaker still gets five buckets. Within a bucket each
//! emotion's score is averaged over the bucket's utterances and the highest average
//! wins; ties go to the alphabetically first emotion name.

use std::collections::BTreeMap;

use analysis_ai::types::emotion::{EmotionScore, UtteranceEmotions};

use crate::analysis::EmotionEntry;

pub const QUINTILES: usize = 5;
const TOP_EMOTIONS: usize = 5;

/// Dominant emotion of one speaker in one quintile, with the supporting scores.
#[derive(Debug, Clone, PartialEq)]
pub struct QuintileEmotion {
    pub speaker: String,
    /// 1 through 5.
    pub quintile: u8,
    pub main_emotion: String,
    /// Mean score of `main_emotion` over the bucket.
    pub score: f64,
    /// Up to five highest mean scores in the bucket, best first.
    pub top_emotions: Vec<EmotionScore>,
}

impl QuintileEmotion {
    /// One-line summary of the bucket, e.g. `A q1: Joy 0.800 [Joy 0.800, Calmness 0.400]`.
    pub fn describe(&self) -> String {
        let top = self
            .top_emotions
            .iter()
            .map(|e| format!("{} {:.3}", e.name, e.score))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} q{}: {} {:.3} [{}]",
            self.speaker, self.quintile, self.main_emotion, self.score, top
        )
    }
}

impl From<QuintileEmotion> for EmotionEntry {
    fn from(q: QuintileEmotion) -> Self {
        EmotionEntry {
            speaker: q.speaker,
            quintile: q.quintile,
            main_emotion: q.main_emotion,
        }
    }
}

/// Half-open utterance index range covered by `quintile` (0-based) out of `count` utterances.
pub fn bucket_range(quintile: usize, count: usize) -> std::ops::Range<usize> {
    let start = (quintile * count / QUINTILES).min(count.saturating_sub(1));
    let end = ((quintile + 1) * count / QUINTILES).max(start + 1).min(count);
    start..end
}

/// Analyze utterances of all speakers, speakers in order of first appearance.
///
/// Buckets whose utterances carry no scores at all are skipped.
pub fn analyze(utterances: &[UtteranceEmotions]) -> Vec<QuintileEmotion> {
    let mut speakers: Vec<&str> = Vec::new();
    for utterance in utterances {
        if !speakers.contains(&utterance.speaker.as_str()) {
            speakers.push(utterance.speaker.as_str());
        }
    }

    let mut results = Vec::new();
    for speaker in speakers {
        let own: Vec<&UtteranceEmotions> = utterances
            .iter()
            .filter(|u| u.speaker == speaker)
            .collect();

        for quintile in 0..QUINTILES {
            let bucket = &own[bucket_range(quintile, own.len())];
            if let Some(result) = dominant(speaker, quintile, bucket) {
                results.push(result);
            }
        }
    }
    results
}

fn dominant(
    speaker: &str,
    quintile: usize,
    bucket: &[&UtteranceEmotions],
) -> Option<QuintileEmotion> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for utterance in bucket {
        for emotion in &utterance.emotions {
            *totals.entry(emotion.name.as_str()).or_insert(0.0) += emotion.score;
        }
    }
    if totals.is_empty() {
        return None;
    }

    let count = bucket.len() as f64;
    let mut means: Vec<EmotionScore> = totals
        .into_iter()
        .map(|(name, total)| EmotionScore {
            name: name.to_string(),
            score: total / count,
        })
        .collect();
    // Stable sort keeps alphabetical order among equal scores.
    means.sort_by(|a, b| b.score.total_cmp(&a.score));
    means.truncate(TOP_EMOTIONS);

    let best = means.first()?.clone();
    Some(QuintileEmotion {
        speaker: speaker.to_string(),
        quintile: (quintile + 1) as u8,
        main_emotion: best.name,
        score: best.score,
        top_emotions: means,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(speaker: &str, scores: &[(&str, f64)]) -> UtteranceEmotions {
        UtteranceEmotions {
            speaker: speaker.to_string(),
            text: None,
            start_ms: None,
            end_ms: None,
            emotions: scores
                .iter()
                .map(|(name, score)| EmotionScore {
                    name: name.to_string(),
                    score: *score,
                })
                .collect(),
        }
    }

    #[test]
    fn test_bucket_ranges_partition_ten_utterances() {
        let ranges: Vec<_> = (0..5).map(|q| bucket_range(q, 10)).collect();
        assert_eq!(ranges, vec![0..2, 2..4, 4..6, 6..8, 8..10]);
    }

    #[test]
    fn test_bucket_ranges_cover_uneven_counts() {
        let ranges: Vec<_> = (0..5).map(|q| bucket_range(q, 7)).collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..4, 4..5, 5..7]);
    }

    #[test]
    fn test_bucket_ranges_overlap_for_short_speakers() {
        let ranges: Vec<_> = (0..5).map(|q| bucket_range(q, 2)).collect();
        assert_eq!(ranges, vec![0..1, 0..1, 0..1, 1..2, 1..2]);
    }

    #[test]
    fn test_five_entries_per_speaker() {
        let mut utterances = Vec::new();
        for i in 0..10 {
            let speaker = if i % 2 == 0 { "A" } else { "B" };
            utterances.push(utterance(speaker, &[("Joy", 0.5), ("Calmness", 0.1 * i as f64)]));
        }

        let results = analyze(&utterances);
        assert_eq!(results.len(), 10);
        assert_eq!(
            results.iter().filter(|r| r.speaker == "A").count(),
            QUINTILES
        );
        assert_eq!(
            results.iter().map(|r| r.quintile).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_highest_mean_wins() {
        let utterances = vec![
            utterance("A", &[("Joy", 0.9), ("Anger", 0.1)]),
            utterance("A", &[("Joy", 0.1), ("Anger", 0.8)]),
            utterance("A", &[("Anger", 0.3)]),
            utterance("A", &[("Anger", 0.3)]),
            utterance("A", &[("Anger", 0.3)]),
        ];

        let results = analyze(&utterances);
        assert_eq!(results[0].main_emotion, "Joy");
        assert_eq!(results[1].main_emotion, "Anger");
        assert!((results[1].score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_tie_goes_to_alphabetically_first() {
        let utterances = vec![utterance("A", &[("Sadness", 0.4), ("Awe", 0.4)])];
        let results = analyze(&utterances);
        assert_eq!(results.len(), QUINTILES);
        assert!(results.iter().all(|r| r.main_emotion == "Awe"));
    }

    #[test]
    fn test_top_emotions_are_capped() {
        let scores: Vec<(String, f64)> = (0..8).map(|i| (format!("E{i}"), i as f64)).collect();
        let borrowed: Vec<(&str, f64)> = scores.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        let results = analyze(&[utterance("A", &borrowed)]);

        assert_eq!(results[0].top_emotions.len(), 5);
        assert_eq!(results[0].top_emotions[0].name, "E7");
    }

    #[test]
    fn test_utterances_without_scores_are_skipped() {
        let results = analyze(&[utterance("A", &[])]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_into_emotion_entry() {
        let results = analyze(&[utterance("A", &[("Joy", 1.0)])]);
        let entry: EmotionEntry = results[0].clone().into();
        assert_eq!(entry.quintile, 1);
        assert_eq!(entry.main_emotion, "Joy");
    }

    #[test]
    fn test_describe_lists_score_and_top_emotions() {
        let q = QuintileEmotion {
            speaker: "A".to_string(),
            quintile: 1,
            main_emotion: "Joy".to_string(),
            score: 0.8,
            top_emotions: vec![
                EmotionScore {
                    name: "Joy".to_string(),
                    score: 0.8,
                },
                EmotionScore {
                    name: "Calmness".to_string(),
                    score: 0.4,
                },
            ],
        };
        assert_eq!(q.describe(), "A q1: Joy 0.800 [Joy 0.800, Calmness 0.400]");
    }
}
