//! Rendering transcripts for the coach and parsing plain-text transcripts.

use analysis_ai::types::transcription::{Segment, Transcript};

use crate::error::{Error, InputErrorKind};

/// Speaker assigned to a plain-text transcript that carries no speaker labels.
pub const DEFAULT_SPEAKER: &str = "speaker_1";

const MAX_LABEL_CHARS: usize = 32;
const MAX_LABEL_WORDS: usize = 4;

/// Render a transcript as one `[speaker]: text` line per speaker turn.
///
/// Consecutive segments of the same speaker are joined into one turn, whitespace runs
/// collapse to a single space and spaces before punctuation are dropped.
pub fn render(transcript: &Transcript) -> String {
    let mut turns: Vec<(&str, Vec<&str>)> = Vec::new();
    for segment in &transcript.segments {
        if segment.text.trim().is_empty() {
            continue;
        }
        match turns.last_mut() {
            Some((speaker, texts)) if *speaker == segment.speaker => texts.push(&segment.text),
            _ => turns.push((&segment.speaker, vec![&segment.text])),
        }
    }

    turns
        .into_iter()
        .map(|(speaker, texts)| format!("[{}]: {}", speaker, tidy(&texts.join(" "))))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse pasted text into a transcript.
///
/// Lines of the form `[speaker]: text` or `speaker: text` start a new utterance; other
/// lines continue the previous one. Text without any labelled line becomes one
/// utterance of [`DEFAULT_SPEAKER`].
pub fn parse(text: &str) -> Result<Transcript, Error> {
    if text.trim().is_empty() {
        return Err(Error::input(
            InputErrorKind::EmptyTranscript,
            "Transcript is empty",
        ));
    }

    let mut segments: Vec<Segment> = Vec::new();
    let mut labelled = false;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match split_label(line) {
            Some((speaker, rest)) => {
                labelled = true;
                segments.push(Segment::new(speaker, rest));
            }
            None => match segments.last_mut() {
                Some(last) => {
                    if !last.text.is_empty() {
                        last.text.push(' ');
                    }
                    last.text.push_str(line);
                }
                None => segments.push(Segment::new(DEFAULT_SPEAKER, line)),
            },
        }
    }

    if !labelled {
        let whole = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        segments = vec![Segment::new(DEFAULT_SPEAKER, whole)];
    }

    for segment in &mut segments {
        segment.text = tidy(&segment.text);
    }

    let transcript = Transcript::new(segments);
    if transcript.is_empty() {
        return Err(Error::input(
            InputErrorKind::EmptyTranscript,
            "Transcript is empty",
        ));
    }
    Ok(transcript)
}

fn split_label(line: &str) -> Option<(&str, &str)> {
    if let Some(rest) = line.strip_prefix('[') {
        let (label, after) = rest.split_once(']')?;
        let text = after.trim_start().strip_prefix(':')?;
        let label = label.trim();
        return (!label.is_empty()).then_some((label, text.trim()));
    }

    let (label, text) = line.split_once(':')?;
    let label = label.trim();
    let plausible = !label.is_empty()
        && label.chars().count() <= MAX_LABEL_CHARS
        && label.split_whitespace().count() <= MAX_LABEL_WORDS
        && !label.to_ascii_lowercase().contains("http")
        && label
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.' | '\''));
    plausible.then_some((label, text.trim()))
}

fn tidy(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    for c in collapsed.chars() {
        if matches!(c, '.' | ',' | '!' | '?' | ';' | ':') && out.ends_with(' ') {
            out.pop();
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_joins_consecutive_speaker_segments() {
        let transcript = Transcript::new(vec![
            Segment::new("A", "Hello"),
            Segment::new("A", "there ,  friend ."),
            Segment::new("B", "Hi !"),
            Segment::new("A", "  "),
            Segment::new("A", "Bye"),
        ]);

        assert_eq!(
            render(&transcript),
            "[A]: Hello there, friend.\n[B]: Hi!\n[A]: Bye"
        );
    }

    #[test]
    fn test_parse_bracketed_and_plain_labels() {
        let transcript = parse("[Alice]: Hi there.\nBob: Hello!\nhow are you?\n\n[Alice]: Fine.")
            .unwrap();

        assert_eq!(
            transcript.segments,
            vec![
                Segment::new("Alice", "Hi there."),
                Segment::new("Bob", "Hello! how are you?"),
                Segment::new("Alice", "Fine."),
            ]
        );
    }

    #[test]
    fn test_parse_unlabelled_text_uses_default_speaker() {
        let transcript = parse("We talked about the launch.\nIt went well.").unwrap();
        assert_eq!(transcript.speakers(), vec![DEFAULT_SPEAKER]);
        assert_eq!(
            transcript.segments[0].text,
            "We talked about the launch. It went well."
        );
    }

    #[test]
    fn test_parse_ignores_implausible_labels() {
        let transcript =
            parse("See https://example.com: details\nThis is a rather long sentence with a colon: yes")
                .unwrap();
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(transcript.segments[0].speaker, DEFAULT_SPEAKER);
    }

    #[test]
    fn test_parse_rejects_empty_text() {
        let err = parse(" \n\t ").unwrap_err();
        assert!(err.is_input());

        let err = parse("[A]:\n[B]:").unwrap_err();
        assert_eq!(err.to_string(), "Transcript is empty");
    }
}
