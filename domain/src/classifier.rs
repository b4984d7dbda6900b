//! Input classification: decides which pipeline an inbound artifact takes.
//!
//! Classification only inspects the artifact's name, declared content type and bytes;
//! it never parses JSON or touches a provider.

use analysis_ai::Audio;
use log::*;
use std::path::Path;

use crate::error::{Error, InputErrorKind};

pub const AUDIO_EXTENSIONS: [&str; 6] = ["wav", "mp3", "m4a", "aac", "ogg", "flac"];
pub const TRANSCRIPT_EXTENSIONS: [&str; 2] = ["txt", "md"];
pub const JSON_EXTENSION: &str = "json";

/// Something submitted for analysis.
#[derive(Debug, Clone)]
pub enum Artifact {
    File {
        name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// Pasted transcript text.
    Text(String),
}

impl Artifact {
    pub fn file(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Artifact::File {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Artifact::File { bytes, .. } => bytes,
            Artifact::Text(text) => text.into_bytes(),
        }
    }
}

/// What the classifier decided.
#[derive(Debug, Clone)]
pub enum Classified {
    Audio(Audio),
    Transcript(String),
    /// Raw bytes of a pre-built analysis and of the optional emotion file. Both are
    /// parsed later so that a bad emotion file only degrades the result.
    PrebuiltJson {
        primary: Vec<u8>,
        emotion: Option<Vec<u8>>,
    },
}

impl Classified {
    pub fn kind(&self) -> &'static str {
        match self {
            Classified::Audio(_) => "audio",
            Classified::Transcript(_) => "transcript",
            Classified::PrebuiltJson { .. } => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub input: Classified,
    pub warnings: Vec<String>,
}

/// Classify `primary`, attaching `secondary` as the emotion payload when `primary` is JSON.
///
/// A secondary artifact next to audio or text is ignored with a warning.
pub fn classify(primary: Artifact, secondary: Option<Artifact>) -> Result<Classification, Error> {
    let mut warnings = Vec::new();

    let input = match primary {
        Artifact::Text(text) => Classified::Transcript(text),
        Artifact::File {
            name,
            content_type,
            bytes,
        } => {
            if bytes.is_empty() {
                return Err(Error::input(
                    InputErrorKind::MissingArtifact,
                    format!("Uploaded file {} is empty", name),
                ));
            }
            let extension = extension_of(&name);
            match extension.as_deref() {
                Some(JSON_EXTENSION) => Classified::PrebuiltJson {
                    primary: bytes,
                    emotion: None,
                },
                Some(ext) if TRANSCRIPT_EXTENSIONS.contains(&ext) => {
                    let text = String::from_utf8(bytes).map_err(|_| {
                        Error::input(
                            InputErrorKind::UnsupportedFileType,
                            format!("Transcript file {} is not UTF-8 text", name),
                        )
                    })?;
                    Classified::Transcript(text)
                }
                Some(ext) if AUDIO_EXTENSIONS.contains(&ext) => {
                    Classified::Audio(Audio::new(name, bytes))
                }
                _ if content_type
                    .as_deref()
                    .is_some_and(|ct| ct.starts_with("audio/")) =>
                {
                    Classified::Audio(Audio::new(name, bytes))
                }
                other => {
                    return Err(Error::input(
                        InputErrorKind::UnsupportedFileType,
                        format!("Unsupported file type: .{}", other.unwrap_or_default()),
                    ))
                }
            }
        }
    };

    let input = match (input, secondary) {
        (Classified::PrebuiltJson { primary, .. }, Some(emotion)) => Classified::PrebuiltJson {
            primary,
            emotion: Some(emotion.into_bytes()),
        },
        (input, Some(_)) => {
            let warning = format!(
                "Emotion file ignored: only used with a JSON analysis, got {} input",
                input.kind()
            );
            warn!("{}", warning);
            warnings.push(warning);
            input
        }
        (input, None) => input,
    };

    debug!("Classified artifact as {}", input.kind());
    Ok(Classification { input, warnings })
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
