//! Raw media handed to providers.

/// An audio artifact as uploaded by the caller.
#[derive(Debug, Clone)]
pub struct Audio {
    /// Original file name, used for the provider upload and content-type guess.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Audio {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Lower-cased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// MIME type derived from the extension.
    pub fn content_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("aac") => "audio/aac",
            Some("ogg") => "audio/ogg",
            Some("flac") => "audio/flac",
            _ => "application/octet-stream",
        }
    }
}
