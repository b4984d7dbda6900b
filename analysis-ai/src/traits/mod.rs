pub mod coach;
pub mod emotion;
pub mod transcription;
