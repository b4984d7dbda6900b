pub mod coach;
pub mod emotion;
pub mod job;
pub mod media;
pub mod transcription;
