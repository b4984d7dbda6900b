use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default speech-to-text API base URL used when `TRANSCRIPTION_BASE_URL` is not set.
pub const DEFAULT_TRANSCRIPTION_BASE_URL: &str = "https://api.assemblyai.com/v2";
/// Default emotion inference API base URL used when `EMOTION_BASE_URL` is not set.
pub const DEFAULT_EMOTION_BASE_URL: &str = "https://api.hume.ai/v0";
/// Default LLM coach API base URL used when `COACH_BASE_URL` is not set.
pub const DEFAULT_COACH_BASE_URL: &str = "https://api.anthropic.com/v1";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Also write log output to this file.
    #[arg(long, env)]
    pub log_file: Option<PathBuf>,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// The base URL of the speech-to-text API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_TRANSCRIPTION_BASE_URL)]
    transcription_base_url: String,
    /// The API key to use when calling the speech-to-text API.
    #[arg(long, env)]
    transcription_api_key: Option<String>,
    /// The speech model identifier sent with every transcription request.
    #[arg(long, env, default_value = "best")]
    transcription_model: String,

    /// The base URL of the emotion inference API.
    #[arg(long, env, default_value = DEFAULT_EMOTION_BASE_URL)]
    emotion_base_url: String,
    /// The API key to use when calling the emotion inference API.
    #[arg(long, env)]
    emotion_api_key: Option<String>,

    /// The base URL of the LLM coach API.
    #[arg(long, env, default_value = DEFAULT_COACH_BASE_URL)]
    coach_base_url: String,
    /// The API key to use when calling the LLM coach API.
    #[arg(long, env)]
    coach_api_key: Option<String>,
    /// The model the coach analysis runs on.
    #[arg(long, env, default_value = "claude-3-7-sonnet-20250219")]
    pub coach_model: String,
    /// Upper bound on tokens generated by the coach.
    #[arg(long, env, default_value_t = 4096)]
    pub coach_max_tokens: u32,
    /// Coach response randomness between 0.0 and 1.0.
    #[arg(long, env, default_value_t = 0.7)]
    pub coach_temperature: f32,
    /// Replaces the default system prompt of the coach.
    #[arg(long, env)]
    pub coach_system_prompt: Option<String>,

    /// Timeout in seconds for a single provider HTTP request
    #[arg(long, env, default_value_t = 60)]
    pub http_timeout_secs: u64,

    /// How many times a transient provider failure is retried
    #[arg(long, env, default_value_t = 3)]
    pub http_max_retries: u32,

    /// Seconds to wait between polls of a provider-side job
    #[arg(long, env, default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// Polls of a provider-side job before giving up with a timeout
    #[arg(long, env, default_value_t = 60)]
    pub poll_max_attempts: u32,

    /// Directory where completed analysis records are archived as `<job_id>.json`.
    #[arg(long, env)]
    pub results_dir: Option<PathBuf>,

    /// Additionally require depth percentages to sum to ~100 and radar scores to lie in 1-10.
    #[arg(long, env, default_value_t = false)]
    pub strict_validation: bool,

    /// Reuse the archived record of an identical earlier upload instead of calling the
    /// providers again. Needs `results_dir`.
    #[arg(long, env, default_value_t = true, action = clap::ArgAction::Set)]
    pub reuse_results: bool,

    /// Jobs kept in memory; past this the oldest finished jobs are forgotten.
    #[arg(long, env, default_value_t = 10_000)]
    pub max_retained_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn transcription_base_url(&self) -> &str {
        &self.transcription_base_url
    }

    pub fn set_transcription_base_url(mut self, url: String) -> Self {
        self.transcription_base_url = url;
        self
    }

    pub fn transcription_api_key(&self) -> Option<String> {
        self.transcription_api_key.clone()
    }

    pub fn transcription_model(&self) -> &str {
        &self.transcription_model
    }

    pub fn emotion_base_url(&self) -> &str {
        &self.emotion_base_url
    }

    pub fn set_emotion_base_url(mut self, url: String) -> Self {
        self.emotion_base_url = url;
        self
    }

    pub fn emotion_api_key(&self) -> Option<String> {
        self.emotion_api_key.clone()
    }

    pub fn coach_base_url(&self) -> &str {
        &self.coach_base_url
    }

    pub fn set_coach_base_url(mut self, url: String) -> Self {
        self.coach_base_url = url;
        self
    }

    pub fn coach_api_key(&self) -> Option<String> {
        self.coach_api_key.clone()
    }

    pub fn set_api_keys(mut self, transcription: &str, emotion: &str, coach: &str) -> Self {
        self.transcription_api_key = Some(transcription.to_string());
        self.emotion_api_key = Some(emotion.to_string());
        self.coach_api_key = Some(coach.to_string());
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
