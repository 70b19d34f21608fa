//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `boardroom-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure and provides a loader that reads the file. Every
//! field has a default, so a missing or partial file still yields a
//! runnable configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use boardroom_types::{CompanyState, Executive, FeedPersona};

use crate::commit::Limits;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `boardroom-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Company identity and starting resources.
    #[serde(default)]
    pub company: CompanyConfig,

    /// Document paths and rolling-collection bounds.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Scheduler timing.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// LLM backend settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// News seeding settings.
    #[serde(default)]
    pub news: NewsConfig,

    /// Replication settings.
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Executive bench. Empty means the built-in roster.
    #[serde(default)]
    pub executives: Vec<Executive>,

    /// Social feed personas. Empty means the built-in cast.
    #[serde(default)]
    pub feed_personas: Vec<FeedPersona>,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `LLM_API_KEY` in the environment overrides `llm.api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.llm.apply_env_overrides();
        if config.executives.is_empty() {
            config.executives = default_executives();
        }
        if config.feed_personas.is_empty() {
            config.feed_personas = default_feed_personas();
        }
        Ok(config)
    }

    /// The state document all resets return to.
    pub fn initial_state(&self) -> CompanyState {
        CompanyState::with_resources(self.company.initial_resources.clone())
    }

    /// The rolling-collection bounds for the commit protocol.
    pub const fn limits(&self) -> Limits {
        Limits {
            history_cap: self.storage.history_cap,
            feed_cap: self.storage.feed_cap,
        }
    }
}

/// Company identity and starting position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompanyConfig {
    /// Display name used in prompts.
    #[serde(default = "default_company_name")]
    pub name: String,

    /// Resource values a fresh (or reset) company starts with.
    #[serde(default = "default_initial_resources")]
    pub initial_resources: BTreeMap<String, i64>,
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: default_company_name(),
            initial_resources: default_initial_resources(),
        }
    }
}

/// Document paths and bounds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Path of the state document.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Path of the history document.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    /// Maximum history entries retained.
    #[serde(default = "default_cap")]
    pub history_cap: usize,

    /// Maximum feed reactions retained.
    #[serde(default = "default_cap")]
    pub feed_cap: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            history_path: default_history_path(),
            history_cap: default_cap(),
            feed_cap: default_cap(),
        }
    }
}

/// Scheduler timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduled cycles.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
}

impl SchedulerConfig {
    /// The interval as a [`Duration`].
    pub const fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval_secs(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// LLM backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmConfig {
    /// Backend type (`openai`, `deepseek`, `ollama`, `anthropic`, `claude`).
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base API URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key. Overridden by the `LLM_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_llm_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per generation before falling back.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff between attempts, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Path to the prompt templates directory.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
}

impl LlmConfig {
    /// Override the file-based key with `LLM_API_KEY` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            if !key.is_empty() {
                self.api_key = key;
            }
        }
    }

    /// The request timeout as a [`Duration`].
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            api_url: default_api_url(),
            api_key: String::new(),
            model: default_model(),
            request_timeout_secs: default_llm_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            templates_dir: default_templates_dir(),
        }
    }
}

/// News seeding settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewsConfig {
    /// Whether cycles may seed events from a headline.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Percentage of cycles (0-100) that try a news-seeded event.
    #[serde(default = "default_news_percent")]
    pub percent: u8,

    /// RSS feed URL.
    #[serde(default = "default_news_url")]
    pub feed_url: String,

    /// Fetch timeout in seconds.
    #[serde(default = "default_news_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            percent: default_news_percent(),
            feed_url: default_news_url(),
            timeout_secs: default_news_timeout_secs(),
        }
    }
}

/// Replication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReplicationConfig {
    /// Whether post-commit git replication is enabled.
    #[serde(default)]
    pub enabled: bool,

    /// Working directory the git commands run in. Defaults to the
    /// process working directory.
    #[serde(default)]
    pub repo_dir: Option<PathBuf>,
}

fn default_company_name() -> String {
    String::from("Wei Holdings")
}

fn default_initial_resources() -> BTreeMap<String, i64> {
    BTreeMap::from([
        (String::from("funds"), 3000),
        (String::from("morale"), 50),
        (String::from("risk"), 10),
    ])
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./data/company_status.json")
}

fn default_history_path() -> PathBuf {
    PathBuf::from("./data/history.json")
}

const fn default_cap() -> usize {
    30
}

const fn default_cycle_interval_secs() -> u64 {
    30
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8000
}

fn default_backend() -> String {
    String::from("openai")
}

fn default_api_url() -> String {
    String::from("https://api.openai.com/v1")
}

fn default_model() -> String {
    String::from("gpt-5-nano")
}

const fn default_llm_timeout_secs() -> u64 {
    60
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff_ms() -> u64 {
    500
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

const fn default_true() -> bool {
    true
}

const fn default_news_percent() -> u8 {
    30
}

fn default_news_url() -> String {
    String::from("https://news.google.com/rss?hl=en-US&gl=US&ceid=US:en")
}

const fn default_news_timeout_secs() -> u64 {
    10
}

/// The built-in executive bench, used when the file defines none.
pub fn default_executives() -> Vec<Executive> {
    vec![
        Executive {
            name: String::from("Cao Cao"),
            role: String::from("CEO"),
            persona: String::from(
                "Ruthless visionary who treats the org chart as a battlefield map.",
            ),
            voice: String::from("Grand pronouncements, veiled threats, quotes himself."),
            stances: vec![
                String::from("expansion at any cost"),
                String::from("loyalty tests"),
            ],
        },
        Executive {
            name: String::from("Xun Yu"),
            role: String::from("CFO"),
            persona: String::from(
                "Principled numbers man quietly horrified by everything around him.",
            ),
            voice: String::from("Measured, precise, ends every remark with a caveat."),
            stances: vec![
                String::from("fiscal restraint"),
                String::from("procedural correctness"),
            ],
        },
        Executive {
            name: String::from("Guo Jia"),
            role: String::from("CTO"),
            persona: String::from(
                "Brilliant, chaotic, ships to production on Friday evenings.",
            ),
            voice: String::from("Fast, flippant, speaks in half-finished metaphors."),
            stances: vec![
                String::from("move fast"),
                String::from("automation over headcount"),
            ],
        },
        Executive {
            name: String::from("Sima Yi"),
            role: String::from("Auditor"),
            persona: String::from(
                "Patient internal auditor who is obviously playing a longer game.",
            ),
            voice: String::from("Polite, clipped, faintly menacing."),
            stances: vec![
                String::from("document everything"),
                String::from("bide time"),
            ],
        },
        Executive {
            name: String::from("Xun You"),
            role: String::from("CSO"),
            persona: String::from(
                "Strategy chief who presents three options and always prefers the sneaky one.",
            ),
            voice: String::from("Quiet, indirect, answers questions with questions."),
            stances: vec![
                String::from("misdirection"),
                String::from("optionality"),
            ],
        },
        Executive {
            name: String::from("Jia Xu"),
            role: String::from("CMO"),
            persona: String::from(
                "Marketing survivor who has outlasted four regime changes by reading the room.",
            ),
            voice: String::from("Agreeable on the surface, always hedging."),
            stances: vec![
                String::from("narrative control"),
                String::from("self-preservation"),
            ],
        },
    ]
}

/// The built-in social feed cast, used when the file defines none.
pub fn default_feed_personas() -> Vec<FeedPersona> {
    vec![
        FeedPersona {
            name: String::from("Retail Mob"),
            handle: String::from("@wei_to_moon"),
            persona: String::from("Breathless retail investor, all caps, rocket emoji energy."),
            is_vip: false,
        },
        FeedPersona {
            name: String::from("Doom Analyst"),
            handle: String::from("@short_everything"),
            persona: String::from("Perma-bear who reads every headline as a sell signal."),
            is_vip: false,
        },
        FeedPersona {
            name: String::from("Intern Throwaway"),
            handle: String::from("@definitely_not_hr"),
            persona: String::from("Anonymous insider account leaking cafeteria-grade gossip."),
            is_vip: false,
        },
        FeedPersona {
            name: String::from("Liu Bei"),
            handle: String::from("@shu_holdings_ceo"),
            persona: String::from("Rival CEO, performatively humble, twists the knife gently."),
            is_vip: true,
        },
        FeedPersona {
            name: String::from("Sun Quan"),
            handle: String::from("@wu_capital"),
            persona: String::from("Rival CEO, smug, posts only when the numbers are bad."),
            is_vip: true,
        },
    ]
}
