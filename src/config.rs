use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::services::{DuplicatePolicy, MiningParams, PlannerConfig, Predicate};
use crate::utils::StringExt;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub mode: RunMode,
    pub store: StoreConfig,
    pub mining: MiningParams,
    pub planner: PlannerSection,
    pub logging: LoggingConfig,
}

/// What the binary does once the store is ready
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Mine, build the hierarchy and run the counterfactual planner
    #[default]
    Plan,
    /// Only mine and print the ranked explanations
    Mine,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Rows loaded from a JSON file into memory
    #[default]
    Memory,
    Mysql,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// MySQL connection url (mysql backend)
    pub url: String,
    /// Event log table, optionally schema-qualified (mysql backend)
    pub table: String,
    /// JSON array of row objects (memory backend)
    pub rows_file: Option<String>,
    /// Per-row outlier flag
    pub indicator_column: String,
    /// Mutable copy of the outlier flag cleared by neutralization
    pub neutralization_column: String,
}

/// `[planner]` section: attribute universe, predicates and dedup policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerSection {
    /// Accepts a TOML array or a comma-separated string
    #[serde(deserialize_with = "deserialize_attribute_list")]
    pub attributes: Vec<String>,
    pub duplicate_policy: DuplicatePolicy,
    pub outlier: Predicate,
    pub base: Predicate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Command line arguments for configuration overrides
#[derive(Parser, Debug, Clone)]
#[command(name = "drift-planner")]
#[command(version, about = "Drift Planner - root-cause mining and counterfactual tuning plans")]
pub struct CommandLineArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Run mode (overrides config file)
    #[arg(long, value_enum)]
    pub mode: Option<RunMode>,

    /// Row store backend (overrides config file)
    #[arg(long, value_enum)]
    pub store: Option<StoreBackend>,

    /// MySQL url (overrides config file)
    #[arg(long, value_name = "URL")]
    pub store_url: Option<String>,

    /// Event log table (overrides config file)
    #[arg(long, value_name = "TABLE")]
    pub store_table: Option<String>,

    /// JSON rows file for the memory backend (overrides config file)
    #[arg(long, value_name = "PATH")]
    pub rows_file: Option<String>,

    /// Comma-separated attribute universe (overrides config file, e.g. "weather,location")
    #[arg(long, value_name = "LIST")]
    pub attributes: Option<String>,

    /// Minimum support (overrides config file, e.g. "0.05" or "5%")
    #[arg(long, value_name = "RATIO")]
    pub min_support: Option<String>,

    /// Minimum confidence (overrides config file, e.g. "0.51" or "51%")
    #[arg(long, value_name = "RATIO")]
    pub min_confidence: Option<String>,

    /// Largest itemset size (overrides config file)
    #[arg(long, value_name = "N")]
    pub max_length: Option<usize>,

    /// Logging level (overrides config file, e.g., "info,drift_planner=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with command line, environment variable, and file support
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (prefixed with APP_)
    /// 3. Configuration file (config.toml)
    /// 4. Default values
    pub fn load() -> Result<Self, anyhow::Error> {
        let cli_args = CommandLineArgs::parse();

        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(&cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Planner settings assembled from the `[mining]` and `[planner]` sections
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            mining: self.mining.clone(),
            duplicate_policy: self.planner.duplicate_policy,
            outlier: self.planner.outlier.clone(),
            base: self.planner.base.clone(),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_STORE_URL: MySQL url
    /// - APP_STORE_TABLE: Event log table (default: local_schema.drift_log)
    /// - APP_ROWS_FILE: JSON rows file for the memory backend
    /// - APP_ATTRIBUTES: Comma-separated attribute universe
    /// - APP_MIN_SUPPORT: Minimum support (accepts "0.05" or "5%")
    /// - APP_MIN_CONFIDENCE: Minimum confidence (accepts "0.51" or "51%")
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,drift_planner=debug")
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("APP_STORE_URL") {
            self.store.url = url;
            tracing::info!("Override store.url from env");
        }

        if let Ok(table) = std::env::var("APP_STORE_TABLE") {
            self.store.table = table;
            tracing::info!("Override store.table from env: {}", self.store.table);
        }

        if let Ok(rows_file) = std::env::var("APP_ROWS_FILE") {
            tracing::info!("Override store.rows_file from env: {}", rows_file);
            self.store.rows_file = Some(rows_file);
        }

        if let Ok(attributes) = std::env::var("APP_ATTRIBUTES") {
            self.planner.attributes = split_attribute_list(&attributes);
            tracing::info!("Override planner.attributes from env: {:?}", self.planner.attributes);
        }

        if let Ok(support) = std::env::var("APP_MIN_SUPPORT") {
            match parse_ratio(&support) {
                Ok(val) => {
                    self.mining.min_support = val;
                    tracing::info!("Override mining.min_support from env: {}", val);
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_MIN_SUPPORT '{}': {} (keep {})",
                    support,
                    e,
                    self.mining.min_support
                ),
            }
        }

        if let Ok(confidence) = std::env::var("APP_MIN_CONFIDENCE") {
            match parse_ratio(&confidence) {
                Ok(val) => {
                    self.mining.min_confidence = val;
                    tracing::info!("Override mining.min_confidence from env: {}", val);
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_MIN_CONFIDENCE '{}': {} (keep {})",
                    confidence,
                    e,
                    self.mining.min_confidence
                ),
            }
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }
    }

    /// Apply command line argument overrides (highest priority)
    fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(mode) = args.mode {
            self.mode = mode;
            tracing::info!("Override mode from CLI: {:?}", self.mode);
        }

        if let Some(backend) = args.store {
            self.store.backend = backend;
            tracing::info!("Override store.backend from CLI: {:?}", self.store.backend);
        }

        if let Some(url) = &args.store_url {
            self.store.url = url.clone();
            tracing::info!("Override store.url from CLI");
        }

        if let Some(table) = &args.store_table {
            self.store.table = table.clone();
            tracing::info!("Override store.table from CLI: {}", self.store.table);
        }

        if let Some(rows_file) = &args.rows_file {
            self.store.rows_file = Some(rows_file.clone());
            tracing::info!("Override store.rows_file from CLI: {}", rows_file);
        }

        if let Some(attributes) = &args.attributes {
            self.planner.attributes = split_attribute_list(attributes);
            tracing::info!("Override planner.attributes from CLI: {:?}", self.planner.attributes);
        }

        if let Some(support) = &args.min_support {
            match parse_ratio(support) {
                Ok(val) => {
                    self.mining.min_support = val;
                    tracing::info!("Override mining.min_support from CLI: {}", val);
                },
                Err(e) => tracing::warn!(
                    "Invalid --min-support '{}': {} (keep {})",
                    support,
                    e,
                    self.mining.min_support
                ),
            }
        }

        if let Some(confidence) = &args.min_confidence {
            match parse_ratio(confidence) {
                Ok(val) => {
                    self.mining.min_confidence = val;
                    tracing::info!("Override mining.min_confidence from CLI: {}", val);
                },
                Err(e) => tracing::warn!(
                    "Invalid --min-confidence '{}': {} (keep {})",
                    confidence,
                    e,
                    self.mining.min_confidence
                ),
            }
        }

        if let Some(max_length) = args.max_length {
            self.mining.max_length = max_length;
            tracing::info!("Override mining.max_length from CLI: {}", max_length);
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
            tracing::info!("Override logging.level from CLI: {}", self.logging.level);
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.planner.attributes.is_empty() {
            anyhow::bail!("planner.attributes cannot be empty");
        }

        match self.store.backend {
            StoreBackend::Memory => {
                if self.store.rows_file.as_deref().is_none_or(str::is_empty) {
                    anyhow::bail!("store.rows_file is required for the memory backend");
                }
            },
            StoreBackend::Mysql => {
                if self.store.url.is_empty() {
                    anyhow::bail!("store.url cannot be empty for the mysql backend");
                }
                if self.store.table.is_empty() {
                    anyhow::bail!("store.table cannot be empty for the mysql backend");
                }
            },
        }

        if self.store.indicator_column == self.store.neutralization_column {
            anyhow::bail!("store.indicator_column and store.neutralization_column must differ");
        }

        self.mining.validate()?;

        if self.planner.outlier == Predicate::True {
            tracing::warn!("planner.outlier matches every row; every row counts as an outlier");
        }

        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "mysql://root:@localhost:3306/local_schema".to_string(),
            table: "local_schema.drift_log".to_string(),
            rows_file: Some("data/drift_log.json".to_string()),
            indicator_column: "signal_1or2".to_string(),
            neutralization_column: "counter_drift".to_string(),
        }
    }
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            attributes: vec!["weather".to_string(), "location".to_string(), "model_type".to_string()],
            duplicate_policy: DuplicatePolicy::KeepMoreAttributes,
            outlier: Predicate::eq("counter_drift", "1"),
            base: Predicate::True,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,drift_planner=debug".to_string(), file: None }
    }
}

// =========================
// Helpers for parsing values
// =========================

/// Accepts a plain fraction ("0.05") or a percentage ("5%").
fn parse_ratio(input: &str) -> Result<f64, String> {
    let s = input.trim();
    let value = match s.strip_suffix('%') {
        Some(percent) => {
            percent.trim().parse::<f64>().map_err(|_| "invalid percentage".to_string())? / 100.0
        },
        None => s.parse::<f64>().map_err(|_| "invalid number".to_string())?,
    };
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{} is outside [0, 1]", value));
    }
    Ok(value)
}

fn split_attribute_list(input: &str) -> Vec<String> {
    input.split(',').filter_map(|s| s.clean()).collect()
}

// Custom serde deserializer to support a TOML array or a comma-separated string
fn deserialize_attribute_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = Vec<String>;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a list of attribute names or a string like 'weather,location'")
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(split_attribute_list(v))
        }
        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut attributes = Vec::new();
            while let Some(attribute) = seq.next_element::<String>()? {
                attributes.push(attribute);
            }
            Ok(attributes)
        }
    }
    deserializer.deserialize_any(Visitor)
}
