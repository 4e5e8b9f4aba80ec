use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

fn default_true() -> bool {
    true
}

// ============================================================
// Rule Set Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct RulesConfig {
    #[serde(default = "default_rules_path")]
    pub path: String,
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: default_rules_path(),
            create_if_missing: true,
        }
    }
}

fn default_rules_path() -> String {
    "rules.json".to_string()
}

// ============================================================
// Classifier Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Exported model file. Without one the classifier stays not-ready and
    /// every message scores 0.0 on the ML side.
    pub model_path: Option<String>,
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            timeout_ms: default_classifier_timeout_ms(),
        }
    }
}

fn default_classifier_timeout_ms() -> u64 {
    2000
}

// ============================================================
// Decision Policy Config
// ============================================================

/// Calibration constants for the hybrid decision tiers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PolicyConfig {
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
    #[serde(default = "default_ai_override_probability")]
    pub ai_override_probability: f64,
    #[serde(default = "default_ai_override_min_weight")]
    pub ai_override_min_weight: f64,
    #[serde(default = "default_rule_override_min_weight")]
    pub rule_override_min_weight: f64,
    #[serde(default = "default_blend_weight")]
    pub blend_ml_weight: f64,
    #[serde(default = "default_blend_weight")]
    pub blend_rule_weight: f64,
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_tokens: default_min_tokens(),
            ai_override_probability: default_ai_override_probability(),
            ai_override_min_weight: default_ai_override_min_weight(),
            rule_override_min_weight: default_rule_override_min_weight(),
            blend_ml_weight: default_blend_weight(),
            blend_rule_weight: default_blend_weight(),
            medium_threshold: default_medium_threshold(),
            high_threshold: default_high_threshold(),
        }
    }
}

fn default_min_tokens() -> usize {
    3
}

fn default_ai_override_probability() -> f64 {
    0.82
}

fn default_ai_override_min_weight() -> f64 {
    0.20
}

fn default_rule_override_min_weight() -> f64 {
    0.40
}

// TODO: product calibration still has to settle whether the blend should be
// 0.4 rule / 0.6 ML, as the early dashboards labelled it.
fn default_blend_weight() -> f64 {
    0.5
}

fn default_medium_threshold() -> f64 {
    0.35
}

fn default_high_threshold() -> f64 {
    0.65
}

impl PolicyConfig {
    fn validate(&self) -> eyre::Result<()> {
        if self.min_tokens == 0 {
            return Err(eyre::eyre!("policy.min_tokens must be at least 1"));
        }

        let unit_fields = [
            ("ai_override_probability", self.ai_override_probability),
            ("ai_override_min_weight", self.ai_override_min_weight),
            ("rule_override_min_weight", self.rule_override_min_weight),
            ("blend_ml_weight", self.blend_ml_weight),
            ("blend_rule_weight", self.blend_rule_weight),
            ("medium_threshold", self.medium_threshold),
            ("high_threshold", self.high_threshold),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(eyre::eyre!(
                    "policy.{} must be within [0, 1], got {}",
                    name,
                    value
                ));
            }
        }

        if ((self.blend_ml_weight + self.blend_rule_weight) - 1.0).abs() > 1e-9 {
            return Err(eyre::eyre!(
                "policy blend weights must sum to 1.0, got {} + {}",
                self.blend_ml_weight,
                self.blend_rule_weight
            ));
        }
        if self.medium_threshold >= self.high_threshold {
            return Err(eyre::eyre!(
                "policy.medium_threshold ({}) must be below policy.high_threshold ({})",
                self.medium_threshold,
                self.high_threshold
            ));
        }
        Ok(())
    }
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_recent_log_capacity")]
    pub recent_log_capacity: usize,
    #[serde(default = "default_feedback_capacity")]
    pub feedback_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_api_port(),
            host: default_api_host(),
            recent_log_capacity: default_recent_log_capacity(),
            feedback_capacity: default_feedback_capacity(),
        }
    }
}

fn default_api_port() -> u16 {
    8000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_recent_log_capacity() -> usize {
    100
}

fn default_feedback_capacity() -> usize {
    500
}

/// Upper bound for the in-memory buffers; they are preallocated at startup.
pub const MAX_BUFFER_CAPACITY: usize = 10_000;

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.rules.path.trim().is_empty() {
            return Err(eyre::eyre!("rules.path must not be empty"));
        }
        if self.classifier.timeout_ms == 0 {
            return Err(eyre::eyre!("classifier.timeout_ms must be greater than 0"));
        }
        for (name, value) in [
            ("recent_log_capacity", self.api.recent_log_capacity),
            ("feedback_capacity", self.api.feedback_capacity),
        ] {
            if value == 0 || value > MAX_BUFFER_CAPACITY {
                return Err(eyre::eyre!(
                    "api.{} must be between 1 and {}, got {}",
                    name,
                    MAX_BUFFER_CAPACITY,
                    value
                ));
            }
        }
        self.policy.validate()
    }
}
