//! TOML-based application configuration.
//!
//! Holds:
//! - Stats API endpoint and credentials
//! - Feedback preferences (speech, haptics, phrases)
//! - Per-game round parameters, seeded with the built-in presets
//!
//! Configuration is stored at `~/.config/roundkit/config.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::input::Evaluator;
use crate::report::{ScoringRules, XpPolicy};
use crate::round::{MotionRule, RoundConfig, SwipeRule, TargetLayout};
use crate::target::{Direction, SwipeBand};

/// Where finished session results are sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token; empty means no `Authorization` header.
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Speech and haptic preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_true")]
    pub speech_enabled: bool,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "default_true")]
    pub haptics_enabled: bool,
    /// Spoken after a hit, rotated by round.
    #[serde(default = "default_praise")]
    pub praise: Vec<String>,
    /// Spoken after a miss or an ambiguous gesture, rotated by round.
    #[serde(default = "default_encouragement")]
    pub encouragement: Vec<String>,
    #[serde(default = "default_early_phrase")]
    pub early_phrase: String,
    #[serde(default = "default_late_phrase")]
    pub late_phrase: String,
    #[serde(default = "default_timeout_phrase")]
    pub timeout_phrase: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/roundkit/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stats_api: StatsApiConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    /// Game presets keyed by game id.
    #[serde(default = "builtin_games")]
    pub games: BTreeMap<String, RoundConfig>,
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:8080/api".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_speech_rate() -> f32 {
    0.9
}
fn default_praise() -> Vec<String> {
    ["Great job!", "Well done!", "Awesome!", "You got it!"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_encouragement() -> Vec<String> {
    ["Try again!", "Almost!", "Keep going!"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_early_phrase() -> String {
    "A little later!".into()
}
fn default_late_phrase() -> String {
    "A little sooner!".into()
}
fn default_timeout_phrase() -> String {
    "Let's try the next one!".into()
}

impl Default for StatsApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            auth_token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            speech_enabled: true,
            speech_rate: default_speech_rate(),
            haptics_enabled: true,
            praise: default_praise(),
            encouragement: default_encouragement(),
            early_phrase: default_early_phrase(),
            late_phrase: default_late_phrase(),
            timeout_phrase: default_timeout_phrase(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stats_api: StatsApiConfig::default(),
            feedback: FeedbackConfig::default(),
            games: builtin_games(),
        }
    }
}

/// The presets shipped with roundkit.
pub fn builtin_games() -> BTreeMap<String, RoundConfig> {
    let reaction = RoundConfig {
        target_size: 100.0,
        ready_delay_ms: 500,
        response_timeout_ms: Some(3_000),
        skill_tags: vec!["reaction".into(), "motor".into()],
        ..RoundConfig::new("reaction", Evaluator::Position { tolerance_px: 50.0 })
    };

    let rhythm = RoundConfig {
        response_timeout_ms: Some(2_000),
        countdown_interval_ms: Some(1_000),
        skill_tags: vec!["rhythm".into(), "timing".into()],
        ..RoundConfig::new(
            "rhythm",
            Evaluator::Timing {
                beat_interval_ms: 1_000,
                tolerance_fraction: 0.3,
            },
        )
    };

    let swipe = RoundConfig {
        target_size: 120.0,
        response_timeout_ms: Some(5_000),
        swipe: Some(SwipeRule {
            bands: vec![SwipeBand::Small, SwipeBand::Big],
            directions: vec![Direction::Up, Direction::Down, Direction::Left, Direction::Right],
        }),
        skill_tags: vec!["motor".into(), "spatial".into()],
        ..RoundConfig::new(
            "swipe",
            Evaluator::Displacement {
                small_threshold_px: 80.0,
                big_threshold_px: 200.0,
                small_max_px: None,
                min_speed_px_per_s: None,
            },
        )
    };

    let color_match = RoundConfig {
        layout: TargetLayout::Matching {
            categories: ["red", "blue", "green", "yellow", "purple"]
                .into_iter()
                .map(String::from)
                .collect(),
            distractors: 2,
            min_separation: 120.0,
            max_attempts: 30,
            avoid_repeat_correct: true,
        },
        response_timeout_ms: Some(6_000),
        scoring: ScoringRules {
            xp: XpPolicy::LumpSum {
                xp: 50,
                min_accuracy: 0.5,
            },
            ..ScoringRules::default()
        },
        skill_tags: vec!["colors".into(), "matching".into()],
        ..RoundConfig::new("color-match", Evaluator::Position { tolerance_px: 20.0 })
    };

    let follow_dot = RoundConfig {
        target_size: 90.0,
        response_timeout_ms: Some(4_000),
        motion: Some(MotionRule {
            min_speed: 60.0,
            max_speed: 160.0,
        }),
        skill_tags: vec!["tracking".into(), "motor".into()],
        ..RoundConfig::new("follow-dot", Evaluator::Position { tolerance_px: 30.0 })
    };

    [reaction, rhythm, swipe, color_match, follow_dot]
        .into_iter()
        .map(|game| (game.game_id.clone(), game))
        .collect()
}

/// Per-game fields that are left out of the file while unset.
const OPTIONAL_GAME_KEYS: [&str; 4] = [
    "response_timeout_ms",
    "countdown_interval_ms",
    "motion",
    "swipe",
];

/// Written as the value of an unset optional field.
const UNSET: &str = "none";

/// `games.<id>.<field>` where `<field>` may be absent.
fn is_optional_game_key(key: &str) -> bool {
    let parts: Vec<&str> = key.split('.').collect();
    matches!(parts.as_slice(), ["games", _, field] if OPTIONAL_GAME_KEYS.contains(field))
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                if is_optional_game_key(key) {
                    let new_value = if value == UNSET {
                        serde_json::Value::Null
                    } else {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    };
                    obj.insert(part.to_string(), new_value);
                    return Ok(());
                }
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `config.toml` inside [`data_dir`].
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing the defaults there when no
    /// file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Every game preset must be valid and filed under its own id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stats_api.enabled && self.stats_api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "stats_api.timeout_secs".into(),
                message: "must be positive when the stats API is enabled".into(),
            });
        }
        for (id, game) in &self.games {
            if *id != game.game_id {
                return Err(ConfigError::InvalidValue {
                    key: format!("games.{id}.game_id"),
                    message: format!("'{}' does not match the table name", game.game_id),
                });
            }
            game.validate()?;
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    ///
    /// Unset optional game fields read as `none`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let Some(val) = Self::get_json_value_by_path(&json, key) else {
            let game = key.split('.').nth(1)?;
            return (is_optional_game_key(key) && self.games.contains_key(game))
                .then(|| UNSET.to_string());
        };
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, typed by the current value.
    ///
    /// Optional game fields (`response_timeout_ms`, `countdown_interval_ms`,
    /// `motion`, `swipe`) take a JSON value even while unset, and `none`
    /// clears them.
    ///
    /// The change is applied in memory only; call [`Config::save`] to
    /// persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result no longer validates.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Look up a game preset.
    pub fn game(&self, id: &str) -> Result<&RoundConfig, ConfigError> {
        self.games
            .get(id)
            .ok_or_else(|| ConfigError::UnknownGame(id.to_string()))
    }
}
