//! Server configuration and dictionary loading.
//!
//! TOML config, all keys optional:
//!
//! ```toml
//! default_category = "default"
//! seed = 42
//! word_bank = "data/words.json"
//!
//! [session]
//! min_players = 3
//! max_players = 10
//! spy_count = 1
//! leak_rule = "substring"   # or "any_character"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use undercover_engine::{CategoryError, SessionConfig, SessionConfigError, WordBank};

/// Category used when none is configured.
pub const DEFAULT_CATEGORY: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid server config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid word bank {}: {source}", path.display())]
    WordBank {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no word bank configured")]
    MissingWordBank,
    #[error(transparent)]
    Session(#[from] SessionConfigError),
    #[error(transparent)]
    Category(#[from] CategoryError),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Rules applied to every new session.
    pub session: SessionConfig,
    /// Process-wide category until changed at runtime.
    pub default_category: String,
    /// Seed for role and word draws. Absent means OS entropy.
    pub seed: Option<u64>,
    /// JSON dictionary of category → word pairs.
    pub word_bank: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            default_category: DEFAULT_CATEGORY.to_string(),
            seed: None,
            word_bank: None,
        }
    }
}

impl ServerConfig {
    /// Parse and validate a TOML config.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.session.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load the dictionary named by `word_bank`.
    pub fn load_word_bank(&self) -> Result<WordBank, ConfigError> {
        let path = self.word_bank.as_deref().ok_or(ConfigError::MissingWordBank)?;
        load_word_bank(path)
    }
}

/// Read a JSON dictionary from disk.
///
/// Malformed pairs are accepted here and reported when drawn; empty
/// categories are logged since no session could ever start with them.
pub fn load_word_bank(path: &Path) -> Result<WordBank, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bank = WordBank::from_json(&content).map_err(|source| ConfigError::WordBank {
        path: path.to_path_buf(),
        source,
    })?;

    if bank.is_empty() {
        warn!(path = %path.display(), "word bank has no categories");
    }
    for category in bank.categories() {
        if bank.pair_count(category) == Some(0) {
            warn!(path = %path.display(), category, "word category has no pairs");
        }
    }

    Ok(bank)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use undercover_engine::LeakRule;

    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(ServerConfig::from_toml_str("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = ServerConfig::from_toml_str(
            r#"
            default_category = "fruit"
            seed = 42

            [session]
            spy_count = 2
            min_players = 5
            leak_rule = "any_character"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_category, "fruit");
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.session.spy_count, 2);
        assert_eq!(config.session.min_players, 5);
        assert_eq!(config.session.max_players, 10);
        assert_eq!(config.session.leak_rule, LeakRule::AnyCharacter);
    }

    #[test]
    fn test_invalid_session_rules_rejected() {
        let err = ServerConfig::from_toml_str("[session]\nspy_count = 3\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Session(SessionConfigError::TooManySpies { .. })
        ));
    }

    #[test]
    fn test_two_player_minimum_rejected() {
        let err = ServerConfig::from_toml_str("[session]\nmin_players = 2\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Session(SessionConfigError::TooFewPlayers { min_players: 2 })
        ));
    }

    #[test]
    fn test_bad_toml_rejected() {
        let err = ServerConfig::from_toml_str("seed = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let bank_path = dir.path().join("words.json");
        fs::write(&bank_path, r#"{"default": [["sun", "moon"]], "empty": []}"#).unwrap();

        let config_path = dir.path().join("undercover.toml");
        let mut file = fs::File::create(&config_path).unwrap();
        writeln!(file, "word_bank = {:?}", bank_path.to_str().unwrap()).unwrap();

        let config = ServerConfig::load(&config_path).unwrap();
        let bank = config.load_word_bank().unwrap();
        assert!(bank.contains("default"));
        assert_eq!(bank.pair_count("empty"), Some(0));
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(ServerConfig::load(&missing), Err(ConfigError::Io { .. })));
        assert!(matches!(
            ServerConfig::default().load_word_bank(),
            Err(ConfigError::MissingWordBank)
        ));
    }

    #[test]
    fn test_malformed_word_bank() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"default\": \"not a list\"}").unwrap();
        let err = load_word_bank(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::WordBank { .. }));
        assert!(err.to_string().contains("invalid word bank"));
    }
}
