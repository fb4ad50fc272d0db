//! Server configuration: an optional JSON file overlaid by the environment.
//!
//! Loading goes through the `config` crate. The file named by
//! `$WHODUNIT_CONFIG` is read first, then every `WHODUNIT_*` variable is
//! applied on top, with `__` separating nested keys:
//!
//! ```text
//! WHODUNIT_BIND=0.0.0.0:9000
//! WHODUNIT_BLEND_IN__CLUE_ROUNDS=2
//! WHODUNIT_ELIMINATION__MIN_PLAYERS=5
//! ```

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use whodunit_room::{GameRules, WordBank, WordBankError};

/// Names the JSON config file to load.
pub const CONFIG_ENV: &str = "WHODUNIT_CONFIG";

/// Overrides `bind` from the file.
pub const BIND_ENV: &str = "WHODUNIT_BIND";

/// Prefix shared by every environment override.
const ENV_PREFIX: &str = "WHODUNIT";

/// Everything the binary needs to start a server.
///
/// ```json
/// {
///   "bind": "0.0.0.0:8080",
///   "blend_in": { "clue_rounds": 2 },
///   "elimination": { "min_players": 5 },
///   "words": "words.json"
/// }
/// ```
///
/// Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub blend_in: GameRules,
    pub elimination: GameRules,
    /// A JSON category corpus replacing the built-in one.
    pub words: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            blend_in: GameRules::default(),
            elimination: GameRules::default(),
            words: None,
        }
    }
}

/// Errors loading a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or parsed, or a value has the wrong type.
    #[error("invalid config: {0}")]
    Load(#[from] config::ConfigError),
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from_str(json, FileFormat::Json)))
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(json_file(path)))
    }

    /// Loads from `$WHODUNIT_CONFIG` if set, then applies `WHODUNIT_*`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::from_sources(path.as_deref(), None)
    }

    /// Defaults, overlaid by the file at `path`, overlaid by the
    /// environment.
    ///
    /// `vars` stands in for the process environment when given.
    pub fn from_sources(
        path: Option<&Path>,
        vars: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(json_file(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(vars),
        );
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    /// The configured corpus, or the built-in one.
    pub fn load_words(&self) -> Result<WordBank, WordBankError> {
        match &self.words {
            Some(path) => WordBank::from_path(path),
            None => Ok(WordBank::default()),
        }
    }
}

/// A named file is always JSON and must exist.
fn json_file(path: &Path) -> File<config::FileSourceFile, FileFormat> {
    File::from(path).format(FileFormat::Json).required(true)
}
