//! Run configuration, read from TOML.
//!
//! ```toml
//! [solver]
//! backend = "external"
//! command = "gophersat"
//!
//! [explore]
//! max_steps = 2000
//!
//! [mission]
//! max_rounds = 8
//! detection_cost = 5
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub explore: ExploreConfig,
    #[serde(default)]
    pub mission: MissionConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    InProcess,
    External,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Executable invoked as `command <file.cnf>` by the external backend.
    #[serde(default = "default_command")]
    pub command: String,
}

fn default_command() -> String {
    "gophersat".into()
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            command: default_command(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExploreConfig {
    /// Moves allowed before exploration gives up.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    2000
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MissionConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Route cost of one unsuited step through a guard's sight.
    #[serde(default = "default_detection_cost")]
    pub detection_cost: u32,
}

fn default_max_rounds() -> usize {
    8
}
fn default_detection_cost() -> u32 {
    5
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            detection_cost: default_detection_cost(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };
        if self.solver.backend == BackendKind::External && self.solver.command.trim().is_empty() {
            return invalid("solver.command must name an executable");
        }
        if self.explore.max_steps == 0 {
            return invalid("explore.max_steps must be positive");
        }
        if self.mission.max_rounds == 0 {
            return invalid("mission.max_rounds must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendKind, Config};
    use crate::error::ConfigError;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.solver.backend, BackendKind::InProcess);
        assert_eq!(config.solver.command, "gophersat");
        assert_eq!(config.mission.detection_cost, 5);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml(
            "[solver]\nbackend = \"external\"\ncommand = \"kissat\"\n[mission]\nmax_rounds = 3\n",
        )
        .unwrap();
        assert_eq!(config.solver.backend, BackendKind::External);
        assert_eq!(config.solver.command, "kissat");
        assert_eq!(config.mission.max_rounds, 3);
        assert_eq!(config.explore.max_steps, 2000);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_toml("[explore]\nmax_steps = 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            Config::from_toml("[solver]\nbackend = \"cloud\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml("[solver]\nbackend = \"external\"\ncommand = \" \"\n"),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
