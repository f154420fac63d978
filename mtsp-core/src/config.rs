//! Configuration types for MTSP simulations

use crate::agent::DEFAULT_AGENT_PREFIX;
use crate::directory::{SERVICE_NAME, SERVICE_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Agent count used when none (or a malformed one) is given
pub const DEFAULT_AGENTS: usize = 3;

/// Node count used when none (or a malformed one) is given
pub const DEFAULT_NODES: usize = 10;

/// Start node used when none (or a malformed one) is given
pub const DEFAULT_START_NODE: usize = 0;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MtspConfig {
    /// Simulation parameters
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Supervisor runtime limits
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Directory advertisement
    #[serde(default)]
    pub directory: DirectoryConfig,
}

/// Simulation parameters shared by every agent of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// Number of agents in the ring
    pub agents: usize,

    /// Number of graph nodes
    pub nodes: usize,

    /// Shared graph seed; taken from the clock when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Agent name prefix (`<prefix>-<id>`)
    pub prefix: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agents: DEFAULT_AGENTS,
            nodes: DEFAULT_NODES,
            seed: None,
            prefix: DEFAULT_AGENT_PREFIX.to_string(),
        }
    }
}

/// Supervisor runtime limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// How long the supervisor waits for a run to finish before reporting it stuck
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// How long the supervisor waits for agent tasks to exit after shutdown
    #[serde(with = "humantime_serde")]
    pub shutdown: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            shutdown: Duration::from_secs(5),
        }
    }
}

/// Capability advertised in the directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryConfig {
    pub service: String,
    pub name: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            service: SERVICE_TYPE.to_string(),
            name: SERVICE_NAME.to_string(),
        }
    }
}

impl MtspConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (mtsp.toml, then the path in MTSP_CONFIG_PATH)
    /// 3. Environment variable overrides (`MTSP_SIMULATION_AGENTS=5`, ...)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid.
    pub fn load() -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(MtspConfig::default()))
            .merge(Toml::file("mtsp.toml"));

        if let Ok(path) = std::env::var("MTSP_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: MtspConfig = figment
            .merge(Env::prefixed("MTSP_").ignore(&["CONFIG_PATH"]).split("_"))
            .extract()
            .map_err(|e| {
                crate::error::MtspError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: MtspConfig = Figment::from(Serialized::defaults(MtspConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                crate::error::MtspError::Configuration(format!(
                    "Failed to load configuration file: {}",
                    e
                ))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty ring, an empty graph or an empty prefix.
    pub fn validate(&self) -> crate::error::Result<()> {
        let sim = &self.simulation;
        if sim.agents == 0 {
            return Err(crate::error::MtspError::Configuration(
                "simulation.agents must be at least 1".to_string(),
            ));
        }
        if sim.nodes == 0 {
            return Err(crate::error::MtspError::Configuration(
                "simulation.nodes must be at least 1".to_string(),
            ));
        }
        if sim.prefix.is_empty() || sim.prefix.contains('-') {
            return Err(crate::error::MtspError::Configuration(format!(
                "simulation.prefix {:?} must be non-empty and contain no '-'",
                sim.prefix
            )));
        }
        Ok(())
    }
}
