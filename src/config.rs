//! `.jnkn/config.yaml` loading, per spec §6's configuration table. The
//! recognized keys are closed — `serde(deny_unknown_fields)` rejects
//! anything else, and `stitcher.rules` entries are checked against the
//! recognized rule-name set on top of that, since YAML alone can't close
//! that particular set.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const RECOGNIZED_STITCHER_RULES: &[&str] = &["env_to_infra", "infra_to_config", "infra_to_infra", "data_alias"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unrecognized stitcher rule {0:?}")]
    UnknownRule(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub version: u32,
    pub project_name: String,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub stitcher: StitcherConfig,
    #[serde(default)]
    pub risk: RiskConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScanConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub min_confidence: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            include: Vec::new(),
            exclude: default_scan_excludes(),
            min_confidence: 0.5,
        }
    }
}

fn default_scan_excludes() -> Vec<String> {
    ["**/.venv/**", "**/venv/**", "**/node_modules/**", "**/__pycache__/**", "**/dist/**", "**/build/**"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StitcherConfig {
    pub rules: Vec<String>,
    pub min_overlap_tokens: usize,
    pub weak_tokens: Vec<String>,
}

impl Default for StitcherConfig {
    fn default() -> Self {
        StitcherConfig {
            rules: RECOGNIZED_STITCHER_RULES.iter().map(|s| s.to_string()).collect(),
            min_overlap_tokens: 1,
            weak_tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RiskConfig {
    pub critical_paths: Vec<String>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Config =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for rule in &self.stitcher.rules {
            if !RECOGNIZED_STITCHER_RULES.contains(&rule.as_str()) {
                return Err(ConfigError::UnknownRule(rule.clone()));
            }
        }
        Ok(())
    }

    /// Build the stitcher's own `MatchConfig` from the loaded settings.
    pub fn match_config(&self) -> jnkn_stitch::MatchConfig {
        let mut match_config = jnkn_stitch::MatchConfig {
            min_confidence: self.scan.min_confidence,
            min_overlap_tokens: self.stitcher.min_overlap_tokens,
            weak_tokens: self.stitcher.weak_tokens.iter().cloned().collect(),
            enabled_rules: self.stitcher.rules.iter().cloned().collect(),
            ..Default::default()
        };
        if match_config.enabled_rules.is_empty() {
            match_config.enabled_rules = RECOGNIZED_STITCHER_RULES.iter().map(|s| s.to_string()).collect();
        }
        match_config
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: 1,
            project_name: "unnamed".to_string(),
            scan: ScanConfig::default(),
            stitcher: StitcherConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "version: 1\nproject_name: demo\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.project_name, "demo");
        assert_eq!(config.scan.min_confidence, 0.5);
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "version: 1\nproject_name: demo\nbogus: true\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn rejects_unrecognized_stitcher_rule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "version: 1\nproject_name: demo\nstitcher:\n  rules: [\"not_a_rule\"]\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::UnknownRule(_))));
    }
}
