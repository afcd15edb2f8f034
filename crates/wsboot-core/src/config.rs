use crate::error::{Result, WorkspaceError};
use crate::paths;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// BootstrapConfig
// ---------------------------------------------------------------------------

/// Tool settings read from `.wsboot.yaml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_tier", deserialize_with = "tier_from_yaml")]
    pub default_tier: Tier,
    /// Directory holding named template trees; relative paths resolve
    /// against the config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_workspace: Option<String>,
}

fn default_tier() -> Tier {
    Tier::Lite
}

/// Accept `2`, `"2"` or `standard`.
fn tier_from_yaml<'de, D>(deserializer: D) -> std::result::Result<Tier, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u8),
        Text(String),
    }
    let raw = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    };
    raw.parse().map_err(serde::de::Error::custom)
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            default_tier: default_tier(),
            templates_dir: None,
            parent_workspace: None,
        }
    }
}

impl BootstrapConfig {
    /// Load `explicit` if given (it must exist), otherwise `cwd/.wsboot.yaml`
    /// if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let path = match explicit {
            Some(p) => {
                if !p.is_file() {
                    return Err(WorkspaceError::Configuration(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => {
                let p = cwd.join(paths::CONFIG_FILE);
                if !p.is_file() {
                    return Ok(Self::default());
                }
                p
            }
        };
        let data = std::fs::read_to_string(&path)?;
        let mut cfg = Self::parse(&data).map_err(|e| {
            WorkspaceError::Configuration(format!("{}: {e}", path.display()))
        })?;
        if let (Some(dir), Some(base)) = (&cfg.templates_dir, path.parent()) {
            if dir.is_relative() {
                cfg.templates_dir = Some(base.join(dir));
            }
        }
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn parse(data: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config.
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if let Some(dir) = &self.templates_dir {
            if !dir.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("templates_dir '{}' does not exist", dir.display()),
                });
            }
        }
        if let Some(parent) = &self.parent_workspace {
            if parent.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "parent_workspace is set but empty".to_string(),
                });
            }
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
