//! Configuration management for the XFS quota manager
//!
//! Settings are loaded from config.toml with environment overrides
//! (prefix `XQM`, nested keys separated by `__`), e.g.
//!
//! ```toml
//! [root_volumes.scratch]
//! path = "/data/scratch"
//! per_user_quota = 1073741824
//!
//! [xfs]
//! projects_file = "/etc/projects"
//! projid_file = "/etc/projid"
//! command = ["sudo", "xfs_quota"]
//! ```

use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete quota manager configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Managed filesystem trees, keyed by root volume name
    pub root_volumes: HashMap<String, RootVolume>,

    /// Backend settings for the xfs_quota wrapper
    #[serde(default)]
    pub xfs: XfsSettings,
}

/// A managed filesystem tree and the quota policy applied inside it
#[derive(Debug, Deserialize, Clone)]
pub struct RootVolume {
    /// Absolute path of the root volume on disk
    pub path: String,

    /// Quota in bytes for each depth-1 user folder, 0 to disable
    #[serde(default)]
    pub per_user_quota: u64,

    /// Quota in bytes for each depth-2 user volume folder, 0 to disable
    #[serde(default)]
    pub per_volume_quota: u64,
}

/// Settings for invoking xfs_quota and maintaining its project files
#[derive(Debug, Deserialize, Clone)]
pub struct XfsSettings {
    /// Project file mapping numeric ids to directories
    #[serde(default = "default_projects_file")]
    pub projects_file: PathBuf,

    /// Project file mapping directories to numeric ids
    #[serde(default = "default_projid_file")]
    pub projid_file: PathBuf,

    /// Optional mount point arguments appended to every invocation.
    /// When unset, xfs_quota operates on all mounted XFS filesystems.
    #[serde(default)]
    pub mounted_filesystems: Option<String>,

    /// Command prefix used to run xfs_quota
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Seconds to wait for an invocation before killing it
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Capacity of the quota mutation queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_projects_file() -> PathBuf {
    PathBuf::from("/etc/projects")
}

fn default_projid_file() -> PathBuf {
    PathBuf::from("/etc/projid")
}

fn default_command() -> Vec<String> {
    vec!["sudo".to_string(), "xfs_quota".to_string()]
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    20
}

impl Default for XfsSettings {
    fn default() -> Self {
        XfsSettings {
            projects_file: default_projects_file(),
            projid_file: default_projid_file(),
            mounted_filesystems: None,
            command: default_command(),
            command_timeout_secs: default_command_timeout_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Settings {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        // Try installed path first, then development path
        let config_paths = vec![
            "/etc/xfs-quota-manager/config", // packaged install
            "config",                        // local development: ./config.toml
        ];

        let mut last_error = None;

        for config_path in &config_paths {
            match Config::builder()
                .add_source(File::with_name(config_path))
                .add_source(Environment::with_prefix("XQM").separator("__"))
                .build()
            {
                Ok(settings) => {
                    let settings: Settings = settings.try_deserialize()?;
                    settings.validate()?;
                    return Ok(settings);
                }
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            config::ConfigError::Message(format!(
                "no config file found, tried {config_paths:?}"
            ))
        }))
    }

    /// Look up a root volume by name
    pub fn volume(&self, name: &str) -> Option<&RootVolume> {
        self.root_volumes.get(name)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        for (name, volume) in &self.root_volumes {
            if volume.path.trim().is_empty() {
                return Err(config::ConfigError::Message(format!(
                    "root volume '{name}' has a blank path"
                )));
            }

            if volume.per_user_quota != 0 && volume.per_volume_quota != 0 {
                return Err(config::ConfigError::Message(format!(
                    "root volume '{name}' cannot set both per_user_quota and per_volume_quota"
                )));
            }
        }

        if self.xfs.command.is_empty() {
            return Err(config::ConfigError::Message(
                "xfs.command cannot be empty".into(),
            ));
        }

        if self.xfs.command_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "xfs.command_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.xfs.queue_capacity == 0 {
            return Err(config::ConfigError::Message(
                "xfs.queue_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl RootVolume {
    /// Get the root volume path as a Path
    pub fn root_path(&self) -> &Path {
        Path::new(&self.path)
    }
}

impl XfsSettings {
    /// Get the command timeout as a Duration
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_in_xfs_section() {
        let settings = parse(
            r#"
            [root_volumes.scratch]
            path = "/data/scratch"
            per_user_quota = 1073741824
            "#,
        );

        assert_eq!(settings.xfs.projects_file, PathBuf::from("/etc/projects"));
        assert_eq!(settings.xfs.projid_file, PathBuf::from("/etc/projid"));
        assert_eq!(settings.xfs.command, vec!["sudo", "xfs_quota"]);
        assert_eq!(settings.xfs.command_timeout_secs, 30);
        assert_eq!(settings.xfs.queue_capacity, 20);
        assert!(settings.xfs.mounted_filesystems.is_none());
        assert!(settings.validate().is_ok());

        let scratch = settings.volume("scratch").unwrap();
        assert_eq!(scratch.per_user_quota, 1_073_741_824);
        assert_eq!(scratch.per_volume_quota, 0);
    }

    #[test]
    fn test_rejects_both_quota_levels() {
        let settings = parse(
            r#"
            [root_volumes.scratch]
            path = "/data/scratch"
            per_user_quota = 1024
            per_volume_quota = 2048
            "#,
        );

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_blank_volume_path() {
        let settings = parse(
            r#"
            [root_volumes.scratch]
            path = "  "
            "#,
        );

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_queue_capacity() {
        let settings = parse(
            r#"
            [root_volumes.scratch]
            path = "/data/scratch"

            [xfs]
            queue_capacity = 0
            "#,
        );

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_volume_lookup_misses_unknown_name() {
        let settings = parse(
            r#"
            [root_volumes.scratch]
            path = "/data/scratch"
            "#,
        );

        assert!(settings.volume("persistent").is_none());
    }
}
