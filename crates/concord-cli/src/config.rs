//! Configuration resolution
//!
//! Each setting is resolved in this order:
//! 1. Command-line flag (highest priority)
//! 2. Environment variable (`CONCORD_*`, read by clap)
//! 3. `concord.toml`
//! 4. Built-in default

use clap::Args;
use concord_core::logging_facility::Profile;
use concord_core::model::{LayerSet, LayerSpec, LinkCompareBehavior, SourceLabel};
use concord_store::{AnnotationRepository, SetStatus};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "concord.toml";
pub const DEFAULT_DB: &str = ".concord/concord.db";
pub const DEFAULT_CAS: &str = ".concord/cas";
pub const DEFAULT_MEASURE: &str = "cohen_kappa";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Options shared by every subcommand
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Config file (defaults to ./concord.toml when present)
    #[arg(long, global = true, env = "CONCORD_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true, env = "CONCORD_DB")]
    pub db: Option<PathBuf>,

    /// Content store directory
    #[arg(long, global = true, env = "CONCORD_CAS")]
    pub cas: Option<PathBuf>,

    /// development, production or test
    #[arg(long, global = true, env = "CONCORD_LOG_PROFILE")]
    pub log_profile: Option<String>,
}

/// Contents of `concord.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub db: Option<PathBuf>,
    pub cas: Option<PathBuf>,
    pub required_status: Option<String>,
    pub reference_source: Option<String>,
    pub link_compare: Option<String>,
    pub merge_incomplete: Option<bool>,
    pub exclude_incomplete: Option<bool>,
    pub measure: Option<String>,
    pub log_profile: Option<String>,
    pub layers: Vec<LayerSpec>,
}

impl FileConfig {
    /// Load `explicit`, or `./concord.toml` if it exists, or nothing
    ///
    /// An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub db: PathBuf,
    pub cas: PathBuf,
    pub log_profile: Profile,
    file: FileConfig,
}

impl Settings {
    pub fn resolve(global: &GlobalArgs) -> Result<Self, ConfigError> {
        let file = FileConfig::load(global.config.as_deref())?;
        Self::from_parts(global, file)
    }

    pub fn from_parts(global: &GlobalArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let db = global
            .db
            .clone()
            .or_else(|| file.db.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB));
        let cas = global
            .cas
            .clone()
            .or_else(|| file.cas.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CAS));
        let log_profile = match global.log_profile.as_ref().or(file.log_profile.as_ref()) {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                key: "log_profile",
                message,
            })?,
            None => Profile::Development,
        };
        Ok(Self {
            db,
            cas,
            log_profile,
            file,
        })
    }

    /// Open the repository, creating its directories on first use
    pub fn open_repository(&self) -> Result<AnnotationRepository, Box<dyn std::error::Error>> {
        if let Some(parent) = self.db.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.cas)?;
        Ok(AnnotationRepository::open(&self.db, &self.cas)?)
    }

    pub fn required_status(&self, flag: Option<SetStatus>) -> Result<SetStatus, ConfigError> {
        if let Some(status) = flag {
            return Ok(status);
        }
        match &self.file.required_status {
            Some(raw) => raw.parse().map_err(|e: concord_core::errors::ExError| {
                ConfigError::Invalid {
                    key: "required_status",
                    message: e.message().to_string(),
                }
            }),
            None => Ok(SetStatus::Finished),
        }
    }

    pub fn link_compare(
        &self,
        flag: Option<LinkCompareBehavior>,
    ) -> Result<LinkCompareBehavior, ConfigError> {
        if let Some(behavior) = flag {
            return Ok(behavior);
        }
        match &self.file.link_compare {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                key: "link_compare",
                message,
            }),
            None => Ok(LinkCompareBehavior::IncludeRole),
        }
    }

    pub fn reference_source(&self, flag: Option<String>) -> Option<SourceLabel> {
        flag.or_else(|| self.file.reference_source.clone())
            .map(SourceLabel::from)
    }

    pub fn merge_incomplete(&self, flag: Option<bool>) -> bool {
        flag.or(self.file.merge_incomplete).unwrap_or(false)
    }

    pub fn exclude_incomplete(&self, flag: Option<bool>) -> bool {
        flag.or(self.file.exclude_incomplete).unwrap_or(true)
    }

    pub fn measure(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.file.measure.clone())
            .unwrap_or_else(|| DEFAULT_MEASURE.to_string())
    }

    /// Layers named on the command line, else the `[[layers]]` of the config file
    pub fn layers(&self, flags: &[String]) -> Result<LayerSet, ConfigError> {
        if !flags.is_empty() {
            return Ok(LayerSet::from_names(flags.iter().cloned()));
        }
        if self.file.layers.is_empty() {
            return Err(ConfigError::Invalid {
                key: "layers",
                message: "no layers to compare; pass --layer or add [[layers]] to concord.toml"
                    .to_string(),
            });
        }
        LayerSet::from_specs(self.file.layers.iter().cloned()).map_err(|e| ConfigError::Invalid {
            key: "layers",
            message: e.to_string(),
        })
    }
}
