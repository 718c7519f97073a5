//! JSON Configuration
//!
//! Reads the workflow pipeline configuration. The file is never written.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::WorkflowConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::workflow_config_path;

/// Read-only configuration service for the workflow pipeline
#[derive(Debug, Clone)]
pub struct ConfigService {
    config_path: PathBuf,
    config: WorkflowConfig,
}

impl ConfigService {
    /// Load `~/.changeflow/workflow.json`, or defaults when it does not exist
    pub fn load() -> AppResult<Self> {
        Self::from_path(workflow_config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn from_path(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            tracing::debug!(path = %config_path.display(), "no workflow config, using defaults");
            WorkflowConfig::default()
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    fn load_from_file(path: &Path) -> AppResult<WorkflowConfig> {
        let content = fs::read_to_string(path)?;
        let config: WorkflowConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| AppError::config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Re-read the file; the current values are kept when it fails to load
    pub fn reload(&mut self) -> AppResult<()> {
        if self.config_path.exists() {
            self.config = Self::load_from_file(&self.config_path)?;
        }
        Ok(())
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            config: WorkflowConfig::default(),
        }
    }
}
