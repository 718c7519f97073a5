//! Cross-Platform Path Utilities
//!
//! Functions for resolving the changeflow configuration location.

use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the changeflow directory (~/.changeflow/)
pub fn changeflow_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".changeflow"))
}

/// Get the workflow config file path (~/.changeflow/workflow.json)
pub fn workflow_config_path() -> AppResult<PathBuf> {
    Ok(changeflow_dir()?.join("workflow.json"))
}
