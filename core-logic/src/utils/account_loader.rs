use crate::error::ConfigError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Loads newline-delimited account identifiers.
pub struct AccountLoader;

impl AccountLoader {
    /// Looks for `path` in the current directory first, then at the
    /// workspace root (`../..`), so the binary works from either place.
    pub fn resolve(path: &str) -> Option<PathBuf> {
        let candidates = [PathBuf::from(path), PathBuf::from("../..").join(path)];
        candidates.into_iter().find(|p| p.is_file())
    }

    pub fn load(path: &str) -> Result<Vec<String>, ConfigError> {
        let resolved = Self::resolve(path).ok_or_else(|| ConfigError::FileNotFound {
            path: path.to_string(),
        })?;
        Self::load_from(&resolved)
    }

    /// Trims lines, skips blanks and `#` comments and drops duplicates while
    /// keeping the order of first appearance.
    pub fn load_from(path: &Path) -> Result<Vec<String>, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            msg: e.to_string(),
        })?;

        let mut seen = HashSet::new();
        let mut accounts = Vec::new();
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if !seen.insert(trimmed.to_string()) {
                warn!("Skipping duplicate account entry in {}", path.display());
                continue;
            }
            accounts.push(trimmed.to_string());
        }

        if accounts.is_empty() {
            return Err(ConfigError::Empty {
                path: path.display().to_string(),
            });
        }

        info!("Loaded {} accounts from {}", accounts.len(), path.display());
        Ok(accounts)
    }
}
