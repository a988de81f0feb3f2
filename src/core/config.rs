/*!
 * Configuration
 *
 * Context-level settings and the process-scoped key/value store
 */

use super::errors::{FinalizeError, FinalizeResult};
use super::limits::{
    FALLBACK_TEMP_DIRS, SHUTDOWN_FIRST_PASS_MIN_PRIORITY, SUN_PATH_MAX, TEMP_DIR_PREFIX,
    TEMP_DIR_PRIORITY,
};
use super::types::Priority;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings for a process context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ContextConfig {
    /// Prefix of the per-process temp directory name
    pub temp_dir_prefix: String,
    /// Exit priority of the temp-directory removal finalizer
    pub temp_dir_priority: Priority,
    /// Minimum priority of the first shutdown pass
    pub shutdown_min_priority: Priority,
    /// System-wide temp directories tried in order when the preferred base is too long
    pub fallback_temp_dirs: Vec<PathBuf>,
    /// AF_UNIX socket path limit, `None` when no sockets are created
    pub sun_path_max: Option<usize>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            temp_dir_prefix: TEMP_DIR_PREFIX.to_string(),
            temp_dir_priority: TEMP_DIR_PRIORITY,
            shutdown_min_priority: SHUTDOWN_FIRST_PASS_MIN_PRIORITY,
            fallback_temp_dirs: FALLBACK_TEMP_DIRS.iter().map(PathBuf::from).collect(),
            sun_path_max: SUN_PATH_MAX,
        }
    }
}

impl ContextConfig {
    /// Parse settings from JSON, missing fields take their defaults
    pub fn from_json(json: &str) -> FinalizeResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| FinalizeError::InvalidConfiguration(format!("context config: {}", e)))
    }

    #[inline]
    #[must_use]
    pub fn with_temp_dir_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_dir_prefix = prefix.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_sun_path_max(mut self, max: Option<usize>) -> Self {
        self.sun_path_max = max;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_fallback_temp_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.fallback_temp_dirs = dirs;
        self
    }
}

/// Process-scoped configuration store
///
/// Cloning shares the underlying map. A forked child inherits a copy of
/// the parent's values; there is no cross-process synchronization.
#[derive(Debug, Clone, Default)]
pub struct ProcessConfig {
    values: Arc<DashMap<String, Value>>,
}

impl ProcessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    /// Store a value; `Value::Null` clears the key
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if value.is_null() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.remove(key).map(|(_, v)| v)
    }

    pub fn clear(&self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
