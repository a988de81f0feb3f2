/*!
 * Temp Directory Lifecycle
 *
 * One lazily created temp directory per process, removed by a
 * low-priority finalizer so it outlives every ordinary resource and is
 * cleaned up last in a full shutdown run.
 *
 * The base directory is chosen so that socket files placed inside it,
 * `<base>/<prefix>XXXXXXXX/sock-XXXXXXXX`, fit the platform's AF_UNIX
 * path limit.
 */

mod fs;
mod socket;

pub use fs::{OsFileSystem, TempFileSystem};
pub use socket::{is_abstract_socket_namespace, sun_path_max, supports_abstract_sockets};

use crate::core::config::{ContextConfig, ProcessConfig};
use crate::core::errors::FinalizeResult;
use crate::core::limits::{RANDOM_SUFFIX_LEN, SOCKET_COMPONENT_LEN, TEMP_DIR_CONFIG_KEY};
use crate::finalize::FinalizerRegistry;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Creates and memoizes the per-process temp directory
pub struct TempDirectoryLifecycle {
    settings: ContextConfig,
    config: ProcessConfig,
    fs: Arc<dyn TempFileSystem>,
    finalizers: FinalizerRegistry,
    create_lock: Mutex<()>,
}

impl TempDirectoryLifecycle {
    pub fn new(
        settings: ContextConfig,
        config: ProcessConfig,
        fs: Arc<dyn TempFileSystem>,
        finalizers: FinalizerRegistry,
    ) -> Self {
        Self {
            settings,
            config,
            fs,
            finalizers,
            create_lock: Mutex::new(()),
        }
    }

    /// The memoized path, if this process already created one
    pub fn current(&self) -> Option<PathBuf> {
        match self.config.get(TEMP_DIR_CONFIG_KEY) {
            Some(Value::String(path)) => Some(PathBuf::from(path)),
            _ => None,
        }
    }

    /// Return this process's temp directory, creating it on first use
    pub fn get_temp_dir(&self) -> FinalizeResult<PathBuf> {
        if let Some(path) = self.current() {
            return Ok(path);
        }

        let _creating = self.create_lock.lock();
        if let Some(path) = self.current() {
            return Ok(path);
        }

        let base = self.base_temp_dir();
        let path = self.fs.make_unique_dir(&base, &self.settings.temp_dir_prefix)?;
        info!("created temp directory {}", path.display());

        let display = path.to_string_lossy().into_owned();
        let fs = Arc::clone(&self.fs);
        let config = self.config.clone();
        let target = path.clone();

        self.finalizers
            .finalizer(move |_, _| {
                fs.remove_tree(&target)?;
                config.remove(TEMP_DIR_CONFIG_KEY);
                Ok(Value::Null)
            })
            .name("remove_temp_dir")
            .arg(display.clone())
            .priority(self.settings.temp_dir_priority)
            .register()?;

        self.config.set(TEMP_DIR_CONFIG_KEY, Value::String(display));
        Ok(path)
    }

    /// Length of the longest socket path the directory will host under `base`
    pub fn socket_path_len(&self, base: &Path) -> usize {
        base.as_os_str().len()
            + 1
            + self.settings.temp_dir_prefix.len()
            + RANDOM_SUFFIX_LEN
            + SOCKET_COMPONENT_LEN
    }

    /// Pick the base directory for the temp directory
    ///
    /// Prefers the user's temp directory; falls back to the first usable
    /// system-wide directory when socket paths would be too long there.
    pub fn base_temp_dir(&self) -> PathBuf {
        let preferred = self.fs.default_temp_dir();

        let Some(max) = self.settings.sun_path_max else {
            return preferred;
        };

        if self.socket_path_len(&preferred) <= max {
            return preferred;
        }

        let fallback = self
            .settings
            .fallback_temp_dirs
            .iter()
            .find(|dir| self.fs.is_usable_dir(dir));

        match fallback {
            Some(dir) => {
                warn!("Ignoring user-defined temporary directory: {}", preferred.display());
                dir.clone()
            }
            None => {
                warn!(
                    "Process-wide temporary directory {} will not be usable for creating socket \
                     files and no usable system-wide temporary directory was found in {:?}",
                    preferred.display(),
                    self.settings.fallback_temp_dirs
                );
                preferred
            }
        }
    }
}
