/*!
 * Process Context Builder
 * Builder pattern for ProcessContext construction
 */

use super::ProcessContext;
use crate::core::config::{ContextConfig, ProcessConfig};
use crate::finalize::FinalizerRegistry;
use crate::fork::AfterForkRegistry;
use crate::process::{OsProcessIdentity, ProcessIdentity, ProcessRegistry, ShutdownSequencer};
use crate::tempdir::{OsFileSystem, TempDirectoryLifecycle, TempFileSystem};
use std::sync::Arc;
use tracing::info;

/// Builder for ProcessContext
pub struct ProcessContextBuilder {
    config: ContextConfig,
    process_registry: Option<Arc<dyn ProcessRegistry>>,
    filesystem: Option<Arc<dyn TempFileSystem>>,
    identity: Option<Arc<dyn ProcessIdentity>>,
}

impl ProcessContextBuilder {
    /// Create a new ProcessContext builder
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
            process_registry: None,
            filesystem: None,
            identity: None,
        }
    }

    /// Use custom settings
    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a process registry for child teardown at shutdown
    pub fn with_process_registry(mut self, registry: Arc<dyn ProcessRegistry>) -> Self {
        self.process_registry = Some(registry);
        self
    }

    /// Replace the filesystem used for the temp directory
    pub fn with_filesystem(mut self, filesystem: Arc<dyn TempFileSystem>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    /// Replace the current-pid source
    pub fn with_identity(mut self, identity: Arc<dyn ProcessIdentity>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Build the ProcessContext
    pub fn build(self) -> ProcessContext {
        let identity = self.identity.unwrap_or_else(|| Arc::new(OsProcessIdentity));
        let filesystem = self.filesystem.unwrap_or_else(|| Arc::new(OsFileSystem));

        let finalizers = FinalizerRegistry::new(Arc::clone(&identity));
        let process_config = ProcessConfig::new();

        let temp_dir = TempDirectoryLifecycle::new(
            self.config.clone(),
            process_config.clone(),
            filesystem,
            finalizers.clone(),
        );

        let sequencer = Arc::new(ShutdownSequencer::new(
            finalizers.clone(),
            self.process_registry,
            self.config.shutdown_min_priority,
        ));

        info!(pid = identity.current_pid(), "process context initialized");

        ProcessContext {
            config: self.config,
            process_config,
            identity,
            finalizers,
            after_fork: AfterForkRegistry::new(),
            sequencer,
            temp_dir,
        }
    }
}

impl Default for ProcessContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
