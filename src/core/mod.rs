/*!
 * Core Module
 * Fundamental types, limits, configuration and error handling
 */

pub mod config;
pub mod data_structures;
pub mod errors;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::{ContextConfig, ProcessConfig};
pub use data_structures::KeyedRegistry;
pub use errors::*;
pub use types::*;
