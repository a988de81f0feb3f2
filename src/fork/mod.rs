/*!
 * Fork Reinitialization
 * After-fork callbacks and types that repair themselves in a child process
 */

mod lock;
mod registry;

pub use lock::{ForkAwareLocal, ForkAwareLock};
pub use registry::{AfterForkHandle, AfterForkRegistry, ForkReport};
