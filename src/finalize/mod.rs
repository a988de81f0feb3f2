/*!
 * Finalization
 *
 * Cleanup actions that run exactly once: when their owning guard drops,
 * when invoked explicitly, or during shutdown.
 *
 * ## Example
 *
 * ```ignore
 * let registry = FinalizerRegistry::new(Arc::new(OsProcessIdentity));
 *
 * // Object-bound: runs when `socket` is dropped
 * let socket = registry
 *     .finalizer(move |_, _| { unlink(&path)?; Ok(Value::Null) })
 *     .guard(listener)?;
 *
 * // Priority-bound: runs at shutdown, highest priority first
 * registry.finalizer(flush_journal).priority(10).register()?;
 * registry.run_finalizers(None);
 * ```
 */

mod builder;
mod entry;
mod guard;
mod handle;
mod registry;

pub use builder::FinalizerBuilder;
pub use entry::{Callback, FinalizationEntry, OwnerRef};
pub use guard::FinalizeGuard;
pub use handle::Finalizer;
pub use registry::{BatchReport, FinalizerRegistry};
