/*!
 * Finalization Entries
 */

use crate::core::types::{Args, FinalizerKey, Kwargs, Pid, Priority};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;

/// Cleanup action: consumes its arguments, returns a result value
pub type Callback = Box<dyn FnOnce(Args, Kwargs) -> anyhow::Result<Value> + Send + 'static>;

/// Description of the object controlling an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    type_name: &'static str,
}

impl OwnerRef {
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// The owned part of an entry, taken exactly once
pub(crate) struct Payload {
    pub(crate) callback: Callback,
    pub(crate) args: Args,
    pub(crate) kwargs: Kwargs,
}

/// A registered cleanup action
///
/// Either object-bound (`owner` set) or priority-bound (`priority` set,
/// no owner). The payload is dropped as soon as the entry leaves the
/// registry, releasing everything the callback captured.
pub struct FinalizationEntry {
    key: FinalizerKey,
    name: String,
    owner: Option<OwnerRef>,
    owning_pid: Pid,
    payload: Mutex<Option<Payload>>,
}

impl FinalizationEntry {
    pub(crate) fn new(
        key: FinalizerKey,
        name: String,
        owner: Option<OwnerRef>,
        owning_pid: Pid,
        payload: Payload,
    ) -> Self {
        Self {
            key,
            name,
            owner,
            owning_pid,
            payload: Mutex::new(Some(payload)),
        }
    }

    #[inline]
    pub fn key(&self) -> FinalizerKey {
        self.key
    }

    #[inline]
    pub fn priority(&self) -> Option<Priority> {
        self.key.priority
    }

    #[inline]
    pub fn callback_name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    #[inline]
    pub fn owning_pid(&self) -> Pid {
        self.owning_pid
    }

    pub(crate) fn take_payload(&self) -> Option<Payload> {
        self.payload.lock().take()
    }

    /// Diagnostic rendering of a live entry
    pub fn describe(&self) -> String {
        let mut out = format!("<Finalize object, callback={}", self.name);
        if let Some(payload) = self.payload.lock().as_ref() {
            if !payload.args.is_empty() {
                out.push_str(&format!(", args={}", Value::Array(payload.args.clone())));
            }
            if !payload.kwargs.is_empty() {
                out.push_str(&format!(", kwargs={}", Value::Object(payload.kwargs.clone())));
            }
        }
        if let Some(priority) = self.key.priority {
            out.push_str(&format!(", exitpriority={}", priority));
        }
        out.push('>');
        out
    }
}

impl fmt::Debug for FinalizationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizationEntry")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("owning_pid", &self.owning_pid)
            .finish_non_exhaustive()
    }
}
