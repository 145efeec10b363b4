//! Old-value snapshots
//!
//! Postconditions compare post-call state against values captured before the
//! action ran. Values are type-erased on the way in and recovered with a
//! typed accessor that refuses both missing names and wrong types.

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::{ContractError, ContractResult};

/// A captured value of any `'static` type
///
/// Cloning is cheap: the value is shared, not copied.
#[derive(Clone)]
pub struct OldValue {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

impl OldValue {
    pub fn new<V: Any>(value: V) -> Self {
        Self {
            value: Rc::new(value),
            type_name: type_name::<V>(),
        }
    }

    /// Borrow the value as `V`, if that is the captured type
    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.downcast_ref::<V>()
    }

    /// Name of the captured type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for OldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OldValue").field("type", &self.type_name).finish()
    }
}

/// One named old value
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub name: String,
    pub value: OldValue,
}

/// Ordered, name-unique store of old values for one call
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    entries: Vec<SnapshotEntry>,
    index: FxHashMap<String, usize>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `name`, overwriting an earlier capture in place
    pub fn capture<V: Any>(&mut self, name: impl Into<String>, value: V) {
        self.capture_value(name, OldValue::new(value));
    }

    /// Store an already type-erased value
    pub fn capture_value(&mut self, name: impl Into<String>, value: OldValue) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&slot) => self.entries[slot].value = value,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push(SnapshotEntry { name, value });
            }
        }
    }

    /// Recall the value captured under `name` as a `V`
    pub fn recall<V: Any + Clone>(&self, name: &str) -> ContractResult<V> {
        self.recall_ref::<V>(name).cloned()
    }

    /// Borrow the value captured under `name` as a `V`
    pub fn recall_ref<V: Any>(&self, name: &str) -> ContractResult<&V> {
        let entry = self.get(name).ok_or_else(|| ContractError::SnapshotNotFound {
            name: name.to_string(),
        })?;
        entry
            .value
            .downcast_ref::<V>()
            .ok_or_else(|| ContractError::SnapshotTypeMismatch {
                name: name.to_string(),
                expected: type_name::<V>(),
            })
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names in capture order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
#[path = "snapshot/snapshot_tests.rs"]
mod tests;
