//! # Application Global State
//!
//! Each application owns one flat key/value store. Keys are short ASCII
//! strings; values are either a `u64` or a byte string, the same two
//! shapes the ledger's application storage allows.
//!
//! Applications never write to a [`GlobalState`] directly. They return a
//! [`StateDelta`] and the runtime applies it after every other effect of the
//! group has succeeded.
//!
//! ## Delta Semantics
//!
//! A delta is an ordered list of writes. Applying it:
//!
//! 1. `Set(k, v)` overwrites or inserts `k`.
//! 2. `Delete(k)` removes `k`; deleting an absent key is a no-op.
//! 3. Later writes to the same key win.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// StateValue
// ---------------------------------------------------------------------------

/// A single stored value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateValue {
    Uint(u64),
    Bytes(Vec<u8>),
}

impl StateValue {
    /// The integer, if this is a `Uint`.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            StateValue::Uint(v) => Some(*v),
            StateValue::Bytes(_) => None,
        }
    }

    /// The bytes, if this is a `Bytes`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StateValue::Bytes(b) => Some(b),
            StateValue::Uint(_) => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Uint(v) => write!(f, "{v}"),
            StateValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

// ---------------------------------------------------------------------------
// StateDelta
// ---------------------------------------------------------------------------

/// One write in a [`StateDelta`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateWrite {
    Set(String, StateValue),
    Delete(String),
}

/// Pending writes produced by one application invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDelta {
    writes: Vec<StateWrite>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an integer write.
    pub fn set_uint(&mut self, key: &str, value: u64) -> &mut Self {
        self.writes
            .push(StateWrite::Set(key.to_string(), StateValue::Uint(value)));
        self
    }

    /// Queues a byte-string write.
    pub fn set_bytes(&mut self, key: &str, value: Vec<u8>) -> &mut Self {
        self.writes
            .push(StateWrite::Set(key.to_string(), StateValue::Bytes(value)));
        self
    }

    /// Queues a deletion.
    pub fn delete(&mut self, key: &str) -> &mut Self {
        self.writes.push(StateWrite::Delete(key.to_string()));
        self
    }

    /// The queued writes, in order.
    pub fn writes(&self) -> &[StateWrite] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// GlobalState
// ---------------------------------------------------------------------------

/// The key/value store of one application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    entries: BTreeMap<String, StateValue>,
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.entries.get(key)
    }

    /// Integer at `key`. `None` if absent or stored as bytes.
    pub fn get_uint(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(StateValue::as_uint)
    }

    /// Bytes at `key`. `None` if absent or stored as an integer.
    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(StateValue::as_bytes)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn put(&mut self, key: &str, value: StateValue) {
        self.entries.insert(key.to_string(), value);
    }

    /// Applies every write in `delta`, in order.
    pub fn apply(&mut self, delta: &StateDelta) {
        for write in delta.writes() {
            match write {
                StateWrite::Set(key, value) => {
                    self.entries.insert(key.clone(), value.clone());
                }
                StateWrite::Delete(key) => {
                    self.entries.remove(key);
                }
            }
        }
    }

    /// All entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &StateValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_respect_shape() {
        let mut state = GlobalState::new();
        state.put("p", StateValue::Uint(7));
        state.put("gov", StateValue::Bytes(vec![1, 2, 3]));

        assert_eq!(state.get_uint("p"), Some(7));
        assert_eq!(state.get_bytes("p"), None);
        assert_eq!(state.get_bytes("gov"), Some(&[1u8, 2, 3][..]));
        assert_eq!(state.get_uint("gov"), None);
        assert_eq!(state.get_uint("missing"), None);
    }

    #[test]
    fn delta_applies_in_order() {
        let mut state = GlobalState::new();
        state.put("co", StateValue::Uint(1));

        let mut delta = StateDelta::new();
        delta.set_uint("mp", 5).set_uint("mp", 6).delete("co").delete("absent");
        state.apply(&delta);

        assert_eq!(state.get_uint("mp"), Some(6));
        assert!(!state.exists("co"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn empty_delta_is_noop() {
        let mut state = GlobalState::new();
        state.put("ar", StateValue::Uint(0));
        let before = state.clone();
        state.apply(&StateDelta::new());
        assert_eq!(state, before);
    }

    #[test]
    fn display_formats_values() {
        assert_eq!(StateValue::Uint(42).to_string(), "42");
        assert_eq!(StateValue::Bytes(vec![0xab, 0x01]).to_string(), "0xab01");
    }
}
