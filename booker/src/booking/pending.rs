use crate::transaction::current_vu;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Identifier the booking API hands back on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookingId {
    Number(u64),
    Text(String),
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingId::Number(id) => write!(f, "{id}"),
            BookingId::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for BookingId {
    fn from(id: u64) -> Self {
        BookingId::Number(id)
    }
}

impl From<&str> for BookingId {
    fn from(id: &str) -> Self {
        BookingId::Text(id.to_string())
    }
}

/// Who shares a stack of pending bookings.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum PoolScope {
    /// One stack for the whole run.
    #[default]
    Shared,
    /// One stack per VU.
    PerVu,
}

/// LIFO stacks of bookings created during the run and not yet deleted.
///
/// The lock is only held for a single push, peek or pop and never across an await.
#[derive(Debug, Default)]
pub struct PendingBookings {
    scope: PoolScope,
    stacks: Mutex<HashMap<u64, Vec<BookingId>>>,
}

impl PendingBookings {
    pub fn new(scope: PoolScope) -> Self {
        Self {
            scope,
            stacks: Mutex::new(HashMap::new()),
        }
    }

    pub fn push(&self, id: BookingId) {
        let key = self.key();
        self.lock().entry(key).or_default().push(id);
    }

    /// Most recently pushed identifier, left in place.
    pub fn latest(&self) -> Option<BookingId> {
        let key = self.key();
        self.lock().get(&key).and_then(|stack| stack.last().cloned())
    }

    pub fn pop(&self) -> Option<BookingId> {
        let key = self.key();
        let mut stacks = self.lock();
        let stack = stacks.get_mut(&key)?;
        let id = stack.pop();
        // VU ids are never reused, so an emptied per-VU stack would otherwise linger.
        if stack.is_empty() {
            stacks.remove(&key);
        }
        id
    }

    /// Identifiers visible to the current task, oldest first.
    pub fn snapshot(&self) -> Vec<BookingId> {
        let key = self.key();
        self.lock().get(&key).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty every stack, whatever its scope, newest identifier first.
    pub fn drain_all(&self) -> Vec<BookingId> {
        let mut stacks = self.lock();
        let mut keys: Vec<u64> = stacks.keys().copied().collect();
        keys.sort_unstable();

        keys.into_iter()
            .filter_map(|key| stacks.remove(&key))
            .flat_map(|stack| stack.into_iter().rev())
            .collect()
    }

    fn key(&self) -> u64 {
        match self.scope {
            PoolScope::Shared => 0,
            PoolScope::PerVu => current_vu().unwrap_or(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Vec<BookingId>>> {
        // NOTE: A panic mid-push leaves nothing half-written, so a poisoned stack is still usable.
        self.stacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
