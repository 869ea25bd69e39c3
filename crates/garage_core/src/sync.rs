//! Authoritative value + version counter, owner-writes model.
//!
//! The owning side mutates through [`Synced::set`] and publishes with an
//! explicit [`Synced::take_update`] step; remote viewers only ever apply
//! published updates, with stale versions ignored. There is no ambient
//! two-way binding.

use serde::{Deserialize, Serialize};

/// A published snapshot of a synced value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncUpdate<T> {
    pub value: T,
    pub version: u64,
}

#[derive(Debug, Clone)]
pub struct Synced<T> {
    value: T,
    version: u64,
    dirty: bool,
}

impl<T: Clone + PartialEq> Synced<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            version: 0,
            dirty: false,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Owner-side write. Bumps the version and marks a pending publication
    /// only when the value actually changed.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.version += 1;
        self.dirty = true;
        true
    }

    /// Drains the pending publication, if any. The owner sends the returned
    /// update to remote viewers.
    pub fn take_update(&mut self) -> Option<SyncUpdate<T>> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(SyncUpdate {
            value: self.value.clone(),
            version: self.version,
        })
    }

    /// Remote-side apply. Updates older than the local version are ignored
    /// so a late frame never clobbers a newer one.
    pub fn apply(&mut self, update: SyncUpdate<T>) -> bool {
        if update.version <= self.version {
            return false;
        }
        self.value = update.value;
        self.version = update.version;
        self.dirty = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bumps_version_only_on_change() {
        let mut s = Synced::new(vec!["a".to_string()]);
        assert!(!s.set(vec!["a".to_string()]));
        assert_eq!(s.version(), 0);
        assert!(s.set(vec!["b".to_string()]));
        assert_eq!(s.version(), 1);
    }

    #[test]
    fn test_take_update_drains_once() {
        let mut s = Synced::new(0u32);
        assert!(s.take_update().is_none());
        s.set(5);
        let update = s.take_update().unwrap();
        assert_eq!(update.value, 5);
        assert_eq!(update.version, 1);
        assert!(s.take_update().is_none());
    }

    #[test]
    fn test_remote_ignores_stale_updates() {
        let mut owner = Synced::new(0u32);
        let mut remote = Synced::new(0u32);

        owner.set(1);
        let first = owner.take_update().unwrap();
        owner.set(2);
        let second = owner.take_update().unwrap();

        assert!(remote.apply(second.clone()));
        assert!(!remote.apply(first));
        assert_eq!(*remote.get(), 2);
        assert_eq!(remote.version(), second.version);
    }
}
