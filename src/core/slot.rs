// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Latest-value mailbox between producers and the tick loop

use std::sync::Arc;

use parking_lot::Mutex;

/// Single-value slot; producers overwrite, the tick reads
#[derive(Debug)]
pub struct SnapshotSlot<T> {
    value: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for SnapshotSlot<T> {
    fn clone(&self) -> Self {
        Self { value: self.value.clone() }
    }
}

impl<T> Default for SnapshotSlot<T> {
    fn default() -> Self {
        Self { value: Arc::new(Mutex::new(None)) }
    }
}

impl<T: Clone> SnapshotSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, value: T) {
        *self.value.lock() = Some(value);
    }

    /// Copy of the newest value, left in place
    pub fn latest(&self) -> Option<T> {
        self.value.lock().clone()
    }

    /// Newest value, consumed
    pub fn take(&self) -> Option<T> {
        self.value.lock().take()
    }

    pub fn clear(&self) {
        *self.value.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_overwrites() {
        let slot = SnapshotSlot::new();
        let producer = slot.clone();
        assert_eq!(slot.latest(), None::<u32>);

        producer.publish(1);
        producer.publish(2);
        assert_eq!(slot.latest(), Some(2));
        assert_eq!(slot.latest(), Some(2));
    }

    #[test]
    fn test_take_consumes() {
        let slot = SnapshotSlot::new();
        slot.publish("hello".to_string());
        assert_eq!(slot.take().as_deref(), Some("hello"));
        assert_eq!(slot.take(), None);

        slot.publish("bye".to_string());
        slot.clear();
        assert_eq!(slot.latest(), None);
    }
}
