//! Favourite playback devices and rotation order.
//!
//! Membership is an ordered set: insertion order is rotation order. Every
//! mutation fires the change notification, which the app wires to the
//! persistence layer; a persistence failure propagates back out of the
//! mutating call rather than being swallowed.

use std::collections::HashSet;

use crate::audio::DeviceId;
use crate::settings::SettingsError;

type ChangeListener = Box<dyn FnMut(&[DeviceId]) -> Result<(), SettingsError> + Send>;

/// Ordered favourite-device set with wrap-around rotation queries.
#[derive(Default)]
pub struct FavouriteDeviceManager {
    order: Vec<DeviceId>,
    members: HashSet<DeviceId>,
    on_change: Option<ChangeListener>,
}

impl FavouriteDeviceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the change listener consumed by the persistence layer.
    pub fn set_on_change(&mut self, listener: ChangeListener) {
        self.on_change = Some(listener);
    }

    /// Replace the membership from persisted state. Duplicates are dropped,
    /// first occurrence wins. Does not fire the change notification.
    pub fn load(&mut self, ids: impl IntoIterator<Item = DeviceId>) {
        self.order.clear();
        self.members.clear();
        for id in ids {
            if !id.is_nil() && self.members.insert(id.clone()) {
                self.order.push(id);
            }
        }
        tracing::debug!(count = self.order.len(), "loaded favourite devices");
    }

    pub fn is_favourite(&self, id: &DeviceId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceId> {
        self.order.iter()
    }

    /// Add a device to the end of the rotation.
    pub fn add(&mut self, id: DeviceId) -> Result<(), SettingsError> {
        if id.is_nil() || !self.members.insert(id.clone()) {
            return Ok(());
        }
        self.order.push(id);
        self.notify()
    }

    /// Remove a device from the rotation.
    pub fn remove(&mut self, id: &DeviceId) -> Result<(), SettingsError> {
        if !self.members.remove(id) {
            return Ok(());
        }
        self.order.retain(|d| d != id);
        self.notify()
    }

    fn notify(&mut self) -> Result<(), SettingsError> {
        if let Some(listener) = self.on_change.as_mut() {
            listener(&self.order)?;
        }
        Ok(())
    }

    /// The favourite immediately following `current` in insertion order,
    /// wrapping to the first when `current` is last or not a favourite.
    /// Calling this n times (n = favourite count) starting anywhere visits
    /// every favourite exactly once.
    pub fn next_after(&self, current: Option<&DeviceId>) -> Option<DeviceId> {
        if self.order.is_empty() {
            return None;
        }
        let next_index = current
            .and_then(|id| self.order.iter().position(|d| d == id))
            .map(|i| (i + 1) % self.order.len())
            .unwrap_or(0);
        Some(self.order[next_index].clone())
    }
}
