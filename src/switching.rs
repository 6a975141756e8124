//! Turns a trigger (bound hotkey press or quick-switch tick) into one or
//! more default-device operations with bounded retry.
//!
//! Switching is best effort: per-candidate failures advance the loop, and
//! total exhaustion is an explicit outcome rather than an error, so callers
//! can log without surfacing anything to the user.

use std::sync::Arc;

use crate::audio::{DeviceController, DeviceId, DeviceRole, DeviceState};
use crate::favourites::FavouriteDeviceManager;

/// Result of one switch trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The default device changed to this device.
    Switched(DeviceId),

    /// Nothing to do: target unresolved, already default, or no devices.
    Unchanged,

    /// Every candidate rejected the switch; no change was made.
    Exhausted,
}

pub struct DeviceSwitchOrchestrator {
    controller: Arc<dyn DeviceController>,
}

impl DeviceSwitchOrchestrator {
    pub fn new(controller: Arc<dyn DeviceController>) -> Self {
        Self { controller }
    }

    /// Handle a bound hotkey press targeting a specific device.
    ///
    /// In dual-switch mode a successful primary switch also sets the
    /// communications-role default; that secondary call is independent and
    /// its failure never rolls back the primary switch.
    pub fn switch_to(&self, target: &DeviceId, dual_switch: bool) -> SwitchOutcome {
        let Some(device) = self.controller.device(target) else {
            tracing::debug!(device = %target, "hotkey target does not resolve, ignoring");
            return SwitchOutcome::Unchanged;
        };
        if device.is_default {
            return SwitchOutcome::Unchanged;
        }

        if !self.controller.set_default(target) {
            tracing::debug!(device = %target, "switch rejected");
            return SwitchOutcome::Exhausted;
        }
        self.apply_dual(target, dual_switch);
        tracing::info!(device = %device.name, "default playback device switched");
        SwitchOutcome::Switched(target.clone())
    }

    /// Handle a quick-switch trigger: rotate through the favourites, or
    /// through all active playback devices when no favourites exist.
    pub fn quick_switch(
        &self,
        favourites: &FavouriteDeviceManager,
        dual_switch: bool,
    ) -> SwitchOutcome {
        if favourites.is_empty() {
            self.rotate_all_devices(dual_switch)
        } else {
            self.rotate_favourites(favourites, dual_switch)
        }
    }

    /// Walk the favourites rotation starting from the current default,
    /// attempting at most `favourites.len()` candidates.
    fn rotate_favourites(
        &self,
        favourites: &FavouriteDeviceManager,
        dual_switch: bool,
    ) -> SwitchOutcome {
        let current = self.controller.default_device(DeviceRole::Console);
        let mut candidate = favourites.next_after(current.as_ref());

        for _ in 0..favourites.len() {
            let Some(id) = candidate else {
                return SwitchOutcome::Unchanged;
            };
            if self.controller.set_default(&id) {
                self.apply_dual(&id, dual_switch);
                tracing::info!(device = %id, "quick switch rotated to favourite");
                return SwitchOutcome::Switched(id);
            }
            tracing::debug!(device = %id, "favourite rejected switch, trying next");
            candidate = favourites.next_after(Some(&id));
        }

        tracing::debug!("quick switch exhausted all favourites");
        SwitchOutcome::Exhausted
    }

    /// With no favourites, cycle through all active playback devices sorted
    /// by name, starting just after the current default, wrapping, and
    /// stopping on success or after one full cycle.
    fn rotate_all_devices(&self, dual_switch: bool) -> SwitchOutcome {
        let mut devices = match self.controller.playback_devices(DeviceState::Active) {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate playback devices");
                return SwitchOutcome::Unchanged;
            }
        };
        if devices.is_empty() {
            return SwitchOutcome::Unchanged;
        }
        devices.sort_by(|a, b| a.name.cmp(&b.name));

        let current = self.controller.default_device(DeviceRole::Console);
        let start = current
            .as_ref()
            .and_then(|id| devices.iter().position(|d| &d.id == id));

        // With a known starting index we try every other device once; with
        // an unknown default we try them all. Either way the loop is bounded
        // by the device count.
        let (first, attempts) = match start {
            Some(index) => (index + 1, devices.len() - 1),
            None => (0, devices.len()),
        };

        for offset in 0..attempts {
            let device = &devices[(first + offset) % devices.len()];
            if self.controller.set_default(&device.id) {
                self.apply_dual(&device.id, dual_switch);
                tracing::info!(device = %device.name, "quick switch rotated to device");
                return SwitchOutcome::Switched(device.id.clone());
            }
            tracing::debug!(device = %device.name, "device rejected switch, trying next");
        }

        if attempts == 0 {
            SwitchOutcome::Unchanged
        } else {
            tracing::debug!("quick switch cycled every device without success");
            SwitchOutcome::Exhausted
        }
    }

    fn apply_dual(&self, id: &DeviceId, dual_switch: bool) {
        if !dual_switch {
            return;
        }
        if !self.controller.set_default_communications(id) {
            tracing::warn!(device = %id, "communications-role switch failed; primary switch stands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::controller::testing::MockController;

    fn id(n: u8) -> DeviceId {
        DeviceId::parse_guid(&format!("{n:08}-0000-0000-0000-000000000000")).unwrap()
    }

    fn favourites(ids: &[DeviceId]) -> FavouriteDeviceManager {
        let mut favs = FavouriteDeviceManager::new();
        favs.load(ids.iter().cloned());
        favs
    }

    #[test]
    fn bound_press_switches_target() {
        let controller = Arc::new(MockController::new(
            vec![(id(1), "A"), (id(2), "B")],
            Some(id(1)),
        ));
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        let outcome = orchestrator.switch_to(&id(2), false);
        assert_eq!(outcome, SwitchOutcome::Switched(id(2)));
        assert_eq!(controller.default_device(DeviceRole::Console), Some(id(2)));
        assert!(controller.set_comm_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn bound_press_noop_when_already_default_or_unresolved() {
        let controller = Arc::new(MockController::new(vec![(id(1), "A")], Some(id(1))));
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        assert_eq!(orchestrator.switch_to(&id(1), true), SwitchOutcome::Unchanged);
        assert_eq!(orchestrator.switch_to(&id(9), true), SwitchOutcome::Unchanged);
        assert!(controller.attempts().is_empty());
    }

    #[test]
    fn dual_switch_failure_does_not_roll_back() {
        let mut controller = MockController::new(vec![(id(1), "A"), (id(2), "B")], Some(id(1)));
        controller.comm_fails = true;
        let controller = Arc::new(controller);
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        let outcome = orchestrator.switch_to(&id(2), true);
        assert_eq!(outcome, SwitchOutcome::Switched(id(2)));
        assert_eq!(controller.default_device(DeviceRole::Console), Some(id(2)));
        assert_eq!(controller.set_comm_calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn favourites_rotation_stops_at_first_success() {
        // Favourites [A,B,C], default A, B fails, C succeeds:
        // exactly two attempts and the default becomes C.
        let mut controller = MockController::new(
            vec![(id(1), "A"), (id(2), "B"), (id(3), "C")],
            Some(id(1)),
        );
        controller.failing = vec![id(2)];
        let controller = Arc::new(controller);
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        let favs = favourites(&[id(1), id(2), id(3)]);
        let outcome = orchestrator.quick_switch(&favs, false);

        assert_eq!(outcome, SwitchOutcome::Switched(id(3)));
        assert_eq!(controller.attempts(), vec![id(2), id(3)]);
        assert_eq!(controller.default_device(DeviceRole::Console), Some(id(3)));
    }

    #[test]
    fn favourites_rotation_exhaustion_is_silent_noop() {
        let mut controller = MockController::new(
            vec![(id(1), "A"), (id(2), "B"), (id(3), "C")],
            Some(id(1)),
        );
        controller.failing = vec![id(1), id(2), id(3)];
        let controller = Arc::new(controller);
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        let favs = favourites(&[id(1), id(2), id(3)]);
        let outcome = orchestrator.quick_switch(&favs, false);

        assert_eq!(outcome, SwitchOutcome::Exhausted);
        assert_eq!(controller.attempts().len(), 3);
        assert_eq!(controller.default_device(DeviceRole::Console), Some(id(1)));
    }

    #[test]
    fn no_favourites_cycles_devices_by_name_and_terminates() {
        // Devices sorted [A,B,C], default B: first attempt C, then A, then
        // the loop ends back at B with no change. Exactly two attempts.
        let mut controller = MockController::new(
            vec![(id(3), "C"), (id(1), "A"), (id(2), "B")],
            Some(id(2)),
        );
        controller.failing = vec![id(1), id(3)];
        let controller = Arc::new(controller);
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        let outcome = orchestrator.quick_switch(&FavouriteDeviceManager::new(), false);

        assert_eq!(outcome, SwitchOutcome::Exhausted);
        assert_eq!(controller.attempts(), vec![id(3), id(1)]);
        assert_eq!(controller.default_device(DeviceRole::Console), Some(id(2)));
    }

    #[test]
    fn no_favourites_wraps_past_end_of_list() {
        // Default is the last device by name; rotation wraps to the first.
        let controller = Arc::new(MockController::new(
            vec![(id(1), "A"), (id(2), "B")],
            Some(id(2)),
        ));
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        let outcome = orchestrator.quick_switch(&FavouriteDeviceManager::new(), false);
        assert_eq!(outcome, SwitchOutcome::Switched(id(1)));
    }

    #[test]
    fn no_favourites_unknown_default_tries_all_devices() {
        let mut controller = MockController::new(vec![(id(1), "A"), (id(2), "B")], None);
        controller.failing = vec![id(1), id(2)];
        let controller = Arc::new(controller);
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        let outcome = orchestrator.quick_switch(&FavouriteDeviceManager::new(), false);
        assert_eq!(outcome, SwitchOutcome::Exhausted);
        assert_eq!(controller.attempts().len(), 2);
    }

    #[test]
    fn quick_switch_applies_dual_mode_on_success() {
        let controller = Arc::new(MockController::new(
            vec![(id(1), "A"), (id(2), "B")],
            Some(id(1)),
        ));
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        let favs = favourites(&[id(1), id(2)]);
        let outcome = orchestrator.quick_switch(&favs, true);

        assert_eq!(outcome, SwitchOutcome::Switched(id(2)));
        assert_eq!(controller.set_comm_calls.lock().unwrap().as_slice(), &[id(2)]);
    }

    #[test]
    fn no_devices_at_all_is_unchanged() {
        let controller = Arc::new(MockController::new(vec![], None));
        let orchestrator = DeviceSwitchOrchestrator::new(controller);
        assert_eq!(
            orchestrator.quick_switch(&FavouriteDeviceManager::new(), false),
            SwitchOutcome::Unchanged
        );
    }

    #[test]
    fn single_device_already_default_makes_no_attempts() {
        let controller = Arc::new(MockController::new(vec![(id(1), "A")], Some(id(1))));
        let orchestrator = DeviceSwitchOrchestrator::new(controller.clone());

        let outcome = orchestrator.quick_switch(&FavouriteDeviceManager::new(), false);
        assert_eq!(outcome, SwitchOutcome::Unchanged);
        assert!(controller.attempts().is_empty());
    }
}
